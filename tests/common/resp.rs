//! Just enough of a RESP server to drive the listener and the noticer
//!
//! Every command is recorded. Connection setup (`SELECT`, `CLIENT SETINFO`)
//! gets `+OK`, `PING` gets `+PONG`, `PUBLISH` reports one receiver, and
//! subscribed connections receive whatever the test pushes.

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

type Writer = Arc<tokio::sync::Mutex<OwnedWriteHalf>>;

#[derive(Debug, Clone, Copy, Default)]
pub struct Behaviour {
    /// Swallow `UNSUBSCRIBE` without replying
    pub ignore_unsubscribe: bool,
    /// Hang up right after confirming a `SUBSCRIBE`
    pub close_after_subscribe: bool,
}

pub struct FakeRedis {
    addr: SocketAddr,
    commands: Arc<Mutex<Vec<Vec<String>>>>,
    pushes: broadcast::Sender<String>,
    accept: JoinHandle<()>,
}

impl FakeRedis {
    pub async fn start(behaviour: Behaviour) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let commands = Arc::new(Mutex::new(Vec::new()));
        let (pushes, _) = broadcast::channel(16);

        let accept = tokio::spawn({
            let commands = commands.clone();
            let pushes = pushes.clone();
            async move {
                while let Ok((stream, _)) = listener.accept().await {
                    tokio::spawn(serve_connection(
                        stream,
                        behaviour,
                        commands.clone(),
                        pushes.clone(),
                    ));
                }
            }
        });

        Self {
            addr,
            commands,
            pushes,
            accept,
        }
    }

    /// `host:port` to hand to `Config::new`
    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    pub fn commands(&self) -> Vec<Vec<String>> {
        self.commands.lock().unwrap().clone()
    }

    pub fn received(&self, command: &[&str]) -> bool {
        self.commands().iter().any(|c| c == command)
    }

    /// Wait until a command called `name` has been received
    pub async fn wait_for(&self, name: &str) {
        super::eventually(
            || self.commands().iter().any(|c| c[0].eq_ignore_ascii_case(name)),
            name,
        )
        .await;
    }

    /// Deliver `payload` to every subscribed connection; returns how many got it
    pub fn push(&self, payload: &str) -> usize {
        self.pushes.send(payload.to_string()).unwrap_or(0)
    }
}

impl Drop for FakeRedis {
    fn drop(&mut self) {
        self.accept.abort();
    }
}

async fn serve_connection(
    stream: TcpStream,
    behaviour: Behaviour,
    commands: Arc<Mutex<Vec<Vec<String>>>>,
    pushes: broadcast::Sender<String>,
) -> io::Result<()> {
    let (read, write) = stream.into_split();
    let mut reader = BufReader::new(read);
    let writer: Writer = Arc::new(tokio::sync::Mutex::new(write));

    while let Some(command) = read_command(&mut reader).await? {
        let name = command.first().map(|n| n.to_ascii_uppercase()).unwrap_or_default();
        let channel = command.get(1).cloned().unwrap_or_default();

        if name == "SUBSCRIBE" {
            // Confirm before forwarding so a push never overtakes the reply
            let rx = pushes.subscribe();
            let reply = format!("*3\r\n{}{}:1\r\n", bulk("subscribe"), bulk(&channel));
            writer.lock().await.write_all(reply.as_bytes()).await?;
            commands.lock().unwrap().push(command);

            if behaviour.close_after_subscribe {
                writer.lock().await.shutdown().await?;
                return Ok(());
            }
            tokio::spawn(forward(rx, channel, writer.clone()));
            continue;
        }

        let reply = match name.as_str() {
            "PING" => Some("+PONG\r\n".to_string()),
            "UNSUBSCRIBE" if behaviour.ignore_unsubscribe => None,
            "UNSUBSCRIBE" => Some(format!(
                "*3\r\n{}{}:0\r\n",
                bulk("unsubscribe"),
                bulk(&channel)
            )),
            "PUBLISH" => Some(":1\r\n".to_string()),
            _ => Some("+OK\r\n".to_string()),
        };

        commands.lock().unwrap().push(command);
        if let Some(reply) = reply {
            writer.lock().await.write_all(reply.as_bytes()).await?;
        }
    }

    Ok(())
}

async fn forward(mut rx: broadcast::Receiver<String>, channel: String, writer: Writer) {
    while let Ok(payload) = rx.recv().await {
        let frame = format!("*3\r\n{}{}{}", bulk("message"), bulk(&channel), bulk(&payload));
        if writer.lock().await.write_all(frame.as_bytes()).await.is_err() {
            break;
        }
    }
}

fn bulk(s: &str) -> String {
    format!("${}\r\n{}\r\n", s.len(), s)
}

/// Read one command sent as an array of bulk strings; `None` on EOF
async fn read_command<R: AsyncBufRead + Unpin>(reader: &mut R) -> io::Result<Option<Vec<String>>> {
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Ok(None);
    }
    let count = header(&line, '*')?;

    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        line.clear();
        reader.read_line(&mut line).await?;
        let len = header(&line, '$')?;

        let mut buf = vec![0; len + 2];
        reader.read_exact(&mut buf).await?;
        buf.truncate(len);
        args.push(String::from_utf8_lossy(&buf).into_owned());
    }
    Ok(Some(args))
}

fn header(line: &str, prefix: char) -> io::Result<usize> {
    line.trim_end()
        .strip_prefix(prefix)
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, format!("bad header {:?}", line)))
}
