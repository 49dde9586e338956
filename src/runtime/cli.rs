//! Runtime adapter that shells out to the docker (or podman) CLI

use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::{ContainerRuntime, RuntimeError};

/// Drives a docker-compatible command line client
#[derive(Debug, Clone)]
pub struct CliRuntime {
    program: String,
    timeout: Option<Duration>,
}

/// What a successful command printed
struct Output {
    stdout: String,
    stderr: String,
}

impl Output {
    fn combined(self) -> String {
        self.stdout + &self.stderr
    }
}

impl CliRuntime {
    /// Runtime invoking `program` (`docker`, `podman`, ...) from `PATH`
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    /// Kill commands that run longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    async fn exec<S: AsRef<str>>(&self, args: &[S]) -> Result<Output, RuntimeError> {
        let command = self.describe(args);

        let mut cmd = Command::new(&self.program);
        cmd.args(args.iter().map(AsRef::as_ref));
        cmd.stdin(Stdio::null());
        // Dropping the output future on timeout or abandon must not leave the child behind
        cmd.kill_on_drop(true);

        log::debug!("exec: {}", command);

        let result = match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, cmd.output()).await {
                Ok(result) => result,
                Err(_) => return Err(RuntimeError::TimedOut { command, timeout }),
            },
            None => cmd.output().await,
        };

        let output = result.map_err(|source| RuntimeError::Spawn {
            command: command.clone(),
            source,
        })?;

        let captured = Output {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if output.status.success() {
            Ok(captured)
        } else {
            Err(RuntimeError::Failed {
                command,
                output: captured.combined(),
                status: output.status,
            })
        }
    }

    fn describe<S: AsRef<str>>(&self, args: &[S]) -> String {
        std::iter::once(self.program.as_str())
            .chain(args.iter().map(AsRef::as_ref))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl ContainerRuntime for CliRuntime {
    async fn list(&self) -> Result<String, RuntimeError> {
        // Warnings on stderr would otherwise be read as table rows
        let output = self.exec(&["ps", "-a"]).await?;
        if !output.stderr.is_empty() {
            log::debug!("{} ps -a: {}", self.program, output.stderr.trim_end());
        }
        Ok(output.stdout)
    }

    async fn stop(&self, name: &str) -> Result<String, RuntimeError> {
        self.exec(&["stop", name]).await.map(Output::combined)
    }

    async fn remove(&self, name: &str) -> Result<String, RuntimeError> {
        self.exec(&["rm", name]).await.map(Output::combined)
    }

    async fn run(&self, args: &[String]) -> Result<String, RuntimeError> {
        log::info!("{}", self.describe(args));
        self.exec(args).await.map(Output::combined)
    }
}
