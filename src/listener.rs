//! Listener: subscribes to the deployment channel and reconciles each request
//!
//! Requests are handled one at a time, inline. The loop waits on the next
//! message and on a termination signal; whichever is ready first wins. A failed
//! deployment is logged and the loop keeps going.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use futures_lite::{Stream, StreamExt};
use log::{error, info, warn};

use crate::config::Config;
use crate::reconciler::Reconciler;
use crate::run_args::RunArgsStore;
use crate::runtime::{CliRuntime, ContainerRuntime};
use crate::signals::{ShutdownSignal, SignalHandler};
use crate::transport::{self, TransportError};

/// How long to wait for the backend to confirm the unsubscribe on shutdown
const UNSUBSCRIBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Why the listener stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Signal(ShutdownSignal),
    /// The subscription stream ended underneath us
    ChannelClosed,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal(sig) => write!(f, "exit cause: {}", sig),
            Self::ChannelClosed => f.write_str("exit cause: subscription closed"),
        }
    }
}

/// Owns the pub/sub connection and the reconciler
pub struct Listener<R> {
    client: redis::Client,
    channel: String,
    abandon_on_shutdown: bool,
    reconciler: Reconciler<R>,
}

impl Listener<CliRuntime> {
    /// Listener driving the configured runtime CLI
    pub fn new(config: &Config) -> Result<Self, TransportError> {
        let runtime = CliRuntime::new(&config.runtime).with_timeout(config.command_timeout);
        let reconciler = Reconciler::new(runtime, RunArgsStore::new(&config.run_args));
        Self::with_reconciler(config, reconciler)
    }
}

impl<R: ContainerRuntime> Listener<R> {
    /// Listener driving a caller-supplied reconciler
    pub fn with_reconciler(config: &Config, reconciler: Reconciler<R>) -> Result<Self, TransportError> {
        Ok(Self {
            client: transport::client(config)?,
            channel: config.channel.clone(),
            abandon_on_shutdown: config.abandon_on_shutdown,
            reconciler,
        })
    }

    /// Ping the backend, subscribe, and serve until a signal arrives
    ///
    /// Only setup failures are returned as errors.
    pub async fn run(self) -> Result<ShutdownReason, TransportError> {
        let conn = transport::connect(&self.client).await?;
        let mut signals = SignalHandler::new().map_err(TransportError::Signal)?;

        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(TransportError::Connect)?;
        pubsub
            .subscribe(&self.channel)
            .await
            .map_err(|source| TransportError::Subscribe {
                channel: self.channel.clone(),
                source,
            })?;

        info!("subscribed to {}", self.channel);

        let reason = {
            let messages = pubsub.on_message().filter_map(|msg| match msg.get_payload::<String>() {
                Ok(payload) => Some(payload),
                Err(e) => {
                    warn!("dropping undecodable message on {}: {}", msg.get_channel_name(), e);
                    None
                }
            });
            serve(&self.reconciler, messages, signals.wait(), self.abandon_on_shutdown).await
        };

        drop(signals);

        info!("{}, releasing subscription", reason);
        match tokio::time::timeout(UNSUBSCRIBE_TIMEOUT, pubsub.unsubscribe(&self.channel)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("unsubscribe from {} failed: {}", self.channel, e),
            Err(_) => warn!(
                "no reply to unsubscribe from {} within {:?}",
                self.channel, UNSUBSCRIBE_TIMEOUT
            ),
        }
        drop(pubsub);
        drop(conn);

        Ok(reason)
    }
}

/// Reconcile each message from `messages` until `shutdown` resolves
///
/// With `abandon_on_shutdown`, a signal also cancels the deployment in
/// progress; otherwise the current deployment finishes first.
pub async fn serve<R, S, F>(
    reconciler: &Reconciler<R>,
    messages: S,
    shutdown: F,
    abandon_on_shutdown: bool,
) -> ShutdownReason
where
    R: ContainerRuntime,
    S: Stream<Item = String>,
    F: Future<Output = ShutdownSignal>,
{
    futures_lite::pin!(messages);
    futures_lite::pin!(shutdown);

    loop {
        let message = tokio::select! {
            biased;
            sig = &mut shutdown => return ShutdownReason::Signal(sig),
            next = messages.next() => match next {
                Some(message) => message,
                None => return ShutdownReason::ChannelClosed,
            },
        };

        info!("received {}", message);

        let result = if abandon_on_shutdown {
            tokio::select! {
                biased;
                sig = &mut shutdown => {
                    warn!("abandoning deployment {}", message);
                    return ShutdownReason::Signal(sig);
                }
                result = reconciler.deploy(&message) => result,
            }
        } else {
            reconciler.deploy(&message).await
        };

        match result {
            Ok(()) => info!("deployed {}", message),
            Err(e) => error!("deploy {} failed: {}", message, e),
        }
    }
}
