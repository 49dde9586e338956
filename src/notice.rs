//! Noticer: publishes a deployment request and exits

use log::info;
use redis::AsyncCommands;

use crate::config::Config;
use crate::protocol::notice_message;
use crate::transport::{self, TransportError};

/// Publishes deployment requests
pub struct Noticer {
    client: redis::Client,
    channel: String,
}

impl Noticer {
    /// Create a noticer publishing on the configured channel
    pub fn new(config: &Config) -> Result<Self, TransportError> {
        Ok(Self {
            client: transport::client(config)?,
            channel: config.channel.clone(),
        })
    }

    /// Publish `service:version` once; returns how many listeners received it
    pub async fn notice(&self, service: &str, version: &str) -> Result<usize, TransportError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(TransportError::Connect)?;

        let message = notice_message(service, version);
        let receivers: usize = conn
            .publish(&self.channel, &message)
            .await
            .map_err(|source| TransportError::Publish {
                channel: self.channel.clone(),
                source,
            })?;

        info!(
            "published {} on {} ({} receivers)",
            message, self.channel, receivers
        );
        Ok(receivers)
    }
}
