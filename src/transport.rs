//! Pub/sub connection setup shared by the listener and the noticer

use redis::aio::MultiplexedConnection;
use redis::{Client, RedisError};

use crate::config::Config;

/// Build a client for the configured backend; does not connect yet
pub fn client(config: &Config) -> Result<Client, TransportError> {
    Client::open(config.redis_url()).map_err(TransportError::Connect)
}

/// Open a connection and make sure the backend answers
pub async fn connect(client: &Client) -> Result<MultiplexedConnection, TransportError> {
    let mut conn = client
        .get_multiplexed_async_connection()
        .await
        .map_err(TransportError::Connect)?;

    redis::cmd("PING")
        .query_async::<String>(&mut conn)
        .await
        .map_err(TransportError::Ping)?;

    Ok(conn)
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to connect to redis: {0}")]
    Connect(#[source] RedisError),

    #[error("redis ping failed: {0}")]
    Ping(#[source] RedisError),

    #[error("failed to subscribe to {channel}: {source}")]
    Subscribe {
        channel: String,
        #[source]
        source: RedisError,
    },

    #[error("failed to publish to {channel}: {source}")]
    Publish {
        channel: String,
        #[source]
        source: RedisError,
    },

    #[error("failed to install signal handlers: {0}")]
    Signal(#[source] std::io::Error),
}
