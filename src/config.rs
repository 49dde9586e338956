//! Agent configuration
//!
//! Built once at startup and handed to the listener and noticer.

use std::path::PathBuf;
use std::time::Duration;

use crate::protocol::CHANNEL;

/// Logical redis database used when the address carries none
pub const DEFAULT_DB: i64 = 3;

/// Run-argument file, relative to the working directory
pub const RUN_ARGS_PATH: &str = "run_args.json";

/// Container runtime binary
pub const DEFAULT_RUNTIME: &str = "docker";

/// Settings shared by the listener and the noticer
#[derive(Debug, Clone)]
pub struct Config {
    /// Pub/sub backend address, `host:port` or a full `redis://` URL
    pub redis: String,
    /// Logical database index for bare `host:port` addresses
    pub db: i64,
    /// Channel deployment requests are published on
    pub channel: String,
    /// JSON file mapping service name to extra `run` arguments
    pub run_args: PathBuf,
    /// Container runtime binary (docker, podman, ...)
    pub runtime: String,
    /// Deadline for a single runtime command
    pub command_timeout: Option<Duration>,
    /// Drop an in-flight deployment when a termination signal arrives
    pub abandon_on_shutdown: bool,
}

impl Config {
    /// Configuration for `redis` with every other setting at its default
    pub fn new(redis: impl Into<String>) -> Self {
        Self {
            redis: redis.into(),
            db: DEFAULT_DB,
            channel: CHANNEL.to_string(),
            run_args: PathBuf::from(RUN_ARGS_PATH),
            runtime: DEFAULT_RUNTIME.to_string(),
            command_timeout: None,
            abandon_on_shutdown: false,
        }
    }

    /// Connection URL for the pub/sub backend
    ///
    /// Full URLs are used verbatim; bare addresses get the configured database.
    pub fn redis_url(&self) -> String {
        if self.redis.contains("://") {
            self.redis.clone()
        } else {
            format!("redis://{}/{}", self.redis, self.db)
        }
    }
}
