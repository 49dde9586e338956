//! Per-service extra arguments for the runtime's `run` command
//!
//! The file is a JSON object keyed by service name:
//!
//! ```json
//! { "web": ["-p", "8080:80", "--restart", "always"] }
//! ```
//!
//! It is read on every deployment, so edits take effect without restarting
//! the listener.

use std::collections::HashMap;
use std::path::PathBuf;

/// Service name to ordered `run` arguments
pub type RunArgsTable = HashMap<String, Vec<String>>;

#[derive(Debug, Clone)]
pub struct RunArgsStore {
    path: PathBuf,
}

impl RunArgsStore {
    /// Create a store reading from `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read and parse the table from disk
    pub async fn load(&self) -> Result<RunArgsTable, RunArgsError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| RunArgsError::Read {
                path: self.path.clone(),
                source,
            })?;

        serde_json::from_str(&content).map_err(|source| RunArgsError::Parse {
            path: self.path.clone(),
            source,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunArgsError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
