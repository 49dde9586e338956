//! Container runtime adapter
//!
//! Operations return the command's combined stdout/stderr, except `list`,
//! which returns stdout only so diagnostics never mix into the table. On
//! failure the combined output travels inside the error so it can be logged.

mod cli;

pub use cli::CliRuntime;

use std::process::ExitStatus;
use std::time::Duration;

/// Operations the reconciler needs from a container runtime
#[allow(async_fn_in_trait)]
pub trait ContainerRuntime {
    /// List all containers, running or exited, as the runtime's table output
    async fn list(&self) -> Result<String, RuntimeError>;

    /// Stop the container called `name`
    async fn stop(&self, name: &str) -> Result<String, RuntimeError>;

    /// Remove the container called `name`
    async fn remove(&self, name: &str) -> Result<String, RuntimeError>;

    /// Launch a container; `args` starts with the `run` verb
    async fn run(&self, args: &[String]) -> Result<String, RuntimeError>;
}

/// Container names from `ps -a` style output
///
/// Skips the header row and blank lines. The name column is the last one;
/// legacy link aliases show up there comma-separated.
pub fn container_names(listing: &str) -> impl Iterator<Item = &str> {
    listing
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().last())
        .flat_map(|names| names.split(','))
}

/// Whether `listing` contains a container named exactly `name`
pub fn has_container(listing: &str, name: &str) -> bool {
    container_names(listing).any(|n| n == name)
}

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{output}\n`{command}` failed: {status}")]
    Failed {
        command: String,
        output: String,
        status: ExitStatus,
    },

    #[error("`{command}` timed out after {timeout:?}")]
    TimedOut { command: String, timeout: Duration },
}

impl RuntimeError {
    /// Combined output captured before the failure, if any
    pub fn output(&self) -> &str {
        match self {
            Self::Failed { output, .. } => output,
            Self::Spawn { .. } | Self::TimedOut { .. } => "",
        }
    }
}
