//! Termination signal handling
//!
//! The listener stops on SIGTERM or SIGINT (Ctrl+C). Handlers are installed
//! when the [`SignalHandler`] is created, so a signal that arrives before the
//! first `wait` is still observed.

use std::fmt;

use nix::sys::signal::Signal as NixSignal;
use tokio::signal::unix::{signal, Signal, SignalKind};

/// Signals that end the listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// Shutdown request (SIGTERM)
    Term,
    /// Interrupt (SIGINT, Ctrl+C)
    Int,
}

impl ShutdownSignal {
    /// The underlying OS signal
    pub fn as_nix(self) -> NixSignal {
        match self {
            Self::Term => NixSignal::SIGTERM,
            Self::Int => NixSignal::SIGINT,
        }
    }
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_nix().as_str())
    }
}

pub struct SignalHandler {
    sigterm: Signal,
    sigint: Signal,
}

impl SignalHandler {
    /// Install SIGTERM and SIGINT handlers
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            sigterm: signal(SignalKind::terminate())?,
            sigint: signal(SignalKind::interrupt())?,
        })
    }

    /// Wait for the next termination signal
    pub async fn wait(&mut self) -> ShutdownSignal {
        tokio::select! {
            _ = self.sigterm.recv() => ShutdownSignal::Term,
            _ = self.sigint.recv() => ShutdownSignal::Int,
        }
    }
}
