//! deploier - Minimal pub/sub driven container deployment agent
//!
//! A listener subscribes to a redis channel and, for every `service:image`
//! message, replaces the local container called `service` with one running
//! `image`. A noticer publishes those messages.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   service:image   ┌──────────┐      ┌────────────┐
//! │ Noticer  │ ───── redis ────▶ │ Listener │ ───▶ │ Reconciler │
//! └──────────┘                   └──────────┘      └─────┬──────┘
//!                                                        │
//!                                       ┌────────────────┼──────────────┐
//!                                       ▼                               ▼
//!                               Container runtime               run_args.json
//! ```

pub mod config;
pub mod listener;
pub mod notice;
pub mod protocol;
pub mod reconciler;
pub mod run_args;
pub mod runtime;
pub mod signals;
pub mod transport;

pub use config::Config;
pub use listener::{Listener, ShutdownReason};
pub use notice::Noticer;
pub use protocol::DeploymentRequest;
pub use reconciler::{DeployError, Reconciler};
