//! Deployment reconciler
//!
//! Converges the host to run exactly one container called `service` from
//! `image`. Current state is read from the runtime on every call, so a
//! deployment that failed half way is picked up correctly by the next one.
//!
//! Steps, each aborting the deployment on failure:
//! 1. List all containers and look for one named `service`
//! 2. Load the run-argument table
//! 3. If the container exists, stop it, then remove it
//! 4. `run` the new container under the same name

use log::{debug, info};

use crate::protocol::{DeploymentRequest, MalformedMessage};
use crate::run_args::{RunArgsError, RunArgsStore};
use crate::runtime::{self, ContainerRuntime, RuntimeError};

/// Converges one named container per request
pub struct Reconciler<R> {
    runtime: R,
    run_args: RunArgsStore,
}

impl<R: ContainerRuntime> Reconciler<R> {
    /// Create a reconciler over `runtime`, reading launch arguments from `run_args`
    pub fn new(runtime: R, run_args: RunArgsStore) -> Self {
        Self { runtime, run_args }
    }

    /// The runtime this reconciler drives
    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Parse a wire message and reconcile it
    pub async fn deploy(&self, message: &str) -> Result<(), DeployError> {
        let request: DeploymentRequest = message.parse()?;
        self.reconcile(&request.service, &request.image).await
    }

    /// Replace any container called `service` with a fresh one running `image`
    ///
    /// Stops at the first failing step. The host is left as that step left it.
    pub async fn reconcile(&self, service: &str, image: &str) -> Result<(), DeployError> {
        let listing = self.runtime.list().await.map_err(DeployError::List)?;
        let exists = runtime::has_container(&listing, service);

        // Load before touching the old container so a broken file leaves it running
        let mut table = self.run_args.load().await?;
        let extra = table.remove(service);

        if exists {
            info!("stopping running service {}", service);
            let output = self
                .runtime
                .stop(service)
                .await
                .map_err(|source| DeployError::Stop {
                    service: service.to_string(),
                    source,
                })?;
            debug!("{}", output.trim_end());

            let output = self
                .runtime
                .remove(service)
                .await
                .map_err(|source| DeployError::Remove {
                    service: service.to_string(),
                    source,
                })?;
            debug!("{}", output.trim_end());
        }

        info!("starting {} from {}", service, image);
        let args = launch_args(service, image, extra.as_deref());
        let output = self
            .runtime
            .run(&args)
            .await
            .map_err(|source| DeployError::Run {
                service: service.to_string(),
                source,
            })?;
        debug!("{}", output.trim_end());
        info!("service {} started", service);

        Ok(())
    }
}

/// Build the `run` argument vector
///
/// Configured arguments go between the verb and `--name` so they are parsed
/// as runtime options rather than as the container command.
pub fn launch_args(service: &str, image: &str, extra: Option<&[String]>) -> Vec<String> {
    let extra = extra.unwrap_or_default();
    let mut args = Vec::with_capacity(extra.len() + 4);
    args.push("run".to_string());
    args.extend(extra.iter().cloned());
    args.push("--name".to_string());
    args.push(service.to_string());
    args.push(image.to_string());
    args
}

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error(transparent)]
    Malformed(#[from] MalformedMessage),

    #[error("list containers: {0}")]
    List(#[source] RuntimeError),

    #[error("stop {service}: {source}")]
    Stop {
        service: String,
        #[source]
        source: RuntimeError,
    },

    #[error("remove {service}: {source}")]
    Remove {
        service: String,
        #[source]
        source: RuntimeError,
    },

    #[error("run {service}: {source}")]
    Run {
        service: String,
        #[source]
        source: RuntimeError,
    },

    #[error("load run args: {0}")]
    RunArgs(#[from] RunArgsError),
}
