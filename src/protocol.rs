//! Wire format for deployment requests
//!
//! A request travels over the pub/sub channel as `<service>:<image>`. Image
//! references may themselves contain the delimiter (`registry:5000/app:tag`),
//! so only the first delimiter separates the service from the image.

use std::fmt;
use std::str::FromStr;

/// Default channel deployment requests are published on
pub const CHANNEL: &str = "deploier:deploy";

/// Separator between service name and image reference
pub const DELIMITER: char = ':';

/// A request to converge `service` to run `image`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRequest {
    pub service: String,
    pub image: String,
}

impl DeploymentRequest {
    /// Create a request for `service` to run `image`
    pub fn new(service: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            image: image.into(),
        }
    }
}

impl FromStr for DeploymentRequest {
    type Err = MalformedMessage;

    fn from_str(msg: &str) -> Result<Self, Self::Err> {
        let (service, image) = msg
            .split_once(DELIMITER)
            .ok_or_else(|| MalformedMessage(msg.to_string()))?;
        Ok(Self::new(service, image))
    }
}

impl fmt::Display for DeploymentRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.service, DELIMITER, self.image)
    }
}

/// Format the message a noticer publishes for `service` at `version`
pub fn notice_message(service: &str, version: &str) -> String {
    format!("{}{}{}", service, DELIMITER, version)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid msg: {0}")]
pub struct MalformedMessage(pub String);
