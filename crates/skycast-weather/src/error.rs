//! Gateway and store error types.

use thiserror::Error;

/// Failures of a single remote request.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Network unreachable, timeout, malformed URL, client setup.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body did not match the expected schema.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Remote replied with a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
}

impl GatewayError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Whether a caller could reasonably try the same request again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Decode(_) => false,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// Failures reading or writing the persisted selection slot.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl StoreError {
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Persistence(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        assert!(GatewayError::transport("timeout").is_retryable());
        assert!(GatewayError::Api {
            status: 503,
            message: "down".into()
        }
        .is_retryable());
        assert!(!GatewayError::Api {
            status: 400,
            message: "No matching location found.".into()
        }
        .is_retryable());
        assert!(!GatewayError::decode("missing field `id`").is_retryable());
    }

    #[test]
    fn test_display_includes_detail() {
        let err = GatewayError::Api {
            status: 400,
            message: "No matching location found.".into(),
        };
        assert_eq!(err.to_string(), "API error: 400 - No matching location found.");
    }
}
