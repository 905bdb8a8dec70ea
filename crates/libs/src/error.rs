use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Message shown to a visitor whenever an upload does not go through.
pub const UPLOAD_FAILED: &str = "Upload failed. Please try again.";

/// Message shown when the API cannot be reached at all.
pub const UNREACHABLE: &str = "Unable to connect to server. Please try again.";

#[derive(Debug, Error)]
pub enum Error {
    /// The API answered with a non-2xx status.
    #[error("request failed with {status}: {}", message.as_deref().unwrap_or("no message"))]
    Http {
        status: StatusCode,
        message: Option<String>,
    },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
    /// Refused locally, nothing was sent.
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("{0}")]
    Session(String),
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// The server supplied message, falling back to `default`.
    pub fn user_message<'a>(&'a self, default: &'a str) -> &'a str {
        match self {
            Error::Http {
                message: Some(m), ..
            } => m,
            Error::Validation(m) | Error::Session(m) => m,
            Error::Network(_) => UNREACHABLE,
            _ => default,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Http { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_message_wins_over_default() {
        let err = Error::Http {
            status: StatusCode::UNAUTHORIZED,
            message: Some("Invalid credentials".into()),
        };
        assert_eq!(err.user_message(UPLOAD_FAILED), "Invalid credentials");

        let err = Error::Http {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: None,
        };
        assert_eq!(err.user_message(UPLOAD_FAILED), UPLOAD_FAILED);
    }

    #[test]
    fn not_found_is_detected() {
        let err = Error::Http {
            status: StatusCode::NOT_FOUND,
            message: None,
        };
        assert!(err.is_not_found());
        assert!(!Error::validation("x").is_not_found());
    }
}
