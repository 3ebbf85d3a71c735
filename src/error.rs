//! Error types for the page host
//!
//! The segmentation engine itself never fails: malformed or detached nodes are
//! no-ops and a missing MAIN is a data condition. Everything here belongs to
//! page acquisition and the outer surfaces.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for host operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while acquiring or segmenting a page
#[derive(Error, Debug)]
pub enum Error {
    /// No URL was supplied
    #[error("No URL provided")]
    MissingUrl,

    /// The URL could not be parsed
    #[error("Invalid URL '{0}'")]
    InvalidUrl(String),

    /// Navigation failed before a response arrived
    #[error("Navigation to {url} failed: {reason}")]
    NavigationError { url: String, reason: String },

    /// The server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// Navigation timed out
    #[error("Navigation timed out after {0}ms")]
    Timeout(u64),

    /// The engine finished without posting its segments message
    #[error("Segment channel closed before a payload arrived")]
    ChannelClosed,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Payload (de)serialization failed
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O failure (reading input files, binding sockets)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// HTTP status the page host reports for this error.
    ///
    /// Missing or malformed URLs are client errors, anything that went wrong
    /// talking to the target site is a bad gateway, everything else is an
    /// internal error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::MissingUrl | Error::InvalidUrl(_) => 400,
            Error::NavigationError { .. } | Error::HttpStatus { .. } | Error::Timeout(_) => 502,
            _ => 500,
        }
    }

    /// JSON error body `{ "error": ... }`
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
        }
    }
}

/// Error object returned by the HTTP surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_class() {
        assert_eq!(Error::MissingUrl.status_code(), 400);
        assert_eq!(Error::InvalidUrl("nope".into()).status_code(), 400);
        assert_eq!(
            Error::HttpStatus { status: 404, url: "http://x".into() }.status_code(),
            502
        );
        assert_eq!(
            Error::NavigationError { url: "http://x".into(), reason: "refused".into() }.status_code(),
            502
        );
        assert_eq!(Error::Timeout(100).status_code(), 502);
        assert_eq!(Error::ChannelClosed.status_code(), 500);
        assert_eq!(Error::Other("boom".into()).status_code(), 500);
    }

    #[test]
    fn error_body_carries_message() {
        let body = Error::HttpStatus { status: 503, url: "http://x".into() }.to_body();
        assert_eq!(body.error, "HTTP 503 from http://x");
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"error":"HTTP 503 from http://x"}"#);
    }
}
