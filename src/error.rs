//! Error types for upload-job
//!
//! This module provides the error handling surface of the library:
//! - The [`Error`] enum used across the collaborator seams (token provider,
//!   transport, multipart assembly)
//! - The [`ErrorKind`] taxonomy the retry state machine classifies failures
//!   into and reports to the delegate

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for upload-job operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for upload-job
///
/// Runtime failures never cross the job boundary as `Error` values; the job
/// absorbs them into its retry loop and reports only a terminal [`ErrorKind`]
/// through the delegate. This type is what the seams (token provider, upload
/// transport, multipart assembly) speak.
#[derive(Debug, Error)]
pub enum Error {
    /// The destination URL could not be parsed
    #[error("invalid upload URL {url:?}: {source}")]
    InvalidUrl {
        /// The URL string that failed to parse
        url: String,
        /// The underlying parse error
        #[source]
        source: url::ParseError,
    },

    /// Two data segments share the same name
    #[error("duplicate segment name: {0:?}")]
    DuplicateSegmentName(String),

    /// The token provider could not produce an access token
    #[error("token request failed: {0}")]
    TokenRequest(String),

    /// Transport-level network error (connection, DNS, timeout)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server rejected the upload with an unexpected HTTP status
    #[error("upload rejected with HTTP status {status}")]
    HttpStatus {
        /// The HTTP status code returned by the server
        status: u16,
    },

    /// Other error (custom transport or provider implementations)
    #[error("{0}")]
    Other(String),
}

/// Failure classification used by the retry state machine
///
/// This is the error vocabulary the job reasons in: every failed attempt is
/// classified into exactly one kind, and the kind of the last attempt is what
/// the delegate receives on terminal failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Token fetch failed, or the server returned 401 on upload
    Authentication,
    /// Transport-level failure reported by the HTTP layer
    Network,
    /// Any non-200, non-401 HTTP response
    Server,
    /// Multipart assembly failed (duplicate segment names)
    InvalidSegments,
}

impl ErrorKind {
    /// Returns true if an attempt failing with this kind may be retried
    /// while the attempt budget lasts.
    ///
    /// Malformed segments are a caller bug; retrying would reassemble the
    /// same invalid input.
    pub fn is_retryable(self) -> bool {
        !matches!(self, ErrorKind::InvalidSegments)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Authentication => "authentication_error",
            ErrorKind::Network => "network_error",
            ErrorKind::Server => "server_error",
            ErrorKind::InvalidSegments => "invalid_segments",
        };
        write!(f, "{name}")
    }
}

impl Error {
    /// Classify this error into the retry taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::TokenRequest(_) => ErrorKind::Authentication,
            Error::HttpStatus { status: 401 } => ErrorKind::Authentication,
            Error::HttpStatus { .. } => ErrorKind::Server,
            // Custom transports surface their failures as Other
            Error::Network(_) | Error::Other(_) => ErrorKind::Network,
            Error::InvalidUrl { .. } | Error::DuplicateSegmentName(_) => ErrorKind::InvalidSegments,
        }
    }
}
