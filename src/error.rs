//! Crate-level error type.

use thiserror::Error;

/// Errors that can end a relay request or a snapshot stream.
///
/// Request-time variants (`RequestFailed`, `StreamUnavailable`) are raised
/// before any snapshot exists. `Transport` can also surface mid-stream, in
/// which case snapshots already handed out stay valid.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The server replied with a non-2xx HTTP status code.
    #[error("request to {url} failed with HTTP {status}")]
    RequestFailed { status: u16, url: String },

    /// The response carried no readable body.
    #[error("response body is not readable")]
    StreamUnavailable,

    /// The cancellation token fired before the stream finished.
    #[error("stream cancelled")]
    Cancelled,

    /// Sending the request or pulling a chunk failed at the transport level.
    #[error("transport error: {0}")]
    Transport(String),

    /// Invalid base URL, unreadable config file, or malformed TOML.
    #[error("configuration error: {0}")]
    Config(String),
}

impl RelayError {
    /// Cancellation is a soft end: callers just stop consuming.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RelayError::Cancelled)
    }

    /// True for failures that happen before the first snapshot can exist.
    pub fn is_request_time(&self) -> bool {
        matches!(
            self,
            RelayError::RequestFailed { .. } | RelayError::StreamUnavailable
        )
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        RelayError::Transport(e.to_string())
    }
}
