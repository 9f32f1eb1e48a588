//! Error types for frame decoding and the network clients.

use thiserror::Error;

/// A binary telemetry frame that could not be decoded.
///
/// Always recoverable: the caller drops the frame and keeps the session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed packet: expected {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },
}

/// Failures talking to the blog backend (REST or stream).
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("websocket connect failed: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("tls setup failed: {0}")]
    Tls(String),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("api error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("api reported failure for {endpoint}")]
    Envelope { endpoint: String },
}

impl ClientError {
    pub(crate) fn invalid_url(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;
