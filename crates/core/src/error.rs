//! Error types shared by the monitor and its collaborators

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::oneshot;

/// Standard result type for monitor operations
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Errors surfaced by the monitor and its handle
#[derive(Debug, Error)]
pub enum MonitorError {
    /// No token, or a token without a usable expiry
    #[error("Token unavailable: {0}")]
    TokenUnavailable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Channel send error")]
    ChannelSend,

    #[error("Channel receive error")]
    ChannelRecv(#[from] oneshot::error::RecvError),
}

impl<T> From<mpsc::error::SendError<T>> for MonitorError {
    fn from(_: mpsc::error::SendError<T>) -> Self {
        Self::ChannelSend
    }
}

/// Failures reported by an [`AuthSession`](crate::session::AuthSession)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Refresh rejected: {0}")]
    RefreshRejected(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("{0}")]
    Other(String),
}

impl SessionError {
    /// Create a refresh rejection
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::RefreshRejected(message.into())
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }
}

/// Token decoding failures
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Malformed token: expected 3 segments, found {0}")]
    Malformed(usize),

    #[error("Invalid token encoding: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("Invalid token payload: {0}")]
    Payload(#[from] serde_json::Error),
}
