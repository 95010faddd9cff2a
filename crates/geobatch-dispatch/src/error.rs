//! Error types for geobatch-dispatch.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("query cancelled before completion")]
    Cancelled,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("rate control channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, DispatchError>;
