//! Error types for the lark conversation engine.

use crate::client::ResponseFailure;

/// Top-level error type for the conversation engine.
#[derive(Debug, thiserror::Error)]
pub enum LarkError {
    /// Host platform lacks a required speech capability.
    #[error("capability unavailable: {0}")]
    Capability(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Remote endpoint exchange failed.
    #[error("response failure: {0}")]
    Response(#[from] ResponseFailure),

    /// Speech capture adapter error.
    #[error("capture error: {0}")]
    Capture(String),

    /// Controller event channel error.
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, LarkError>;
