//! Error types for tether-core

use crate::transport::Scope;
use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    /// A serializer or deserializer rejected its input
    #[error("Codec error: {0}")]
    Codec(String),

    /// A value did not have the shape of a wire message
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// The transport refused an operation
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Invalid option supplied while configuring a hub or proxy
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by a transport implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The port or reply channel is no longer open
    #[error("channel closed")]
    Closed,

    /// The transport does not offer this event scope
    #[error("{0} events are not supported by this transport")]
    Unsupported(Scope),

    /// Implementation-specific failure
    #[error("{0}")]
    Other(String),
}

/// A failed dispatch, carried back to the proxy as a human-readable message
///
/// Displays as the bare message so that a store failing with `"boom"`
/// produces a response whose `error` is exactly `"boom"`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct DispatchError {
    message: String,
}

impl DispatchError {
    /// Create a dispatch error from a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The message that will be sent to the proxy
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for DispatchError {
    fn from(message: &str) -> Self {
        DispatchError::new(message)
    }
}

impl From<String> for DispatchError {
    fn from(message: String) -> Self {
        DispatchError::new(message)
    }
}

impl From<Error> for DispatchError {
    fn from(err: Error) -> Self {
        DispatchError::new(err.to_string())
    }
}
