//! Error types for tether-proxy

use thiserror::Error;

/// Result type for tether-proxy operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by a proxy
#[derive(Debug, Error)]
pub enum Error {
    /// No port name configured
    #[error("a port name is required to create a proxy")]
    MissingPortName,

    /// Core error (malformed message, codec or transport failure)
    #[error("core error: {0}")]
    Core(#[from] tether_core::Error),
}
