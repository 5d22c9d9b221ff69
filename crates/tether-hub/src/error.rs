//! Error types for tether-hub

use thiserror::Error;

/// Result type for tether-hub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while setting up a hub
///
/// Everything here is raised at wrap time. Failures that happen while the
/// hub runs (failed dispatches, closed ports, foreign messages) are handled
/// in place and never surface as an `Error`.
#[derive(Debug, Error)]
pub enum Error {
    /// No port name configured
    #[error("a port name is required to wrap a store")]
    MissingPortName,

    /// Two selectors registered under one name
    #[error("selector {0:?} is registered more than once")]
    DuplicateSelector(String),

    /// Selector registered under an empty name
    #[error("selector names must not be empty")]
    EmptySelectorKey,

    /// Core error
    #[error("core error: {0}")]
    Core(#[from] tether_core::Error),
}

impl From<tether_core::TransportError> for Error {
    fn from(err: tether_core::TransportError) -> Self {
        Error::Core(err.into())
    }
}
