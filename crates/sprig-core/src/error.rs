//! Error types for the engine.

use thiserror::Error;

/// Engine-wide error type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A bounded list was asked to hold more than its documented capacity.
    #[error("{what} exceeds capacity: {requested} requested, {capacity} allowed")]
    CapacityExceeded {
        what: &'static str,
        capacity: usize,
        requested: usize,
    },

    /// Out of bounds access
    #[error("Out of bounds: {0}")]
    OutOfBounds(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
