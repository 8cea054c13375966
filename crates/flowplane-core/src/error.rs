//! Common error types for flowplane.

use thiserror::Error;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while constructing core values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// A component identifier was empty or contained path separators.
    #[error("invalid component id: {0:?}")]
    InvalidId(String),

    /// A resource kind string did not name a known collection.
    #[error("unknown resource kind: {0}")]
    UnknownKind(String),
}
