//! Error types for the OT core.

use thiserror::Error;

/// Errors raised while applying, transforming or decoding operations.
///
/// None of these are recoverable for the call that produced them. A
/// replica that hits one has diverged from the authority and must rejoin.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OtError {
    #[error("Base length mismatch: operation expects {expected}, input has {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Retain of {count} at offset {offset} overflows input of length {length}")]
    RetainOverflow {
        offset: usize,
        count: usize,
        length: usize,
    },

    #[error("Operation consumed {consumed} of {length} characters")]
    Incomplete { consumed: usize, length: usize },

    #[error("Operations are not compatible: {0}")]
    IncompatibleOperations(String),

    #[error("Invalid wire op at index {index}: {reason}")]
    InvalidWireOp { index: usize, reason: String },

    #[error("Declared {field} length {declared} does not match ops ({actual})")]
    WireLengthMismatch {
        field: &'static str,
        declared: usize,
        actual: usize,
    },
}

impl OtError {
    pub(crate) fn incompatible(reason: impl Into<String>) -> Self {
        OtError::IncompatibleOperations(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, OtError>;
