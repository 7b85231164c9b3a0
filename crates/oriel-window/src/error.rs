//! Error types for window evaluation.

use thiserror::Error;

/// Errors that can occur during window evaluation.
///
/// Errors carry the partition context that triggered them where one
/// exists; a failure in one partition never corrupts sibling output
/// (the batch as a whole fails).
#[derive(Debug, Error)]
pub enum WindowError {
    /// Malformed frame boundary ordering or an unsupported RANGE
    /// configuration. Fatal for the batch, not retried.
    #[error("invalid frame: {reason}")]
    InvalidFrame {
        /// Why the frame was rejected.
        reason: String,
    },

    /// A window function was given an unusable argument.
    #[error("invalid argument to {function}: {reason}")]
    InvalidArgument {
        /// The function that rejected the argument.
        function: String,
        /// Why the argument was rejected.
        reason: String,
    },

    /// A single partition exceeded the configured row budget.
    ///
    /// The caller may retry with spilling enabled upstream or a smaller
    /// batch; the error names the offending partition key.
    #[error("partition [{partition}] too large: {rows} rows exceeds budget of {limit}")]
    ResourceExhausted {
        /// Display form of the partition key values.
        partition: String,
        /// Rows observed in the partition.
        rows: usize,
        /// The configured budget.
        limit: usize,
    },

    /// Checked integer arithmetic overflowed.
    #[error("arithmetic overflow in {function} over partition [{partition}]")]
    ArithmeticOverflow {
        /// The aggregate that overflowed.
        function: String,
        /// Display form of the partition key values.
        partition: String,
    },

    /// A window expression referenced a column absent from the row schema.
    #[error("unknown column: {name}")]
    UnknownColumn {
        /// The missing column name.
        name: String,
    },
}

impl WindowError {
    /// Creates an [`InvalidFrame`](Self::InvalidFrame) error.
    #[must_use]
    pub fn invalid_frame(reason: impl Into<String>) -> Self {
        Self::InvalidFrame { reason: reason.into() }
    }

    /// Creates an [`InvalidArgument`](Self::InvalidArgument) error.
    #[must_use]
    pub fn invalid_argument(function: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument { function: function.into(), reason: reason.into() }
    }
}

/// Result type for window evaluation.
pub type WindowResult<T> = Result<T, WindowError>;
