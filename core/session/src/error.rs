//! Error types of the session core.
//!
//! Backend failures are not errors here: they come back as empty results,
//! `None`, or [`EvaluationResult::Error`](crate::runtime::EvaluationResult).
//! [`SessionError`] only covers callers breaking an API contract.

use thiserror::Error;

/// A caller contract violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// `restart` was called on a frame the backend cannot restart.
    #[error("call frame cannot be restarted")]
    FrameNotRestartable,

    /// An operation needed a selected call frame and none is selected.
    #[error("no call frame selected")]
    NoCallFrameSelected,

    /// The value is not an array or typed array.
    #[error("object is empty or not an array")]
    NotAnArray,

    /// The value is not an `ArrayBuffer`.
    #[error("object is not an arraybuffer")]
    NotAnArrayBuffer,

    /// The value is not a function.
    #[error("object is empty or not a function")]
    NotAFunction,

    /// An array index past the reported length.
    #[error("index {index} is out of range for length {length}")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Reported length.
        length: usize,
    },

    /// A byte range that does not fit the buffer.
    #[error("byte range {start}..{end} is out of bounds for length {length}")]
    ByteRangeOutOfBounds {
        /// Range start.
        start: usize,
        /// Range end.
        end: usize,
        /// Reported byte length.
        length: usize,
    },

    /// A call succeeded but produced no value or threw.
    #[error("function call threw or returned no value")]
    CallFailed,
}

/// Result alias for operations that can only fail on misuse.
pub type SessionResult<T> = Result<T, SessionError>;
