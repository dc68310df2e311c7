//! Error types for the pero-core library.
//!
//! This module provides error handling using the `thiserror` crate, with
//! detailed error variants for the recoverable failure modes of the
//! renderer and the buffer.
//!
//! Storage-growth failure is deliberately absent: running out of buffer
//! memory or hitting the capacity ceiling aborts the process (see
//! [`crate::buffer`]), because the buffer's always-terminated invariant
//! cannot be maintained past that point.

use thiserror::Error;

/// Result type alias for pero operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all recoverable pero operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// `init` called on a buffer that still owns storage
    #[error("buffer still owns storage; release it before calling init")]
    InvalidState,

    /// Unrecognized conversion letter in a format directive
    #[error("unrecognized conversion '%{letter}' at byte {offset} of the format string")]
    UnknownConversion {
        /// The conversion letter that failed to match the dispatch table
        letter: char,
        /// Byte offset of the directive in the format string
        offset: usize,
    },

    /// Format string ended with a lone `%`
    #[error("format string ends with a lone '%'")]
    TrailingPercent,

    /// A conversion received an argument of the wrong type
    #[error("conversion '%{letter}' expected a {expected} argument, got {got}")]
    ArgMismatch {
        /// The conversion letter being rendered
        letter: char,
        /// Description of the expected argument type
        expected: &'static str,
        /// Description of the argument actually supplied
        got: &'static str,
    },

    /// A conversion ran past the end of the argument list
    #[error("conversion '%{letter}' has no argument left to consume")]
    MissingArg {
        /// The conversion letter being rendered
        letter: char,
    },

    /// Rendered bytes were requested as a `String` but are not UTF-8
    #[error("rendered output is not valid UTF-8")]
    NonUtf8Output(#[from] std::string::FromUtf8Error),

    /// I/O failure while filling a buffer from a stream
    #[error("failed to read from stream: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Creates a new unknown-conversion error
    pub fn unknown_conversion(letter: char, offset: usize) -> Self {
        Self::UnknownConversion { letter, offset }
    }

    /// Creates a new argument type mismatch error
    pub fn arg_mismatch(letter: char, expected: &'static str, got: &'static str) -> Self {
        Self::ArgMismatch {
            letter,
            expected,
            got,
        }
    }

    /// Creates a new missing-argument error
    pub fn missing_arg(letter: char) -> Self {
        Self::MissingArg { letter }
    }

    /// Returns true if the renderer keeps producing output after this error.
    ///
    /// Recoverable errors leave a visible marker in the output and are
    /// surfaced only through the aggregate return value of the render call.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UnknownConversion { .. }
                | Self::TrailingPercent
                | Self::ArgMismatch { .. }
                | Self::MissingArg { .. }
        )
    }
}
