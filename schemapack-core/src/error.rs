//! Error types for the core crate.

use thiserror::Error;

/// Errors that can occur while building specs or running the codec.
#[derive(Debug, Error)]
pub enum PackError {
    /// The input ended before the value was fully decoded.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// A varint exceeded the 10-byte limit for a u64.
    #[error("varint overflow")]
    VarintOverflow,

    /// A boolean byte held something other than 0 or 1.
    #[error("bool byte neither 0 nor 1: {0}")]
    InvalidBool(u8),

    /// A pointer presence byte held something other than 0 or 1.
    #[error("invalid pointer tag: {0}")]
    InvalidPointerTag(u8),

    /// A schema node carried a kind byte outside the known set.
    #[error("unsupported field kind: {0}")]
    UnsupportedKind(u8),

    /// A struct reference did not resolve in the spec's struct table.
    #[error("unknown struct reference: {0}")]
    UnknownStruct(String),

    /// The value or target did not match the schema node.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// What the schema node called for.
        expected: String,
        /// What was actually there.
        actual: String,
    },

    /// An encoding or decoding error occurred.
    #[error("encoding error: {0}")]
    Encoding(String),
}

impl PackError {
    /// Build a [`PackError::TypeMismatch`] from two descriptions.
    pub fn mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}
