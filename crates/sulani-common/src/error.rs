//! Error types for sulani-common.

use thiserror::Error;

/// Broad classification shared by every Sulani error type.
///
/// Header errors are the only kind a reader may be configured to tolerate.
/// Content errors are always fatal. Unsupported-format conditions normally
/// degrade to an opaque resource instead of surfacing as an error, and
/// validation errors are only produced by explicit `validate()` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad magic, version or reserved field in a file header.
    Header,
    /// Inconsistent offsets, tables, rows or cell types.
    Content,
    /// A format feature this library does not decode.
    UnsupportedFormat,
    /// A model that is structurally unsound.
    Validation,
    /// Underlying I/O failure.
    Io,
}

/// Common error type for Sulani operations.
#[derive(Debug, Error)]
pub enum Error {
    /// End of buffer reached while reading.
    #[error("unexpected end of buffer at offset {position}: needed {needed} bytes but only {available} available")]
    UnexpectedEof {
        position: usize,
        needed: usize,
        available: usize,
    },

    /// Invalid magic bytes encountered.
    #[error("invalid magic at offset {position}: expected {expected:?}, got {actual:?}")]
    InvalidMagic {
        position: usize,
        expected: Vec<u8>,
        actual: Vec<u8>,
    },

    /// Value did not match expected.
    #[error("expected value {expected}, got {actual}")]
    ExpectedValue { expected: String, actual: String },

    /// A relative offset resolved outside of the buffer.
    #[error("offset {target} (from field at {position}) is outside of the buffer (length {len})")]
    OffsetOutOfBounds {
        position: usize,
        target: i64,
        len: usize,
    },

    /// A value does not fit the fixed-width field it is written to.
    #[error("value {value} does not fit in {field}")]
    ValueOutOfRange { field: &'static str, value: String },

    /// A resource key string could not be parsed.
    #[error("invalid resource key: {0}")]
    InvalidKey(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 decoding error.
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// Missing null terminator in string.
    #[error("string at offset {0} is missing its null terminator")]
    MissingNullTerminator(usize),
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidMagic { .. } => ErrorKind::Header,
            Self::ValueOutOfRange { .. } | Self::InvalidKey(_) => ErrorKind::Validation,
            Self::Io(_) => ErrorKind::Io,
            Self::UnexpectedEof { .. }
            | Self::ExpectedValue { .. }
            | Self::OffsetOutOfBounds { .. }
            | Self::Utf8(_)
            | Self::MissingNullTerminator(_) => ErrorKind::Content,
        }
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
