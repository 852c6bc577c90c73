//! Error types for the package crate.

use sulani_common::{ErrorKind, ResourceKey};
use thiserror::Error;

/// Errors that can occur when working with DBPF packages.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Common library error.
    #[error("{0}")]
    Common(#[from] sulani_common::Error),

    /// SimData error.
    #[error("{0}")]
    SimData(#[from] sulani_simdata::Error),

    /// Header field holds an unexpected value.
    #[error("invalid package header {field}: expected {expected}, got {actual}")]
    InvalidHeader {
        field: &'static str,
        expected: String,
        actual: String,
    },

    /// The index lies outside of the buffer.
    #[error("index at {position} with {count} entries exceeds the buffer (length {len})")]
    IndexOutOfBounds {
        position: u64,
        count: u32,
        len: usize,
    },

    /// An entry's record lies outside of the buffer.
    #[error("entry {index} ({key}) record at {position}+{size} exceeds the buffer (length {len})")]
    RecordOutOfBounds {
        index: usize,
        key: ResourceKey,
        position: u32,
        size: u32,
        len: usize,
    },

    /// Inflating a compressed record failed.
    #[error("failed to inflate {key}: {message}")]
    Decompression { key: ResourceKey, message: String },

    /// The uncompressed size does not match the index.
    #[error("{key} inflated to {actual} bytes, index says {expected}")]
    SizeMismatch {
        key: ResourceKey,
        expected: u32,
        actual: usize,
    },

    /// Decoding or encoding a resource failed.
    #[error("resource {key}: {source}")]
    Resource {
        key: ResourceKey,
        #[source]
        source: Box<Error>,
    },

    /// Compression type this library does not handle.
    #[error("unsupported compression type {0:#06x}")]
    UnsupportedCompression(u16),

    /// The resource was preserved as opaque bytes and cannot be re-serialized.
    #[error("resource is not serializable: {reason}")]
    NotSerializable { reason: String },

    /// Mutation attempted on a read-only resource.
    #[error("{variant} resources are read-only")]
    ReadOnly { variant: &'static str },

    /// No entry at the given index.
    #[error("entry index {index} out of range (package has {len} entries)")]
    EntryOutOfRange { index: usize, len: usize },

    /// Unsupported string table version.
    #[error("unsupported string table version {0} (expected 5)")]
    UnsupportedStringTableVersion(u16),

    /// String table key does not fit in 32 bits.
    #[error("string table key {0:#x} does not fit in 32 bits")]
    InvalidStringKey(u64),

    /// The same key appears twice in a string table.
    #[error("duplicate string table key {0:#010x}")]
    DuplicateStringKey(u32),

    /// A string table entry has no text.
    #[error("string table key {0:#010x} has an empty value")]
    EmptyString(u32),

    /// A string table value is longer than its 16-bit length field.
    #[error("string table key {key:#010x} value is {len} bytes long")]
    StringTooLong { key: u32, len: usize },

    /// Resource bytes are not UTF-8 text.
    #[error("resource is not UTF-8 text: {0}")]
    NotText(#[from] std::str::Utf8Error),

    /// Malformed tuning XML.
    #[error("XML error at byte {position}: {message}")]
    Xml { position: u64, message: String },
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::Common(e) => e.kind(),
            Self::SimData(e) => e.kind(),
            Self::Resource { source, .. } => source.kind(),
            Self::InvalidHeader { .. } => ErrorKind::Header,
            Self::UnsupportedCompression(_)
            | Self::NotSerializable { .. }
            | Self::UnsupportedStringTableVersion(_)
            | Self::NotText(_) => ErrorKind::UnsupportedFormat,
            Self::ReadOnly { .. }
            | Self::EntryOutOfRange { .. }
            | Self::InvalidStringKey(_)
            | Self::DuplicateStringKey(_)
            | Self::EmptyString(_)
            | Self::StringTooLong { .. } => ErrorKind::Validation,
            Self::IndexOutOfBounds { .. }
            | Self::RecordOutOfBounds { .. }
            | Self::Decompression { .. }
            | Self::SizeMismatch { .. }
            | Self::Xml { .. } => ErrorKind::Content,
        }
    }

    /// Attach the key of the resource this error belongs to.
    pub(crate) fn in_resource(self, key: ResourceKey) -> Self {
        match self {
            Self::Resource { .. } => self,
            other => Self::Resource {
                key,
                source: Box::new(other),
            },
        }
    }
}

/// Result type for package operations.
pub type Result<T> = std::result::Result<T, Error>;
