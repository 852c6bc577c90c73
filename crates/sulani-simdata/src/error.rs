//! Error types for SimData parsing, writing and validation.

use sulani_common::ErrorKind;
use thiserror::Error;

use crate::DataType;

/// Errors that can occur when working with SimData resources.
#[derive(Debug, Error)]
pub enum Error {
    /// Common library error.
    #[error("{0}")]
    Common(#[from] sulani_common::Error),

    /// Unsupported SimData version.
    #[error("unsupported SimData version: {0:#x} (expected 0x100 or 0x101)")]
    UnsupportedVersion(u32),

    /// Unknown data type id in a table or column record.
    #[error("unknown data type {value} at offset {position}")]
    UnknownDataType { position: usize, value: u32 },

    /// Negative table or schema count in the header.
    #[error("invalid {what} count {count} in header")]
    InvalidCount { what: &'static str, count: i32 },

    /// A table or column references something that is not a schema record.
    #[error("record at offset {position} references schema offset {target} that is not a schema")]
    SchemaNotFound { position: usize, target: usize },

    /// Table rows extend beyond the end of the buffer.
    #[error("table {index} rows at {offset}..{end} exceed the buffer (length {len})")]
    TableOutOfBounds {
        index: usize,
        offset: usize,
        end: usize,
        len: usize,
    },

    /// An instance table has no schema or no rows.
    #[error("instance table {name:?} has no {missing}")]
    InvalidInstanceTable { name: String, missing: &'static str },

    /// A pointer does not land inside any table.
    #[error("pointer at offset {position} targets {target}, which is not inside any table")]
    DanglingPointer { position: usize, target: usize },

    /// A pointer lands in a table of the wrong kind.
    #[error("pointer at offset {position} expected {expected} data but found {actual}")]
    PointerTypeMismatch {
        position: usize,
        expected: &'static str,
        actual: DataType,
    },

    /// An object column holds a null pointer.
    #[error("object value at offset {0} is null")]
    NullObject(usize),

    /// Vector elements run past the end of their table.
    #[error("vector at offset {position} with {count} elements overruns its table")]
    VectorOverrun { position: usize, count: u32 },

    /// Cells nest deeper than the reader allows.
    #[error("cells nest deeper than {0} levels")]
    NestingTooDeep(usize),

    /// An object cell refers to a schema hash the resource does not declare.
    #[error("no schema with hash {hash:#010x} ({context})")]
    UnknownSchema { hash: u32, context: String },

    /// An object cell's row does not match its schema.
    #[error("row for schema {schema:?} {problem}")]
    RowMismatch { schema: String, problem: String },

    /// A cell's type differs from its column's declared type.
    #[error("column {column:?} is declared {expected} but holds {actual}")]
    ColumnTypeMismatch {
        column: String,
        expected: DataType,
        actual: DataType,
    },

    /// Vector children do not share one data type.
    #[error("vector child {index} is {actual} but the first child is {expected}")]
    MixedVector {
        index: usize,
        expected: DataType,
        actual: DataType,
    },

    /// Object children of a vector follow different schemas.
    #[error("vector child {index} follows schema {actual:#010x} but the first child follows {expected:#010x}")]
    MixedVectorSchemas {
        index: usize,
        expected: u32,
        actual: u32,
    },

    /// A cell value is not representable in its data type.
    #[error("{data_type} cannot hold {value}")]
    InvalidValue { data_type: DataType, value: String },

    /// A schema is structurally unsound.
    #[error("schema {schema:?}: {problem}")]
    InvalidSchema { schema: String, problem: String },

    /// Export error.
    #[error("export error: {0}")]
    Export(String),
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Common(e) => e.kind(),
            Self::UnsupportedVersion(_) => ErrorKind::Header,
            Self::UnknownSchema { .. }
            | Self::RowMismatch { .. }
            | Self::ColumnTypeMismatch { .. }
            | Self::MixedVector { .. }
            | Self::MixedVectorSchemas { .. }
            | Self::InvalidValue { .. }
            | Self::InvalidSchema { .. } => ErrorKind::Validation,
            Self::Export(_) => ErrorKind::Io,
            Self::UnknownDataType { .. }
            | Self::InvalidCount { .. }
            | Self::SchemaNotFound { .. }
            | Self::TableOutOfBounds { .. }
            | Self::InvalidInstanceTable { .. }
            | Self::DanglingPointer { .. }
            | Self::PointerTypeMismatch { .. }
            | Self::NullObject(_)
            | Self::VectorOverrun { .. }
            | Self::NestingTooDeep(_) => ErrorKind::Content,
        }
    }
}

/// Result type for SimData operations.
pub type Result<T> = std::result::Result<T, Error>;
