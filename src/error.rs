//! Error taxonomy for the xBase engine
//!
//! Structural corruption (bad preamble, missing descriptor terminator,
//! inconsistent lengths) is fatal and reported at the point of detection.
//! End of data on a sequential read is a normal boolean result, never an
//! error.

use thiserror::Error;

use crate::storage::field::FieldType;

/// Main error type for the xBase engine
#[derive(Error, Debug)]
pub enum DbfError {
    /// Malformed header, descriptor table, or field content
    #[error("invalid file format: {0}")]
    Format(String),

    /// Field ordinal out of bounds
    #[error("field ordinal {index} out of range (table has {count} fields)")]
    FieldIndexOutOfRange { index: usize, count: usize },

    /// Record index out of bounds
    #[error("record index {index} out of range (table has {count} records)")]
    RecordIndexOutOfRange { index: u32, count: u32 },

    /// Field name lookup failed
    #[error("no field named {0:?}")]
    UnknownField(String),

    /// Accessor value variant does not match the declared field type
    #[error("field {field:?} is declared {expected:?}, got a {actual} value")]
    TypeMismatch {
        field: String,
        expected: FieldType,
        actual: &'static str,
    },

    /// Operation is illegal in the current engine or header state
    #[error("invalid state: {0}")]
    State(String),

    /// Underlying stream failure, including truncated reads
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for engine operations
pub type DbfResult<T> = Result<T, DbfError>;
