//! xBase Engine - dBASE (DBF) compatible table file engine
//!
//! This crate reads and writes DBF table files: a binary header describing
//! a fixed set of typed, fixed-width columns, followed by fixed-length
//! records with a per-record deletion marker.

pub mod engine;
pub mod error;
pub mod storage;

pub use engine::{Records, TableFile};
pub use error::{DbfError, DbfResult};
pub use storage::{Codepage, Date, FieldDescriptor, FieldType, FieldValue, Header, Record};
