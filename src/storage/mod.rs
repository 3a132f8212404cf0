//! Storage layer for the DBF file format
//!
//! This module handles the low-level binary format:
//! - Header preamble and field descriptor table
//! - Field types and typed value encoding
//! - Fixed-width record buffers and the deletion marker
//! - Character field codepages and calendar dates

pub mod codepage;
pub mod date;
pub mod field;
pub mod header;
pub mod record;
pub mod value;

pub use codepage::Codepage;
pub use date::Date;
pub use field::{FieldDescriptor, FieldType};
pub use header::{Header, LastUpdate, TableFlags};
pub use record::Record;
pub use value::FieldValue;
