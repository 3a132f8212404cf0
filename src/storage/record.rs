//! Fixed-width record buffers bound to a layout snapshot
//!
//! A record is exactly `record_length` bytes: byte 0 is the deletion
//! marker (0x2A deleted, 0x20 active), followed by each field's
//! fixed-width encoding at its descriptor offset.
//!
//! Records never own their layout: they hold a shared snapshot taken from
//! the engine. After `add_field` rebuilds the snapshot, records bound to
//! the old one are rejected at I/O time rather than silently diverging.

use std::ops::Range;
use std::sync::Arc;

use crate::error::{DbfError, DbfResult};
use crate::storage::codepage::Codepage;
use crate::storage::field::FieldDescriptor;
use crate::storage::value::{decode_field, encode_field, FieldValue};

/// Deletion marker values for record byte 0
pub const DELETED_MARKER: u8 = 0x2A;
pub const ACTIVE_MARKER: u8 = 0x20;

/// Immutable column layout shared between a header and its records
#[derive(Debug, PartialEq)]
pub struct RecordLayout {
    fields: Vec<FieldDescriptor>,
    record_length: u16,
    codepage: Codepage,
}

impl RecordLayout {
    pub(crate) fn empty(codepage: Codepage) -> Self {
        RecordLayout {
            fields: Vec::new(),
            record_length: 1,
            codepage,
        }
    }

    pub(crate) fn new(fields: Vec<FieldDescriptor>, record_length: u16, codepage: Codepage) -> Self {
        RecordLayout {
            fields,
            record_length,
            codepage,
        }
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, ordinal: usize) -> DbfResult<&FieldDescriptor> {
        self.fields
            .get(ordinal)
            .ok_or(DbfError::FieldIndexOutOfRange {
                index: ordinal,
                count: self.fields.len(),
            })
    }

    pub fn field_index(&self, name: &str) -> DbfResult<usize> {
        self.fields
            .iter()
            .position(|f| f.name_matches(name))
            .ok_or_else(|| DbfError::UnknownField(name.to_string()))
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn record_length(&self) -> u16 {
        self.record_length
    }

    pub fn codepage(&self) -> Codepage {
        self.codepage
    }
}

/// One record's byte buffer plus its transient file position
#[derive(Debug, Clone)]
pub struct Record {
    layout: Arc<RecordLayout>,
    buf: Vec<u8>,
    /// Zero-based index of the record this buffer was last read from or
    /// written to; not persisted in the bytes themselves
    index: Option<u32>,
}

impl Record {
    /// Create a blank, active record bound to the given layout
    pub(crate) fn new(layout: Arc<RecordLayout>) -> Self {
        let mut buf = vec![b' '; layout.record_length() as usize];
        buf[0] = ACTIVE_MARKER;
        Record {
            layout,
            buf,
            index: None,
        }
    }

    /// Decode the field at the given ordinal
    pub fn get(&self, ordinal: usize) -> DbfResult<FieldValue> {
        let desc = self.layout.field(ordinal)?;
        decode_field(
            &self.buf[field_range(desc)],
            desc,
            self.layout.codepage(),
        )
    }

    /// Encode a value into the field at the given ordinal
    ///
    /// Fails with a type mismatch when the value variant does not match
    /// the declared field type; the buffer is untouched on any failure.
    pub fn set(&mut self, ordinal: usize, value: FieldValue) -> DbfResult<()> {
        let desc = self.layout.field(ordinal)?;
        let range = field_range(desc);
        let codepage = self.layout.codepage();
        encode_field(&mut self.buf[range], desc, &value, codepage)
    }

    /// Decode a field by name (case-insensitive)
    pub fn get_by_name(&self, name: &str) -> DbfResult<FieldValue> {
        let ordinal = self.layout.field_index(name)?;
        self.get(ordinal)
    }

    /// Encode a field by name (case-insensitive)
    pub fn set_by_name(&mut self, name: &str, value: FieldValue) -> DbfResult<()> {
        let ordinal = self.layout.field_index(name)?;
        self.set(ordinal, value)
    }

    /// Zero-copy view over one field's raw bytes
    pub fn field_data(&self, ordinal: usize) -> DbfResult<&[u8]> {
        let desc = self.layout.field(ordinal)?;
        Ok(&self.buf[field_range(desc)])
    }

    /// Check the deletion marker
    ///
    /// Only 0x2A reads as deleted; any other marker byte found in the wild
    /// is treated as active.
    pub fn is_deleted(&self) -> bool {
        self.buf[0] == DELETED_MARKER
    }

    /// Set or clear the deletion marker
    pub fn set_deleted(&mut self, deleted: bool) {
        self.buf[0] = if deleted { DELETED_MARKER } else { ACTIVE_MARKER };
    }

    /// Reset to the blank active state, keeping the layout binding
    pub fn clear(&mut self) {
        self.buf.fill(b' ');
        self.buf[0] = ACTIVE_MARKER;
        self.index = None;
    }

    /// Position assigned by the last read/write/append, if any
    pub fn index(&self) -> Option<u32> {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: u32) {
        self.index = Some(index);
    }

    pub(crate) fn layout(&self) -> &Arc<RecordLayout> {
        &self.layout
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub(crate) fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }
}

fn field_range(desc: &FieldDescriptor) -> Range<usize> {
    let start = desc.offset() as usize;
    start..start + desc.length() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::field::FieldType;

    fn layout() -> Arc<RecordLayout> {
        let mut name = FieldDescriptor::new("NAME", FieldType::Character, 10, 0).unwrap();
        name.set_offset(1);
        let mut age = FieldDescriptor::new("AGE", FieldType::Numeric, 3, 0).unwrap();
        age.set_offset(11);
        Arc::new(RecordLayout::new(vec![name, age], 14, Codepage::Ascii))
    }

    #[test]
    fn test_blank_record() {
        let record = Record::new(layout());
        assert_eq!(record.as_bytes().len(), 14);
        assert!(!record.is_deleted());
        assert_eq!(record.get(0).unwrap(), FieldValue::Character(String::new()));
        assert_eq!(record.get(1).unwrap(), FieldValue::Numeric(None));
        assert_eq!(record.index(), None);
    }

    #[test]
    fn test_set_get_roundtrip() {
        let mut record = Record::new(layout());
        record.set(0, FieldValue::Character("ALICE".to_string())).unwrap();
        record.set(1, FieldValue::Numeric(Some(30.0))).unwrap();

        assert_eq!(record.get(0).unwrap(), FieldValue::Character("ALICE".to_string()));
        assert_eq!(record.get(1).unwrap(), FieldValue::Numeric(Some(30.0)));
        assert_eq!(record.field_data(1).unwrap(), b" 30");
    }

    #[test]
    fn test_by_name_access() {
        let mut record = Record::new(layout());
        record
            .set_by_name("age", FieldValue::Numeric(Some(7.0)))
            .unwrap();
        assert_eq!(
            record.get_by_name("AGE").unwrap(),
            FieldValue::Numeric(Some(7.0))
        );
        assert!(matches!(
            record.get_by_name("SALARY").unwrap_err(),
            DbfError::UnknownField(_)
        ));
    }

    #[test]
    fn test_ordinal_out_of_range() {
        let record = Record::new(layout());
        assert!(matches!(
            record.get(2).unwrap_err(),
            DbfError::FieldIndexOutOfRange { index: 2, count: 2 }
        ));
        assert!(record.field_data(5).is_err());
    }

    #[test]
    fn test_deletion_marker() {
        let mut record = Record::new(layout());
        record.set_deleted(true);
        assert!(record.is_deleted());
        assert_eq!(record.as_bytes()[0], DELETED_MARKER);
        record.set_deleted(false);
        assert!(!record.is_deleted());

        // unknown marker bytes read as active
        record.bytes_mut()[0] = 0x00;
        assert!(!record.is_deleted());
    }

    #[test]
    fn test_clear_preserves_layout() {
        let mut record = Record::new(layout());
        record.set(0, FieldValue::Character("BOB".to_string())).unwrap();
        record.set_deleted(true);
        record.set_index(3);

        record.clear();
        assert!(!record.is_deleted());
        assert_eq!(record.index(), None);
        assert_eq!(record.get(0).unwrap(), FieldValue::Character(String::new()));
        assert_eq!(record.as_bytes().len(), 14);
    }
}
