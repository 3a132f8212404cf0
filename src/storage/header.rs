//! DBF file header - preamble plus field descriptor table
//!
//! Layout of the 32-byte preamble (little-endian integers):
//! - Byte 0: version/type byte (0x03 dBASE III, memo bit 0x80)
//! - Bytes 1-3: last update date (YY as offset from 1900, MM, DD)
//! - Bytes 4-7: record count (u32)
//! - Bytes 8-9: header length (u16)
//! - Bytes 10-11: record length (u16)
//! - Bytes 12-27: reserved
//! - Byte 28: table flags
//! - Byte 29: language driver / codepage id
//! - Bytes 30-31: reserved
//!
//! The descriptor table follows as 32-byte entries, closed by a 0x0D
//! terminator byte. Invariants kept at all times:
//! header_length == 32 + 32 * field_count + 1 and
//! record_length == 1 + sum of field widths.

use std::io::{Cursor, Read};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{DbfError, DbfResult};
use crate::storage::codepage::Codepage;
use crate::storage::field::{FieldDescriptor, FieldType, DESCRIPTOR_SIZE};
use crate::storage::record::RecordLayout;

/// Size of the fixed preamble
pub const PREAMBLE_SIZE: usize = 32;

/// Byte closing the descriptor table
pub const DESCRIPTOR_TERMINATOR: u8 = 0x0D;

/// Version byte for a plain dBASE III table
pub const VERSION_DBASE3: u8 = 0x03;

/// Memo bit within the version byte
pub const VERSION_MEMO_BIT: u8 = 0x80;

bitflags::bitflags! {
    /// Table-level flags stored at preamble byte 28
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TableFlags: u8 {
        /// A structural index file accompanies the table
        const STRUCTURAL_INDEX = 0x01;
        /// At least one memo-class field is present
        const MEMO = 0x02;
        /// Table belongs to a database container
        const DATABASE = 0x04;
    }
}

/// Date of last modification, year stored as an offset from 1900
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastUpdate {
    pub year: u8,
    pub month: u8,
    pub day: u8,
}

impl LastUpdate {
    /// Today's date in on-disk form
    pub fn today() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let (year, month, day) = civil_from_days((secs / 86_400) as i64);
        LastUpdate {
            year: year.saturating_sub(1900).min(255) as u8,
            month,
            day,
        }
    }

    /// Full calendar year
    pub fn full_year(&self) -> u16 {
        1900 + self.year as u16
    }
}

/// Gregorian date from days since 1970-01-01
fn civil_from_days(days: i64) -> (u16, u8, u8) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let year = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u8;
    let year = if month <= 2 { year + 1 } else { year };
    (year as u16, month, day)
}

/// Parsed DBF header with its immutable field layout snapshot
#[derive(Debug, Clone)]
pub struct Header {
    version: u8,
    last_update: LastUpdate,
    record_count: u32,
    flags: TableFlags,
    language_driver: u8,
    layout: Arc<RecordLayout>,
    dirty: bool,
}

impl Header {
    /// Create an empty header for a new table
    pub fn new(language_driver: u8) -> Self {
        let codepage = Codepage::from_language_driver(language_driver);
        Header {
            version: VERSION_DBASE3,
            last_update: LastUpdate::today(),
            record_count: 0,
            flags: TableFlags::empty(),
            language_driver,
            layout: Arc::new(RecordLayout::empty(codepage)),
            dirty: false,
        }
    }

    /// Parse a header from the start of a stream
    ///
    /// Reads the preamble, then descriptor entries until the 0x0D
    /// terminator. The stored header length and record length must agree
    /// with the values recomputed from the descriptor table.
    pub fn parse<R: Read>(reader: &mut R) -> DbfResult<Self> {
        let mut preamble = [0u8; PREAMBLE_SIZE];
        reader.read_exact(&mut preamble)?;

        let version = preamble[0];
        let last_update = LastUpdate {
            year: preamble[1],
            month: preamble[2],
            day: preamble[3],
        };

        let mut cursor = Cursor::new(&preamble[4..12]);
        let record_count = cursor.read_u32::<LittleEndian>()?;
        let header_length = cursor.read_u16::<LittleEndian>()?;
        let record_length = cursor.read_u16::<LittleEndian>()?;

        let flags = TableFlags::from_bits_truncate(preamble[28]);
        let language_driver = preamble[29];

        if (header_length as usize) < PREAMBLE_SIZE + 1 {
            return Err(DbfError::Format(format!(
                "declared header length {} is shorter than the preamble",
                header_length
            )));
        }

        // Descriptor entries until the terminator, bounded by the declared
        // header length.
        let mut fields = Vec::new();
        let mut consumed = PREAMBLE_SIZE;
        let mut offset: u16 = 1;
        loop {
            let mut first = [0u8; 1];
            reader.read_exact(&mut first)?;
            consumed += 1;
            if first[0] == DESCRIPTOR_TERMINATOR {
                break;
            }
            if consumed + DESCRIPTOR_SIZE - 1 > header_length as usize {
                return Err(DbfError::Format(
                    "descriptor terminator missing before declared header length".to_string(),
                ));
            }

            let mut entry = [0u8; DESCRIPTOR_SIZE];
            entry[0] = first[0];
            reader.read_exact(&mut entry[1..])?;
            consumed += DESCRIPTOR_SIZE - 1;

            let mut desc = FieldDescriptor::from_bytes(&entry)?;
            if fields
                .iter()
                .any(|f: &FieldDescriptor| f.name_matches(desc.name()))
            {
                return Err(DbfError::Format(format!(
                    "duplicate field name {:?}",
                    desc.name()
                )));
            }
            desc.set_offset(offset);
            offset = offset
                .checked_add(desc.length() as u16)
                .ok_or_else(|| DbfError::Format("record length overflows u16".to_string()))?;
            fields.push(desc);
        }

        let computed_header = Self::header_length_for(fields.len());
        if computed_header != header_length {
            return Err(DbfError::Format(format!(
                "stored header length {} does not match {} computed from {} fields",
                header_length,
                computed_header,
                fields.len()
            )));
        }
        if offset != record_length {
            return Err(DbfError::Format(format!(
                "stored record length {} does not match {} computed from field widths",
                record_length, offset
            )));
        }

        let codepage = Codepage::from_language_driver(language_driver);
        Ok(Header {
            version,
            last_update,
            record_count,
            flags,
            language_driver,
            layout: Arc::new(RecordLayout::new(fields, record_length, codepage)),
            dirty: false,
        })
    }

    /// Serialize the preamble, descriptor table, and terminator
    ///
    /// Lengths are always recomputed from the field list, so the output is
    /// self-consistent regardless of what was parsed.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.header_length() as usize];

        buf[0] = self.version;
        buf[1] = self.last_update.year;
        buf[2] = self.last_update.month;
        buf[3] = self.last_update.day;
        buf[4..8].copy_from_slice(&self.record_count.to_le_bytes());
        buf[8..10].copy_from_slice(&self.header_length().to_le_bytes());
        buf[10..12].copy_from_slice(&self.record_length().to_le_bytes());
        buf[28] = self.flags.bits();
        buf[29] = self.language_driver;

        for (i, desc) in self.layout.fields().iter().enumerate() {
            let start = PREAMBLE_SIZE + i * DESCRIPTOR_SIZE;
            buf[start..start + DESCRIPTOR_SIZE].copy_from_slice(&desc.to_bytes());
        }
        let last = buf.len() - 1;
        buf[last] = DESCRIPTOR_TERMINATOR;

        buf
    }

    /// Append a column to the layout
    ///
    /// Only legal while the table holds no records. Rebuilds the shared
    /// layout snapshot; records bound to the previous snapshot are rejected
    /// by the engine at I/O time.
    pub fn add_field(
        &mut self,
        name: &str,
        field_type: FieldType,
        length: u8,
        decimal_count: u8,
    ) -> DbfResult<()> {
        if self.record_count > 0 {
            return Err(DbfError::State(format!(
                "cannot add field {:?}: table already holds {} records",
                name, self.record_count
            )));
        }
        if self.layout.fields().iter().any(|f| f.name_matches(name)) {
            return Err(DbfError::State(format!(
                "field {:?} already exists",
                name
            )));
        }

        let mut desc = FieldDescriptor::new(name, field_type, length, decimal_count)?;
        let offset = self.record_length();
        let record_length = offset
            .checked_add(length as u16)
            .ok_or_else(|| DbfError::Format("record length overflows u16".to_string()))?;
        desc.set_offset(offset);

        let mut fields = self.layout.fields().to_vec();
        fields.push(desc);
        self.layout = Arc::new(RecordLayout::new(
            fields,
            record_length,
            self.layout.codepage(),
        ));

        if field_type.is_memo_class() {
            self.version |= VERSION_MEMO_BIT;
            self.flags |= TableFlags::MEMO;
        }
        self.dirty = true;
        Ok(())
    }

    /// Case-insensitive field ordinal lookup
    pub fn field_index(&self, name: &str) -> DbfResult<usize> {
        self.layout.field_index(name)
    }

    /// Descriptor at the given ordinal
    pub fn field(&self, ordinal: usize) -> DbfResult<&FieldDescriptor> {
        self.layout.field(ordinal)
    }

    /// All descriptors in record order
    pub fn fields(&self) -> &[FieldDescriptor] {
        self.layout.fields()
    }

    pub fn field_count(&self) -> usize {
        self.layout.field_count()
    }

    /// 32 + 32 * field_count + 1
    pub fn header_length(&self) -> u16 {
        Self::header_length_for(self.layout.field_count())
    }

    /// 1 + sum of field widths
    pub fn record_length(&self) -> u16 {
        self.layout.record_length()
    }

    pub fn record_count(&self) -> u32 {
        self.record_count
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn flags(&self) -> TableFlags {
        self.flags
    }

    pub fn language_driver(&self) -> u8 {
        self.language_driver
    }

    pub fn codepage(&self) -> Codepage {
        self.layout.codepage()
    }

    pub fn last_update(&self) -> LastUpdate {
        self.last_update
    }

    /// Check if the version byte carries the memo bit
    pub fn has_memo(&self) -> bool {
        self.version & VERSION_MEMO_BIT != 0
    }

    /// Shared layout snapshot records bind to
    pub(crate) fn layout(&self) -> &Arc<RecordLayout> {
        &self.layout
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn increment_record_count(&mut self) {
        self.record_count += 1;
        self.dirty = true;
    }

    /// Refresh the modification date and clear the dirty flag after a flush
    pub(crate) fn mark_flushed(&mut self) {
        self.dirty = false;
    }

    pub(crate) fn touch(&mut self) {
        self.last_update = LastUpdate::today();
    }

    fn header_length_for(field_count: usize) -> u16 {
        (PREAMBLE_SIZE + field_count * DESCRIPTOR_SIZE + 1) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> Header {
        let mut header = Header::new(0x03);
        header.add_field("NAME", FieldType::Character, 20, 0).unwrap();
        header.add_field("AGE", FieldType::Numeric, 3, 0).unwrap();
        header.add_field("BORN", FieldType::Date, 8, 0).unwrap();
        header
    }

    #[test]
    fn test_length_invariants() {
        let header = sample_header();
        assert_eq!(header.header_length(), 32 + 32 * 3 + 1);
        assert_eq!(header.record_length(), 1 + 20 + 3 + 8);
    }

    #[test]
    fn test_offsets_are_cumulative() {
        let header = sample_header();
        assert_eq!(header.field(0).unwrap().offset(), 1);
        assert_eq!(header.field(1).unwrap().offset(), 21);
        assert_eq!(header.field(2).unwrap().offset(), 24);
    }

    #[test]
    fn test_header_roundtrip() {
        let header = sample_header();
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), header.header_length() as usize);
        assert_eq!(*bytes.last().unwrap(), DESCRIPTOR_TERMINATOR);

        let parsed = Header::parse(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(parsed.version(), header.version());
        assert_eq!(parsed.field_count(), 3);
        assert_eq!(parsed.record_length(), header.record_length());
        assert_eq!(parsed.fields(), header.fields());
        assert_eq!(parsed.language_driver(), 0x03);
    }

    #[test]
    fn test_memo_field_sets_version_bit() {
        let mut header = Header::new(0x00);
        assert!(!header.has_memo());
        header.add_field("NOTES", FieldType::Memo, 10, 0).unwrap();
        assert!(header.has_memo());
        assert!(header.flags().contains(TableFlags::MEMO));
    }

    #[test]
    fn test_add_field_rejects_duplicates() {
        let mut header = sample_header();
        let err = header.add_field("name", FieldType::Character, 5, 0).unwrap_err();
        assert!(matches!(err, DbfError::State(_)));
    }

    #[test]
    fn test_add_field_rejected_once_records_exist() {
        let mut header = sample_header();
        header.increment_record_count();
        let err = header.add_field("CITY", FieldType::Character, 15, 0).unwrap_err();
        assert!(matches!(err, DbfError::State(_)));
    }

    #[test]
    fn test_find_field_case_insensitive() {
        let header = sample_header();
        assert_eq!(header.field_index("age").unwrap(), 1);
        assert_eq!(header.field_index("AGE").unwrap(), 1);
        assert!(matches!(
            header.field_index("MISSING").unwrap_err(),
            DbfError::UnknownField(_)
        ));
    }

    #[test]
    fn test_parse_rejects_length_mismatch() {
        let header = sample_header();
        let mut bytes = header.to_bytes();
        // corrupt the stored record length
        bytes[10..12].copy_from_slice(&999u16.to_le_bytes());
        assert!(matches!(
            Header::parse(&mut Cursor::new(&bytes)).unwrap_err(),
            DbfError::Format(_)
        ));
    }

    #[test]
    fn test_parse_rejects_missing_terminator() {
        let header = sample_header();
        let mut bytes = header.to_bytes();
        let last = bytes.len() - 1;
        // replace the terminator with the start of another entry
        bytes[last] = b'X';
        assert!(matches!(
            Header::parse(&mut Cursor::new(&bytes)).unwrap_err(),
            DbfError::Format(_)
        ));
    }

    #[test]
    fn test_civil_from_days() {
        assert_eq!(civil_from_days(0), (1970, 1, 1));
        assert_eq!(civil_from_days(11_016), (2000, 2, 29));
        assert_eq!(civil_from_days(19_723), (2024, 1, 1));
    }
}
