//! Field descriptors - the DBF column catalog
//!
//! Every column is described by a fixed 32-byte entry in the header's
//! descriptor table:
//! - Bytes 0-10: field name (NUL-padded)
//! - Byte 11: type tag (ASCII 'C', 'N', 'F', 'L', 'D', 'M', 'B', 'G')
//! - Bytes 12-15: reserved
//! - Byte 16: field length in bytes
//! - Byte 17: decimal count
//! - Bytes 18-31: reserved
//!
//! Byte 0 of every record holds the deletion marker, so the first field
//! always starts at record offset 1.

use crate::error::{DbfError, DbfResult};

/// Size of one descriptor entry on disk
pub const DESCRIPTOR_SIZE: usize = 32;

/// Maximum field name length in bytes
pub const MAX_NAME_LEN: usize = 10;

/// Closed set of DBF field types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Text, space-padded to the field width ('C')
    Character,
    /// Right-aligned ASCII number with fixed decimal count ('N')
    Numeric,
    /// Same encoding as Numeric, distinct tag ('F')
    Float,
    /// Single byte tri-state boolean ('L')
    Logical,
    /// "YYYYMMDD" calendar date ('D')
    Date,
    /// Block number into a companion memo file ('M')
    Memo,
    /// Block number into a companion binary file ('B')
    Binary,
    /// Block number for OLE/general data ('G')
    General,
}

impl FieldType {
    /// Decode the on-disk type tag
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            b'C' => Some(FieldType::Character),
            b'N' => Some(FieldType::Numeric),
            b'F' => Some(FieldType::Float),
            b'L' => Some(FieldType::Logical),
            b'D' => Some(FieldType::Date),
            b'M' => Some(FieldType::Memo),
            b'B' => Some(FieldType::Binary),
            b'G' => Some(FieldType::General),
            _ => None,
        }
    }

    /// Get the on-disk type tag
    pub fn tag(&self) -> u8 {
        match self {
            FieldType::Character => b'C',
            FieldType::Numeric => b'N',
            FieldType::Float => b'F',
            FieldType::Logical => b'L',
            FieldType::Date => b'D',
            FieldType::Memo => b'M',
            FieldType::Binary => b'B',
            FieldType::General => b'G',
        }
    }

    /// Width mandated by the format, if this type is fixed-width
    pub fn fixed_width(&self) -> Option<u8> {
        match self {
            FieldType::Logical => Some(1),
            FieldType::Date => Some(8),
            FieldType::Memo | FieldType::Binary | FieldType::General => Some(10),
            FieldType::Character | FieldType::Numeric | FieldType::Float => None,
        }
    }

    /// Check if this type points into a companion block file
    pub fn is_memo_class(&self) -> bool {
        matches!(
            self,
            FieldType::Memo | FieldType::Binary | FieldType::General
        )
    }
}

/// Immutable description of one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    name: String,
    field_type: FieldType,
    length: u8,
    decimal_count: u8,
    /// Byte offset of this field within a record (assigned by the header)
    offset: u16,
}

impl FieldDescriptor {
    /// Create a descriptor with an unassigned offset
    ///
    /// Validates name length, field width bounds, and the decimal count
    /// against the width. Fixed-width types must be declared at exactly
    /// their mandated width.
    pub fn new(
        name: &str,
        field_type: FieldType,
        length: u8,
        decimal_count: u8,
    ) -> DbfResult<Self> {
        if name.is_empty() || name.len() > MAX_NAME_LEN {
            return Err(DbfError::Format(format!(
                "field name {:?} must be 1-{} bytes",
                name, MAX_NAME_LEN
            )));
        }
        if name.bytes().any(|b| !b.is_ascii_graphic()) {
            return Err(DbfError::Format(format!(
                "field name {:?} contains non-printable or non-ASCII bytes",
                name
            )));
        }
        if let Some(fixed) = field_type.fixed_width() {
            if length != fixed {
                return Err(DbfError::Format(format!(
                    "field {:?} of type {:?} must have width {}, got {}",
                    name, field_type, fixed, length
                )));
            }
        } else if length == 0 {
            return Err(DbfError::Format(format!(
                "field {:?} must have a non-zero width",
                name
            )));
        }
        match field_type {
            FieldType::Numeric | FieldType::Float => {
                // A fractional column needs room for the point and at least
                // one integer digit.
                if decimal_count > 0 && decimal_count as u16 + 2 > length as u16 {
                    return Err(DbfError::Format(format!(
                        "field {:?}: decimal count {} does not fit in width {}",
                        name, decimal_count, length
                    )));
                }
            }
            _ if decimal_count != 0 => {
                return Err(DbfError::Format(format!(
                    "field {:?} of type {:?} cannot have a decimal count",
                    name, field_type
                )));
            }
            _ => {}
        }

        Ok(FieldDescriptor {
            name: name.to_string(),
            field_type,
            length,
            decimal_count,
            offset: 0,
        })
    }

    /// Parse a 32-byte descriptor entry
    pub fn from_bytes(data: &[u8]) -> DbfResult<Self> {
        if data.len() < DESCRIPTOR_SIZE {
            return Err(DbfError::Format("field descriptor too short".to_string()));
        }

        let name_end = data[..11].iter().position(|&b| b == 0).unwrap_or(11);
        let name = String::from_utf8_lossy(&data[..name_end]).into_owned();

        let tag = data[11];
        let field_type = FieldType::from_tag(tag).ok_or_else(|| {
            DbfError::Format(format!(
                "field {:?}: unknown type tag 0x{:02X}",
                name, tag
            ))
        })?;

        let length = data[16];
        let decimal_count = data[17];

        FieldDescriptor::new(&name, field_type, length, decimal_count)
    }

    /// Serialize to a 32-byte descriptor entry
    pub fn to_bytes(&self) -> [u8; DESCRIPTOR_SIZE] {
        let mut buf = [0u8; DESCRIPTOR_SIZE];
        buf[..self.name.len()].copy_from_slice(self.name.as_bytes());
        buf[11] = self.field_type.tag();
        buf[16] = self.length;
        buf[17] = self.decimal_count;
        buf
    }

    /// Field name as stored (without padding)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared field type
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Field width in bytes
    pub fn length(&self) -> u8 {
        self.length
    }

    /// Digits after the decimal point (Numeric/Float only)
    pub fn decimal_count(&self) -> u8 {
        self.decimal_count
    }

    /// Byte offset of this field within a record
    pub fn offset(&self) -> u16 {
        self.offset
    }

    /// Case-insensitive name comparison
    pub fn name_matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    pub(crate) fn set_offset(&mut self, offset: u16) {
        self.offset = offset;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_tag_roundtrip() {
        for tag in [b'C', b'N', b'F', b'L', b'D', b'M', b'B', b'G'] {
            let ty = FieldType::from_tag(tag).unwrap();
            assert_eq!(ty.tag(), tag);
        }
        assert_eq!(FieldType::from_tag(b'X'), None);
    }

    #[test]
    fn test_descriptor_roundtrip() {
        let desc = FieldDescriptor::new("SALARY", FieldType::Numeric, 12, 2).unwrap();
        let bytes = desc.to_bytes();
        assert_eq!(&bytes[..6], b"SALARY");
        assert_eq!(bytes[6], 0);
        assert_eq!(bytes[11], b'N');
        assert_eq!(bytes[16], 12);
        assert_eq!(bytes[17], 2);

        let parsed = FieldDescriptor::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.name(), "SALARY");
        assert_eq!(parsed.field_type(), FieldType::Numeric);
        assert_eq!(parsed.length(), 12);
        assert_eq!(parsed.decimal_count(), 2);
    }

    #[test]
    fn test_fixed_width_enforced() {
        assert!(FieldDescriptor::new("OK", FieldType::Date, 8, 0).is_ok());
        assert!(FieldDescriptor::new("BAD", FieldType::Date, 10, 0).is_err());
        assert!(FieldDescriptor::new("BAD", FieldType::Logical, 2, 0).is_err());
        assert!(FieldDescriptor::new("OK", FieldType::Memo, 10, 0).is_ok());
    }

    #[test]
    fn test_name_validation() {
        assert!(FieldDescriptor::new("", FieldType::Character, 10, 0).is_err());
        assert!(FieldDescriptor::new("TOOLONGNAME", FieldType::Character, 10, 0).is_err());
        assert!(FieldDescriptor::new("WITH SPACE", FieldType::Character, 10, 0).is_err());
    }

    #[test]
    fn test_decimal_count_must_fit() {
        // width 5 with 2 decimals leaves "nn.dd" - fine
        assert!(FieldDescriptor::new("A", FieldType::Numeric, 5, 2).is_ok());
        // width 3 with 2 decimals has no room for an integer digit
        assert!(FieldDescriptor::new("A", FieldType::Numeric, 3, 2).is_err());
        // decimals on a character field are malformed
        assert!(FieldDescriptor::new("A", FieldType::Character, 10, 2).is_err());
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let mut bytes = FieldDescriptor::new("A", FieldType::Character, 1, 0)
            .unwrap()
            .to_bytes();
        bytes[11] = b'Z';
        assert!(FieldDescriptor::from_bytes(&bytes).is_err());
    }
}
