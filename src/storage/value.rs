//! Typed field values and the fixed-width codec
//!
//! Every field type has one textual, fixed-width on-disk encoding:
//! - Character: codepage text, right-padded with spaces
//! - Numeric/Float: right-aligned ASCII digits, left space-padded, with
//!   exactly the declared number of decimal digits
//! - Logical: one byte, T/t/Y/y true, F/f/N/n false, '?' or ' ' unknown
//! - Date: "YYYYMMDD"
//! - Memo/Binary/General: right-aligned ASCII block number
//!
//! An all-blank field decodes to the `None` form of its type. Encoding is
//! atomic: the target slice is only written after the value has been fully
//! validated and formatted.

use crate::error::{DbfError, DbfResult};
use crate::storage::codepage::Codepage;
use crate::storage::date::Date;
use crate::storage::field::{FieldDescriptor, FieldType};

/// A decoded field value, one variant per field type
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Character(String),
    Numeric(Option<f64>),
    Float(Option<f64>),
    Logical(Option<bool>),
    Date(Option<Date>),
    /// Block number into the companion file; also used for Binary and
    /// General fields
    Memo(Option<u32>),
}

impl FieldValue {
    /// Short name used in type mismatch errors
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Character(_) => "character",
            FieldValue::Numeric(_) => "numeric",
            FieldValue::Float(_) => "float",
            FieldValue::Logical(_) => "logical",
            FieldValue::Date(_) => "date",
            FieldValue::Memo(_) => "memo",
        }
    }

    /// Check that this variant is storable in a field of the given type
    fn matches(&self, field_type: FieldType) -> bool {
        match self {
            FieldValue::Character(_) => field_type == FieldType::Character,
            FieldValue::Numeric(_) => field_type == FieldType::Numeric,
            FieldValue::Float(_) => field_type == FieldType::Float,
            FieldValue::Logical(_) => field_type == FieldType::Logical,
            FieldValue::Date(_) => field_type == FieldType::Date,
            FieldValue::Memo(_) => field_type.is_memo_class(),
        }
    }
}

/// Decode one field's bytes into a typed value
pub fn decode_field(
    data: &[u8],
    desc: &FieldDescriptor,
    codepage: Codepage,
) -> DbfResult<FieldValue> {
    match desc.field_type() {
        FieldType::Character => {
            let end = data
                .iter()
                .rposition(|&b| b != b' ' && b != 0)
                .map_or(0, |p| p + 1);
            Ok(FieldValue::Character(codepage.decode(&data[..end])))
        }
        FieldType::Numeric => Ok(FieldValue::Numeric(parse_number(data, desc)?)),
        FieldType::Float => Ok(FieldValue::Float(parse_number(data, desc)?)),
        FieldType::Logical => match data[0] {
            b'T' | b't' | b'Y' | b'y' => Ok(FieldValue::Logical(Some(true))),
            b'F' | b'f' | b'N' | b'n' => Ok(FieldValue::Logical(Some(false))),
            b'?' | b' ' | 0 => Ok(FieldValue::Logical(None)),
            other => Err(DbfError::Format(format!(
                "field {:?}: invalid logical byte 0x{:02X}",
                desc.name(),
                other
            ))),
        },
        FieldType::Date => {
            if is_blank(data) {
                Ok(FieldValue::Date(None))
            } else {
                Ok(FieldValue::Date(Some(Date::from_ymd_digits(data)?)))
            }
        }
        FieldType::Memo | FieldType::Binary | FieldType::General => {
            if is_blank(data) {
                return Ok(FieldValue::Memo(None));
            }
            let text = trimmed_ascii(data);
            let block = text.parse::<u32>().map_err(|_| {
                DbfError::Format(format!(
                    "field {:?}: invalid block number {:?}",
                    desc.name(),
                    text
                ))
            })?;
            Ok(FieldValue::Memo(Some(block)))
        }
    }
}

/// Encode a typed value into one field's bytes
///
/// `buf` must be exactly `desc.length()` bytes; it is untouched when the
/// value is rejected.
pub fn encode_field(
    buf: &mut [u8],
    desc: &FieldDescriptor,
    value: &FieldValue,
    codepage: Codepage,
) -> DbfResult<()> {
    debug_assert_eq!(buf.len(), desc.length() as usize);

    if !value.matches(desc.field_type()) {
        return Err(DbfError::TypeMismatch {
            field: desc.name().to_string(),
            expected: desc.field_type(),
            actual: value.type_name(),
        });
    }

    match value {
        FieldValue::Character(text) => {
            let mut encoded = codepage.encode(text);
            encoded.truncate(buf.len());
            buf[..encoded.len()].copy_from_slice(&encoded);
            buf[encoded.len()..].fill(b' ');
        }
        FieldValue::Numeric(number) | FieldValue::Float(number) => {
            match number {
                Some(v) => {
                    let text = format!("{:.*}", desc.decimal_count() as usize, v);
                    if text.len() > buf.len() {
                        return Err(DbfError::Format(format!(
                            "field {:?}: value {} does not fit in width {}",
                            desc.name(),
                            text,
                            buf.len()
                        )));
                    }
                    let pad = buf.len() - text.len();
                    buf[..pad].fill(b' ');
                    buf[pad..].copy_from_slice(text.as_bytes());
                }
                None => buf.fill(b' '),
            }
        }
        FieldValue::Logical(state) => {
            buf[0] = match state {
                Some(true) => b'T',
                Some(false) => b'F',
                None => b'?',
            };
        }
        FieldValue::Date(date) => match date {
            Some(d) => buf.copy_from_slice(&d.to_ymd_digits()),
            None => buf.fill(b' '),
        },
        FieldValue::Memo(block) => match block {
            Some(n) => {
                let text = n.to_string();
                // u32 never exceeds the fixed 10-byte width
                let pad = buf.len() - text.len();
                buf[..pad].fill(b' ');
                buf[pad..].copy_from_slice(text.as_bytes());
            }
            None => buf.fill(b' '),
        },
    }

    Ok(())
}

fn is_blank(data: &[u8]) -> bool {
    data.iter().all(|&b| b == b' ' || b == 0)
}

fn trimmed_ascii(data: &[u8]) -> &str {
    std::str::from_utf8(data)
        .unwrap_or("")
        .trim_matches(|c| c == ' ' || c == '\0')
}

fn parse_number(data: &[u8], desc: &FieldDescriptor) -> DbfResult<Option<f64>> {
    if is_blank(data) {
        return Ok(None);
    }
    let text = trimmed_ascii(data);
    let value = text.parse::<f64>().map_err(|_| {
        DbfError::Format(format!(
            "field {:?}: invalid numeric content {:?}",
            desc.name(),
            text
        ))
    })?;
    Ok(Some(value))
}
