//! Calendar dates for the 'D' field type
//!
//! Stored on disk as eight ASCII digits "YYYYMMDD". An all-blank field is
//! an empty date; anything else with non-digit content is malformed.

use std::fmt;

use crate::error::{DbfError, DbfResult};

/// A validated calendar date
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Date {
    year: u16,
    month: u8,
    day: u8,
}

impl Date {
    /// Create a date, validating month, day, and leap years
    pub fn new(year: u16, month: u8, day: u8) -> DbfResult<Self> {
        if year > 9999 {
            return Err(DbfError::Format(format!(
                "year {} does not fit in four digits",
                year
            )));
        }
        if month < 1 || month > 12 {
            return Err(DbfError::Format(format!("invalid month {}", month)));
        }
        if day < 1 || day > days_in_month(year, month) {
            return Err(DbfError::Format(format!(
                "invalid day {} for {:04}-{:02}",
                day, year, month
            )));
        }
        Ok(Date { year, month, day })
    }

    /// Parse the eight-digit "YYYYMMDD" on-disk form
    pub fn from_ymd_digits(data: &[u8]) -> DbfResult<Self> {
        if data.len() != 8 {
            return Err(DbfError::Format(format!(
                "date field must be 8 bytes, got {}",
                data.len()
            )));
        }
        if !data.iter().all(|b| b.is_ascii_digit()) {
            return Err(DbfError::Format(format!(
                "non-digit content in date field: {:?}",
                String::from_utf8_lossy(data)
            )));
        }
        let digits = |range: std::ops::Range<usize>| -> u16 {
            data[range].iter().fold(0u16, |acc, b| acc * 10 + (b - b'0') as u16)
        };
        Date::new(digits(0..4), digits(4..6) as u8, digits(6..8) as u8)
    }

    /// Format as the eight-digit on-disk form
    pub fn to_ymd_digits(&self) -> [u8; 8] {
        let mut buf = [0u8; 8];
        let text = format!("{:04}{:02}{:02}", self.year, self.month, self.day);
        buf.copy_from_slice(text.as_bytes());
        buf
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn day(&self) -> u8 {
        self.day
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

fn is_leap_year(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_roundtrip() {
        let date = Date::new(1989, 3, 29).unwrap();
        let digits = date.to_ymd_digits();
        assert_eq!(&digits, b"19890329");
        assert_eq!(Date::from_ymd_digits(&digits).unwrap(), date);
    }

    #[test]
    fn test_leap_years() {
        // 2000 is a leap year (divisible by 400), 1900 is not
        assert!(Date::new(2000, 2, 29).is_ok());
        assert!(Date::new(1900, 2, 29).is_err());
        assert!(Date::new(2024, 2, 29).is_ok());
        assert!(Date::new(2023, 2, 29).is_err());
    }

    #[test]
    fn test_invalid_dates() {
        assert!(Date::new(2020, 0, 1).is_err());
        assert!(Date::new(2020, 13, 1).is_err());
        assert!(Date::new(2020, 4, 31).is_err());
        assert!(Date::new(2020, 1, 0).is_err());
    }

    #[test]
    fn test_non_digit_content() {
        assert!(Date::from_ymd_digits(b"2020 101").is_err());
        assert!(Date::from_ymd_digits(b"20200101").is_ok());
        assert!(Date::from_ymd_digits(b"2020").is_err());
    }

    #[test]
    fn test_display() {
        let date = Date::new(7, 1, 2).unwrap();
        assert_eq!(date.to_string(), "0007-01-02");
        assert_eq!(&date.to_ymd_digits(), b"00070102");
    }
}
