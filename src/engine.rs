//! Table file engine - open/create, sequential and random record I/O
//!
//! One engine exclusively owns one seekable stream and exactly one header
//! for the file's lifetime. All I/O is synchronous and single-threaded;
//! callers serialize concurrent access themselves. The header is flushed
//! at most once, on close, when it is dirty.
//!
//! The sequential cursor (next record index for `read_next`) is
//! process-local state: reset on open, advanced by `read_next`, and
//! restartable only by reopening the file.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;

use crate::error::{DbfError, DbfResult};
use crate::storage::field::FieldType;
use crate::storage::header::Header;
use crate::storage::record::Record;

/// Optional marker byte after the data region
pub const EOF_MARKER: u8 = 0x1A;

/// A DBF table bound to an underlying byte stream
///
/// `Closed -> Open -> Closed`; every operation on a closed engine fails
/// with a state error. Dropping the engine closes it best-effort.
pub struct TableFile<S: Read + Write + Seek> {
    stream: Option<S>,
    header: Header,
    /// Next record index for `read_next`
    cursor: u32,
}

impl TableFile<File> {
    /// Open an existing table file for reading and writing
    pub fn open_path<P: AsRef<Path>>(path: P) -> DbfResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path.as_ref())?;
        Self::open(file)
    }

    /// Create a new table file, truncating anything already there
    pub fn create_path<P: AsRef<Path>>(path: P) -> DbfResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path.as_ref())?;
        Self::create(file)
    }
}

impl<S: Read + Write + Seek> TableFile<S> {
    /// Open an existing table from a stream positioned anywhere
    pub fn open(mut stream: S) -> DbfResult<Self> {
        stream.seek(SeekFrom::Start(0))?;
        let header = Header::parse(&mut stream)?;
        tracing::debug!(
            records = header.record_count(),
            fields = header.field_count(),
            "opened table"
        );
        Ok(TableFile {
            stream: Some(stream),
            header,
            cursor: 0,
        })
    }

    /// Create a new table with an empty layout on the given stream
    ///
    /// `add_field` calls must precede any record I/O.
    pub fn create(stream: S) -> DbfResult<Self> {
        Self::create_with_language_driver(stream, 0x00)
    }

    /// Create a new table with an explicit language driver byte
    pub fn create_with_language_driver(mut stream: S, language_driver: u8) -> DbfResult<Self> {
        let header = Header::new(language_driver);
        stream.seek(SeekFrom::Start(0))?;
        stream.write_all(&header.to_bytes())?;
        Ok(TableFile {
            stream: Some(stream),
            header,
            cursor: 0,
        })
    }

    /// Parsed header for this table
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Number of records in the data region
    pub fn record_count(&self) -> u32 {
        self.header.record_count()
    }

    /// Append a column to the layout
    ///
    /// Only legal before any record has been written; the rewritten header
    /// reaches disk on close.
    pub fn add_field(
        &mut self,
        name: &str,
        field_type: FieldType,
        length: u8,
        decimal_count: u8,
    ) -> DbfResult<()> {
        self.guard_open()?;
        self.header.add_field(name, field_type, length, decimal_count)
    }

    /// A blank, active record bound to the current layout
    pub fn blank_record(&self) -> Record {
        Record::new(Arc::clone(self.header.layout()))
    }

    /// Read the record at the sequential cursor and advance it
    ///
    /// Returns `Ok(false)` at end of data without touching the buffer;
    /// that is the normal end-of-iteration signal, not an error.
    pub fn read_next(&mut self, record: &mut Record) -> DbfResult<bool> {
        self.guard_open()?;
        if self.cursor >= self.header.record_count() {
            return Ok(false);
        }
        let index = self.cursor;
        self.read(record, index)?;
        self.cursor += 1;
        Ok(true)
    }

    /// Read the record at the given index into the buffer
    pub fn read(&mut self, record: &mut Record, index: u32) -> DbfResult<()> {
        self.check_layout(record)?;
        let count = self.header.record_count();
        if index >= count {
            return Err(DbfError::RecordIndexOutOfRange { index, count });
        }
        let offset = self.record_offset(index);
        let stream = self.stream_mut()?;
        stream.seek(SeekFrom::Start(offset))?;
        stream.read_exact(record.bytes_mut())?;
        record.set_index(index);
        Ok(())
    }

    /// Overwrite the record at the given index
    ///
    /// Fails for `index >= record_count`; use `append` to grow the file.
    pub fn write(&mut self, record: &Record, index: u32) -> DbfResult<()> {
        self.check_layout(record)?;
        let count = self.header.record_count();
        if index >= count {
            return Err(DbfError::RecordIndexOutOfRange { index, count });
        }
        let offset = self.record_offset(index);
        let stream = self.stream_mut()?;
        stream.seek(SeekFrom::Start(offset))?;
        stream.write_all(record.as_bytes())?;
        Ok(())
    }

    /// Write the record at the end of the data region
    ///
    /// Increments the record count, marks the header dirty, and returns
    /// the newly assigned index (also stored on the record).
    pub fn append(&mut self, record: &mut Record) -> DbfResult<u32> {
        self.check_layout(record)?;
        let index = self.header.record_count();
        let offset = self.record_offset(index);
        let stream = self.stream_mut()?;
        stream.seek(SeekFrom::Start(offset))?;
        stream.write_all(record.as_bytes())?;
        self.header.increment_record_count();
        record.set_index(index);
        Ok(index)
    }

    /// Forward-only iterator over all records
    ///
    /// Continues from the current sequential cursor; restart by reopening
    /// the file.
    pub fn records(&mut self) -> Records<'_, S> {
        Records { engine: self }
    }

    /// Flush the header if dirty, write the EOF marker, release the stream
    ///
    /// Idempotent: closing a closed engine is a no-op.
    pub fn close(&mut self) -> DbfResult<()> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };
        if self.header.is_dirty() {
            self.header.touch();
            stream.seek(SeekFrom::Start(0))?;
            stream.write_all(&self.header.to_bytes())?;
            let data_end = self.record_offset(self.header.record_count());
            stream.seek(SeekFrom::Start(data_end))?;
            stream.write_all(&[EOF_MARKER])?;
            self.header.mark_flushed();
            tracing::debug!(records = self.header.record_count(), "flushed table header");
        }
        stream.flush()?;
        Ok(())
    }

    fn record_offset(&self, index: u32) -> u64 {
        self.header.header_length() as u64 + index as u64 * self.header.record_length() as u64
    }

    fn guard_open(&self) -> DbfResult<()> {
        if self.stream.is_none() {
            return Err(DbfError::State("engine is closed".to_string()));
        }
        Ok(())
    }

    fn stream_mut(&mut self) -> DbfResult<&mut S> {
        self.stream
            .as_mut()
            .ok_or_else(|| DbfError::State("engine is closed".to_string()))
    }

    /// Records bound to a superseded layout snapshot must not reach the
    /// file; the buffer length may no longer match the record length.
    fn check_layout(&self, record: &Record) -> DbfResult<()> {
        self.guard_open()?;
        if !Arc::ptr_eq(record.layout(), self.header.layout()) {
            return Err(DbfError::State(
                "record is bound to a stale layout; create it after the last add_field"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

impl<S: Read + Write + Seek> Drop for TableFile<S> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Iterator returned by [`TableFile::records`]
pub struct Records<'a, S: Read + Write + Seek> {
    engine: &'a mut TableFile<S>,
}

impl<S: Read + Write + Seek> Iterator for Records<'_, S> {
    type Item = DbfResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut record = self.engine.blank_record();
        match self.engine.read_next(&mut record) {
            Ok(true) => Some(Ok(record)),
            Ok(false) => None,
            Err(err) => Some(Err(err)),
        }
    }
}
