//! CSV writer with an explicit fixed-size output buffer

use super::escape_field;
use crate::error::{ExportError, Result};
use crate::types::{Dataset, HEADERS};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Default output buffer size (64KB)
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// CSV writer that accumulates output in a fixed-size buffer.
///
/// When the buffer is full its contents are written to the inner writer and
/// the remaining bytes of the current write continue into the emptied
/// buffer, so a row can straddle any number of flushes.
pub struct BufferedCsvWriter<W: Write> {
    inner: W,
    buffer: Vec<u8>,
    capacity: usize,
    flushes: usize,
}

impl<W: Write> BufferedCsvWriter<W> {
    /// Create a writer with the default 64KB buffer
    pub fn new(inner: W) -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE, inner)
    }

    /// Create a writer with a custom buffer size (at least one byte)
    pub fn with_capacity(capacity: usize, inner: W) -> Self {
        let capacity = capacity.max(1);
        BufferedCsvWriter {
            inner,
            buffer: Vec::with_capacity(capacity),
            capacity,
            flushes: 0,
        }
    }

    /// Append raw bytes, flushing each time the buffer fills
    pub fn write_raw(&mut self, mut data: &[u8]) -> Result<()> {
        while !data.is_empty() {
            let space = self.capacity - self.buffer.len();
            let take = space.min(data.len());
            self.buffer.extend_from_slice(&data[..take]);
            data = &data[take..];

            if self.buffer.len() == self.capacity {
                self.flush_buffer()?;
            }
        }
        Ok(())
    }

    /// Write one row: escaped fields joined with commas, `\n` terminated
    pub fn write_row<I, S>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for (i, field) in fields.into_iter().enumerate() {
            if i > 0 {
                self.write_raw(b",")?;
            }
            self.write_raw(escape_field(field.as_ref()).as_bytes())?;
        }
        self.write_raw(b"\n")
    }

    fn flush_buffer(&mut self) -> Result<()> {
        if !self.buffer.is_empty() {
            self.inner.write_all(&self.buffer)?;
            self.buffer.clear();
            self.flushes += 1;
        }
        Ok(())
    }

    /// Write out buffered bytes and flush the inner writer
    pub fn flush(&mut self) -> Result<()> {
        self.flush_buffer()?;
        self.inner.flush()?;
        Ok(())
    }

    /// Number of times the buffer has been written to the inner writer
    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    /// Bytes currently held in the buffer
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Flush and return the inner writer
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.inner)
    }
}

/// Write the header and every record through a buffer of `buffer_size` bytes
pub fn export_csv_buffered<P: AsRef<Path>>(
    path: P,
    data: &Dataset,
    buffer_size: usize,
) -> Result<()> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), buffer_size, rows = data.len(), "buffered csv export");

    let file = File::create(path).map_err(|e| ExportError::create(path, e))?;
    let mut writer = BufferedCsvWriter::with_capacity(buffer_size, file);

    writer.write_row(HEADERS)?;
    for applicant in data {
        writer.write_row(applicant.fields())?;
    }

    writer.flush()
}
