//! Streaming ZIP writer that deflates entries on the fly
//!
//! Each entry is written as a local header with the data-descriptor flag set,
//! followed by the compressed stream and a trailing descriptor, so nothing has
//! to be seeked back or held in memory. The central directory is written by
//! [`StreamingZipWriter::finish`].

use crate::error::{ExportError, Result};
use chrono::{Datelike, NaiveDateTime, Timelike};
use crc32fast::Hasher as Crc32;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::Write;

const LOCAL_FILE_HEADER_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x03, 0x04];
const DATA_DESCRIPTOR_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x07, 0x08];
const CENTRAL_DIRECTORY_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x01, 0x02];
const END_OF_CENTRAL_DIRECTORY_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x05, 0x06];

/// general purpose flag: sizes and CRC follow the data
const FLAG_DATA_DESCRIPTOR: u16 = 1 << 3;
const METHOD_DEFLATE: u16 = 8;
const VERSION_NEEDED: u16 = 20;

/// Finished entry, kept for the central directory
struct ZipEntry {
    name: String,
    local_header_offset: u32,
    crc32: u32,
    compressed_size: u32,
    uncompressed_size: u32,
}

/// Writer that counts the bytes passed through to the output
struct CountingWriter<W: Write> {
    inner: W,
    written: u64,
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Entry being written
struct CurrentEntry<W: Write> {
    name: String,
    local_header_offset: u64,
    data_offset: u64,
    crc: Crc32,
    uncompressed_size: u64,
    encoder: DeflateEncoder<CountingWriter<W>>,
}

/// Streaming ZIP writer that compresses data on-the-fly
pub struct StreamingZipWriter<W: Write> {
    output: Option<CountingWriter<W>>,
    current_entry: Option<CurrentEntry<W>>,
    entries: Vec<ZipEntry>,
    compression_level: u32,
    dos_time: u16,
    dos_date: u16,
}

impl<W: Write> StreamingZipWriter<W> {
    /// Create a writer with deflate level 6
    pub fn new(output: W) -> Self {
        Self::with_compression(output, 6)
    }

    /// Create a writer with a deflate level between 0 and 9
    pub fn with_compression(output: W, compression_level: u32) -> Self {
        let (dos_time, dos_date) = dos_timestamp(chrono::Local::now().naive_local());
        StreamingZipWriter {
            output: Some(CountingWriter {
                inner: output,
                written: 0,
            }),
            current_entry: None,
            entries: Vec::new(),
            compression_level: compression_level.min(9),
            dos_time,
            dos_date,
        }
    }

    /// Start a new entry (file) in the ZIP, finishing the previous one
    pub fn start_entry(&mut self, name: &str) -> Result<()> {
        let mut output = self.take_output()?;

        let local_header_offset = output.written;
        let mut header = Vec::with_capacity(30 + name.len());
        header.extend_from_slice(&LOCAL_FILE_HEADER_SIGNATURE);
        header.extend_from_slice(&VERSION_NEEDED.to_le_bytes());
        header.extend_from_slice(&FLAG_DATA_DESCRIPTOR.to_le_bytes());
        header.extend_from_slice(&METHOD_DEFLATE.to_le_bytes());
        header.extend_from_slice(&self.dos_time.to_le_bytes());
        header.extend_from_slice(&self.dos_date.to_le_bytes());
        header.extend_from_slice(&0u32.to_le_bytes()); // crc32, in descriptor
        header.extend_from_slice(&0u32.to_le_bytes()); // compressed size, in descriptor
        header.extend_from_slice(&0u32.to_le_bytes()); // uncompressed size, in descriptor
        header.extend_from_slice(&(name.len() as u16).to_le_bytes());
        header.extend_from_slice(&0u16.to_le_bytes()); // extra len
        header.extend_from_slice(name.as_bytes());
        output.write_all(&header)?;

        let data_offset = output.written;
        self.current_entry = Some(CurrentEntry {
            name: name.to_string(),
            local_header_offset,
            data_offset,
            crc: Crc32::new(),
            uncompressed_size: 0,
            encoder: DeflateEncoder::new(output, Compression::new(self.compression_level)),
        });
        Ok(())
    }

    /// Write uncompressed data to the current entry
    pub fn write_data(&mut self, data: &[u8]) -> Result<()> {
        let entry = self
            .current_entry
            .as_mut()
            .ok_or_else(|| ExportError::InvalidState("No entry started".to_string()))?;

        entry.crc.update(data);
        entry.uncompressed_size += data.len() as u64;
        entry.encoder.write_all(data)?;
        Ok(())
    }

    /// Finish the current entry, if any, and get the output back
    fn take_output(&mut self) -> Result<CountingWriter<W>> {
        if let Some(entry) = self.current_entry.take() {
            let mut output = entry.encoder.finish()?;

            let crc32 = entry.crc.finalize();
            let compressed_size = to_u32(output.written - entry.data_offset, &entry.name)?;
            let uncompressed_size = to_u32(entry.uncompressed_size, &entry.name)?;

            let mut descriptor = Vec::with_capacity(16);
            descriptor.extend_from_slice(&DATA_DESCRIPTOR_SIGNATURE);
            descriptor.extend_from_slice(&crc32.to_le_bytes());
            descriptor.extend_from_slice(&compressed_size.to_le_bytes());
            descriptor.extend_from_slice(&uncompressed_size.to_le_bytes());
            output.write_all(&descriptor)?;

            self.entries.push(ZipEntry {
                local_header_offset: to_u32(entry.local_header_offset, &entry.name)?,
                name: entry.name,
                crc32,
                compressed_size,
                uncompressed_size,
            });
            return Ok(output);
        }

        self.output
            .take()
            .ok_or_else(|| ExportError::InvalidState("ZIP writer already failed".to_string()))
    }

    /// Write the central directory and return the flushed output
    pub fn finish(mut self) -> Result<W> {
        let mut output = self.take_output()?;
        let central_dir_offset = output.written;

        let mut directory = Vec::with_capacity(self.entries.len() * 80);
        for entry in &self.entries {
            directory.extend_from_slice(&CENTRAL_DIRECTORY_SIGNATURE);
            directory.extend_from_slice(&VERSION_NEEDED.to_le_bytes()); // version made by
            directory.extend_from_slice(&VERSION_NEEDED.to_le_bytes());
            directory.extend_from_slice(&FLAG_DATA_DESCRIPTOR.to_le_bytes());
            directory.extend_from_slice(&METHOD_DEFLATE.to_le_bytes());
            directory.extend_from_slice(&self.dos_time.to_le_bytes());
            directory.extend_from_slice(&self.dos_date.to_le_bytes());
            directory.extend_from_slice(&entry.crc32.to_le_bytes());
            directory.extend_from_slice(&entry.compressed_size.to_le_bytes());
            directory.extend_from_slice(&entry.uncompressed_size.to_le_bytes());
            directory.extend_from_slice(&(entry.name.len() as u16).to_le_bytes());
            directory.extend_from_slice(&0u16.to_le_bytes()); // extra len
            directory.extend_from_slice(&0u16.to_le_bytes()); // file comment len
            directory.extend_from_slice(&0u16.to_le_bytes()); // disk number start
            directory.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
            directory.extend_from_slice(&0u32.to_le_bytes()); // external attrs
            directory.extend_from_slice(&entry.local_header_offset.to_le_bytes());
            directory.extend_from_slice(entry.name.as_bytes());
        }
        output.write_all(&directory)?;

        let central_dir_size = to_u32(directory.len() as u64, "central directory")?;
        let central_dir_offset = to_u32(central_dir_offset, "central directory")?;
        let entry_count = self.entries.len() as u16;

        let mut eocd = Vec::with_capacity(22);
        eocd.extend_from_slice(&END_OF_CENTRAL_DIRECTORY_SIGNATURE);
        eocd.extend_from_slice(&0u16.to_le_bytes()); // disk number
        eocd.extend_from_slice(&0u16.to_le_bytes()); // disk with central dir
        eocd.extend_from_slice(&entry_count.to_le_bytes());
        eocd.extend_from_slice(&entry_count.to_le_bytes());
        eocd.extend_from_slice(&central_dir_size.to_le_bytes());
        eocd.extend_from_slice(&central_dir_offset.to_le_bytes());
        eocd.extend_from_slice(&0u16.to_le_bytes()); // comment len
        output.write_all(&eocd)?;

        output.flush()?;
        Ok(output.inner)
    }
}

impl<W: Write> Write for StreamingZipWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.write_data(buf)
            .map(|_| buf.len())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self.current_entry.as_mut() {
            Some(entry) => entry.encoder.flush(),
            None => Ok(()),
        }
    }
}

fn to_u32(value: u64, what: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| ExportError::InvalidState(format!("'{}' exceeds the 4GB ZIP32 limit", what)))
}

/// MS-DOS time and date fields; years before 1980 clamp to 1980-01-01
fn dos_timestamp(now: NaiveDateTime) -> (u16, u16) {
    if now.year() < 1980 {
        return (0, (1 << 5) | 1);
    }
    let time = ((now.hour() as u16) << 11) | ((now.minute() as u16) << 5) | (now.second() as u16 / 2);
    let date =
        (((now.year() - 1980) as u16) << 9) | ((now.month() as u16) << 5) | now.day() as u16;
    (time, date)
}
