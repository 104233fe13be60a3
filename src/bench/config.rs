//! Benchmark run settings

use crate::delimited::{AppendMode, DEFAULT_BUFFER_SIZE};
use crate::xlsx::{DEFAULT_COMPRESSION_LEVEL, DEFAULT_FLUSH_INTERVAL};
use std::path::{Path, PathBuf};

/// Records generated for a full run
pub const RECORD_COUNT: usize = 100_000;

/// Output of the `csv` crate encoder
pub const CSV_LIBRARY_FILE: &str = "benchmark_output.csv";
/// Output of the unbuffered hand-written writer
pub const CSV_UNBUFFERED_FILE: &str = "benchmark_output_unbuffered.csv";
/// Output of the buffered hand-written writer
pub const CSV_STREAM_FILE: &str = "benchmark_output_stream.csv";
/// Output of the streaming workbook writer
pub const XLSX_FILE: &str = "benchmark_output.xlsx";

/// Which memory figures a report prints
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MemoryFigure {
    /// Bytes allocated during the run
    Delta,
    /// Process-wide totals after the run
    Absolute,
    /// Delta followed by the absolute totals
    #[default]
    Both,
}

/// Settings shared by every benchmark in a run.
///
/// # Examples
///
/// ```
/// use exportbench::bench::{BenchConfig, MemoryFigure};
///
/// let config = BenchConfig::default()
///     .with_record_count(1_000)
///     .with_output_dir("/tmp")
///     .with_memory_figure(MemoryFigure::Delta);
/// assert_eq!(config.record_count, 1_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchConfig {
    pub record_count: usize,
    pub output_dir: PathBuf,
    /// Buffer size of the buffered CSV writer
    pub buffer_size: usize,
    /// Rows the workbook stream keeps in memory
    pub flush_interval: usize,
    /// Deflate level of the saved workbook, 0-9
    pub compression_level: u32,
    /// Write path of the unbuffered CSV writer
    pub append_mode: AppendMode,
    pub memory_figure: MemoryFigure,
}

impl Default for BenchConfig {
    fn default() -> Self {
        BenchConfig {
            record_count: RECORD_COUNT,
            output_dir: PathBuf::from("."),
            buffer_size: DEFAULT_BUFFER_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            append_mode: AppendMode::default(),
            memory_figure: MemoryFigure::default(),
        }
    }
}

impl BenchConfig {
    pub fn with_record_count(mut self, count: usize) -> Self {
        self.record_count = count;
        self
    }

    pub fn with_output_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.output_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    pub fn with_flush_interval(mut self, rows: usize) -> Self {
        self.flush_interval = rows.max(1);
        self
    }

    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level.min(9);
        self
    }

    pub fn with_append_mode(mut self, mode: AppendMode) -> Self {
        self.append_mode = mode;
        self
    }

    pub fn with_memory_figure(mut self, figure: MemoryFigure) -> Self {
        self.memory_figure = figure;
        self
    }

    /// `name` resolved against the output directory
    pub fn output_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }
}
