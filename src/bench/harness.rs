//! Timed, memory-measured runs of the exporters

use super::config::{
    BenchConfig, MemoryFigure, CSV_LIBRARY_FILE, CSV_STREAM_FILE, CSV_UNBUFFERED_FILE, XLSX_FILE,
};
use super::metrics::{to_mb, MemoryStats, MetricsProvider};
use crate::delimited::{export_csv_buffered, export_csv_library, export_csv_unbuffered, AppendMode};
use crate::error::{ExportError, Result};
use crate::types::Dataset;
use crate::xlsx::export_xlsx_stream_with_options;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Measurements of one successful exporter run
#[derive(Debug, Clone)]
pub struct BenchReport {
    pub label: String,
    pub path: PathBuf,
    pub duration: Duration,
    pub before: MemoryStats,
    pub after: MemoryStats,
    /// Size of the output file, or why it could not be read
    pub file_size: std::result::Result<u64, String>,
    pub memory_figure: MemoryFigure,
}

impl BenchReport {
    /// Bytes allocated while the exporter ran
    pub fn allocated_delta_bytes(&self) -> u64 {
        self.after
            .total_allocated_bytes
            .saturating_sub(self.before.total_allocated_bytes)
    }

    /// Bytes allocated since process start, measured after the run
    pub fn total_allocated_bytes(&self) -> u64 {
        self.after.total_allocated_bytes
    }

    /// Live heap bytes after the run
    pub fn heap_bytes(&self) -> u64 {
        self.after.heap_bytes
    }

    pub fn collections_delta(&self) -> u32 {
        self.after.collections.saturating_sub(self.before.collections)
    }
}

impl fmt::Display for BenchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}] Done in {:.2?}", self.label, self.duration)?;

        if matches!(self.memory_figure, MemoryFigure::Delta | MemoryFigure::Both) {
            writeln!(f, "Alloc Delta: {:.2} MB", to_mb(self.allocated_delta_bytes()))?;
        }
        if matches!(self.memory_figure, MemoryFigure::Absolute | MemoryFigure::Both) {
            writeln!(f, "Total Alloc: {:.2} MB", to_mb(self.total_allocated_bytes()))?;
            writeln!(f, "Heap Alloc : {:.2} MB", to_mb(self.heap_bytes()))?;
        }

        match &self.file_size {
            Ok(bytes) => writeln!(f, "File size: {:.2} MB", to_mb(*bytes))?,
            Err(e) => writeln!(f, "Error getting file size: {}", e)?,
        }
        write!(f, "GC Count Increased  : {}", self.collections_delta())
    }
}

/// Result of one benchmark: a report, or the error that stopped the exporter
#[derive(Debug)]
pub enum BenchOutcome {
    Completed(BenchReport),
    Failed { label: String, error: ExportError },
}

impl BenchOutcome {
    pub fn label(&self) -> &str {
        match self {
            BenchOutcome::Completed(report) => &report.label,
            BenchOutcome::Failed { label, .. } => label,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, BenchOutcome::Completed(_))
    }

    pub fn report(&self) -> Option<&BenchReport> {
        match self {
            BenchOutcome::Completed(report) => Some(report),
            BenchOutcome::Failed { .. } => None,
        }
    }
}

impl fmt::Display for BenchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BenchOutcome::Completed(report) => fmt::Display::fmt(report, f),
            BenchOutcome::Failed { label, error } => write!(f, "[{}] Error: {}", label, error),
        }
    }
}

/// Runs exporters one at a time against a metrics provider
pub struct Benchmark<M> {
    metrics: M,
    memory_figure: MemoryFigure,
}

impl<M: MetricsProvider> Benchmark<M> {
    pub fn new(metrics: M) -> Self {
        Benchmark {
            metrics,
            memory_figure: MemoryFigure::default(),
        }
    }

    pub fn with_memory_figure(mut self, figure: MemoryFigure) -> Self {
        self.memory_figure = figure;
        self
    }

    pub fn metrics_mut(&mut self) -> &mut M {
        &mut self.metrics
    }

    /// Time `exporter` and measure memory around it.
    ///
    /// `path` is only stat'ed afterwards for the file size; the exporter is
    /// responsible for writing it.
    pub fn run<F>(&mut self, label: &str, path: &Path, exporter: F) -> BenchOutcome
    where
        F: FnOnce() -> Result<()>,
    {
        tracing::debug!(label, path = %path.display(), "benchmark started");

        self.metrics.collect();
        let before = self.metrics.snapshot();
        let start = Instant::now();

        let result = exporter();

        let duration = start.elapsed();
        let after = self.metrics.snapshot();

        if let Err(error) = result {
            tracing::warn!(label, %error, "benchmark failed");
            return BenchOutcome::Failed {
                label: label.to_string(),
                error,
            };
        }

        let file_size = std::fs::metadata(path)
            .map(|m| m.len())
            .map_err(|e| e.to_string());
        if let Err(e) = &file_size {
            tracing::warn!(label, error = %e, "output file could not be stat'ed");
        }

        tracing::debug!(label, elapsed_ms = duration.as_millis() as u64, "benchmark finished");

        BenchOutcome::Completed(BenchReport {
            label: label.to_string(),
            path: path.to_path_buf(),
            duration,
            before,
            after,
            file_size,
            memory_figure: self.memory_figure,
        })
    }
}

type ExportFn<'a> = Box<dyn Fn(&Path, &Dataset) -> Result<()> + 'a>;

struct SuiteEntry<'a> {
    label: String,
    path: PathBuf,
    exporter: ExportFn<'a>,
}

/// Ordered list of exporters run against one shared dataset
#[derive(Default)]
pub struct Suite<'a> {
    entries: Vec<SuiteEntry<'a>>,
}

impl<'a> Suite<'a> {
    pub fn new() -> Self {
        Suite {
            entries: Vec::new(),
        }
    }

    /// Append an exporter writing to `path`
    pub fn add<F>(mut self, label: &str, path: impl Into<PathBuf>, exporter: F) -> Self
    where
        F: Fn(&Path, &Dataset) -> Result<()> + 'a,
    {
        self.entries.push(SuiteEntry {
            label: label.to_string(),
            path: path.into(),
            exporter: Box::new(exporter),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.label.as_str()).collect()
    }

    /// Run every exporter in order, writing each outcome to `out` as it completes.
    ///
    /// A failed exporter is reported and the next one still runs. Only a
    /// failure to write to `out` ends the run early.
    pub fn run<M, W>(
        &self,
        bench: &mut Benchmark<M>,
        data: &Dataset,
        out: &mut W,
    ) -> io::Result<Vec<BenchOutcome>>
    where
        M: MetricsProvider,
        W: Write,
    {
        let mut outcomes = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let outcome = bench.run(&entry.label, &entry.path, || {
                (entry.exporter)(&entry.path, data)
            });
            writeln!(out, "\n{}", outcome)?;
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }
}

impl Suite<'static> {
    /// The four exporters of a full run, with outputs under `config.output_dir`
    pub fn standard(config: &BenchConfig) -> Self {
        let buffer_size = config.buffer_size;
        let flush_interval = config.flush_interval;
        let compression_level = config.compression_level;
        let mode = config.append_mode;
        let unbuffered_label = match mode {
            AppendMode::PerRow => "Export to CSV (Unbuffered)",
            AppendMode::PerCall => "Export to CSV (Append)",
        };

        Suite::new()
            .add(
                "Export to CSV",
                config.output_path(CSV_LIBRARY_FILE),
                |path, data| export_csv_library(path, data),
            )
            .add(
                unbuffered_label,
                config.output_path(CSV_UNBUFFERED_FILE),
                move |path, data| export_csv_unbuffered(path, data, mode),
            )
            .add(
                "Export to CSV (Stream)",
                config.output_path(CSV_STREAM_FILE),
                move |path, data| export_csv_buffered(path, data, buffer_size),
            )
            .add(
                "Export to Excel (Stream + Style)",
                config.output_path(XLSX_FILE),
                move |path, data| {
                    export_xlsx_stream_with_options(path, data, flush_interval, compression_level)
                },
            )
    }
}
