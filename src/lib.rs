//! # exportbench
//!
//! Measures what it costs to write the same synthetic applicant records as
//! CSV and as a streamed XLSX workbook.
//!
//! ## Exporters
//!
//! - [`delimited::export_csv_library`]: the `csv` crate encoder
//! - [`delimited::export_csv_unbuffered`]: one write per row, or one
//!   open/append/close per row
//! - [`delimited::export_csv_buffered`]: fixed-size buffer flushed as it fills,
//!   byte-identical to the unbuffered output
//! - [`xlsx::export_xlsx_stream`]: single-sheet workbook with a styled header,
//!   rows streamed through a bounded in-memory window
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use exportbench::dataset::generate_applicants;
//! use exportbench::delimited::export_csv_buffered;
//! use exportbench::xlsx::export_xlsx_stream;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = generate_applicants(1_000);
//! export_csv_buffered("applicants.csv", &data, 64 * 1024)?;
//! export_xlsx_stream("applicants.xlsx", &data)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Benchmarking
//!
//! ```rust,no_run
//! use exportbench::bench::{BenchConfig, Benchmark, MemoryStats, MetricsProvider, Suite};
//! use exportbench::dataset::generate_applicants;
//!
//! struct NoMetrics;
//!
//! impl MetricsProvider for NoMetrics {
//!     fn collect(&mut self) {}
//!     fn snapshot(&mut self) -> MemoryStats {
//!         MemoryStats::default()
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BenchConfig::default().with_record_count(1_000);
//! let data = generate_applicants(config.record_count);
//! let mut bench = Benchmark::new(NoMetrics);
//! Suite::standard(&config).run(&mut bench, &data, &mut std::io::stdout())?;
//! # Ok(())
//! # }
//! ```

pub mod bench;
pub mod dataset;
pub mod delimited;
pub mod error;
pub mod logging;
pub mod types;
pub mod xlsx;

pub use error::{ExportError, Result};
pub use types::{Applicant, CellValue, Dataset, HEADERS};
