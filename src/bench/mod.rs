//! Benchmark harness: timing, memory measurement and the console report
//!
//! Memory figures come from a [`MetricsProvider`], so the harness runs the
//! same way against the real allocator counters and against test fakes.

pub mod alloc;
pub mod config;
pub mod harness;
pub mod metrics;

pub use alloc::TrackingAllocator;
pub use config::{
    BenchConfig, MemoryFigure, CSV_LIBRARY_FILE, CSV_STREAM_FILE, CSV_UNBUFFERED_FILE,
    RECORD_COUNT, XLSX_FILE,
};
pub use harness::{BenchOutcome, BenchReport, Benchmark, Suite};
#[cfg(feature = "dhat-heap")]
pub use metrics::DhatMetrics;
pub use metrics::{to_mb, MemoryStats, MetricsProvider, TrackingMetrics};
