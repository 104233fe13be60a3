//! Process memory statistics behind an injectable provider

use super::alloc::TrackingAllocator;
use std::fmt;
use sysinfo::{Pid, System};

const MB: f64 = 1024.0 * 1024.0;

/// Convert bytes to megabytes for display
pub fn to_mb(bytes: u64) -> f64 {
    bytes as f64 / MB
}

/// One reading of the process allocation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    /// Bytes currently live on the heap
    pub heap_bytes: u64,
    /// Bytes allocated since startup, never decreasing
    pub total_allocated_bytes: u64,
    /// Completed collection cycles; always 0 without a collector
    pub collections: u32,
    /// Resident set size, when the platform reports it
    pub resident_bytes: Option<u64>,
}

impl fmt::Display for MemoryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total Alloc : {:.2} MB", to_mb(self.total_allocated_bytes))?;
        writeln!(f, "Heap Alloc  : {:.2} MB", to_mb(self.heap_bytes))?;
        if let Some(rss) = self.resident_bytes {
            writeln!(f, "Resident    : {:.2} MB", to_mb(rss))?;
        }
        write!(f, "Num GC      : {}", self.collections)
    }
}

/// Source of memory statistics for the benchmark harness
pub trait MetricsProvider {
    /// Bring the heap to a clean baseline before a measurement
    fn collect(&mut self);

    /// Read the current counters
    fn snapshot(&mut self) -> MemoryStats;
}

impl<M: MetricsProvider + ?Sized> MetricsProvider for &mut M {
    fn collect(&mut self) {
        (**self).collect()
    }

    fn snapshot(&mut self) -> MemoryStats {
        (**self).snapshot()
    }
}

/// Reads a [`TrackingAllocator`] installed as the global allocator, plus the
/// resident set size of this process.
pub struct TrackingMetrics {
    allocator: &'static TrackingAllocator,
    system: System,
    pid: Option<Pid>,
}

impl TrackingMetrics {
    pub fn new(allocator: &'static TrackingAllocator) -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::warn!(error = e, "resident memory unavailable");
                None
            }
        };

        TrackingMetrics {
            allocator,
            system: System::new(),
            pid,
        }
    }

    fn resident_bytes(&mut self) -> Option<u64> {
        let pid = self.pid?;
        if !self.system.refresh_process(pid) {
            return None;
        }
        self.system.process(pid).map(|p| p.memory())
    }
}

impl MetricsProvider for TrackingMetrics {
    /// Nothing to collect: memory is freed when its owner drops
    fn collect(&mut self) {}

    fn snapshot(&mut self) -> MemoryStats {
        MemoryStats {
            heap_bytes: self.allocator.current_bytes(),
            total_allocated_bytes: self.allocator.total_allocated_bytes(),
            collections: 0,
            resident_bytes: self.resident_bytes(),
        }
    }
}

/// Reads dhat's heap statistics.
///
/// A `dhat::Profiler` must be running with `dhat::Alloc` as the global
/// allocator for as long as this provider is used.
#[cfg(feature = "dhat-heap")]
#[derive(Debug, Default)]
pub struct DhatMetrics;

#[cfg(feature = "dhat-heap")]
impl MetricsProvider for DhatMetrics {
    fn collect(&mut self) {}

    fn snapshot(&mut self) -> MemoryStats {
        let stats = dhat::HeapStats::get();
        MemoryStats {
            heap_bytes: stats.curr_bytes as u64,
            total_allocated_bytes: stats.total_bytes,
            collections: 0,
            resident_bytes: None,
        }
    }
}
