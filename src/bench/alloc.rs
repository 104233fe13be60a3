//! Counting wrapper around a global allocator
//!
//! ```ignore
//! use exportbench::bench::TrackingAllocator;
//!
//! #[global_allocator]
//! static ALLOCATOR: TrackingAllocator = TrackingAllocator::system();
//! ```

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicU64, Ordering};

/// Forwards to `A` while counting live bytes, cumulative bytes and calls.
///
/// Counters use relaxed atomics: they are statistics, not synchronization.
pub struct TrackingAllocator<A = System> {
    inner: A,
    current: AtomicU64,
    total: AtomicU64,
    allocations: AtomicU64,
}

impl TrackingAllocator<System> {
    pub const fn system() -> Self {
        Self::new(System)
    }
}

impl<A> TrackingAllocator<A> {
    pub const fn new(inner: A) -> Self {
        TrackingAllocator {
            inner,
            current: AtomicU64::new(0),
            total: AtomicU64::new(0),
            allocations: AtomicU64::new(0),
        }
    }

    /// Bytes currently allocated and not yet freed
    pub fn current_bytes(&self) -> u64 {
        self.current.load(Ordering::Relaxed)
    }

    /// Bytes allocated since startup, never decreasing
    pub fn total_allocated_bytes(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Number of successful allocations (reallocations included)
    pub fn allocations(&self) -> u64 {
        self.allocations.load(Ordering::Relaxed)
    }

    fn record_alloc(&self, size: usize) {
        self.current.fetch_add(size as u64, Ordering::Relaxed);
        self.total.fetch_add(size as u64, Ordering::Relaxed);
        self.allocations.fetch_add(1, Ordering::Relaxed);
    }

    fn record_dealloc(&self, size: usize) {
        self.current.fetch_sub(size as u64, Ordering::Relaxed);
    }
}

// SAFETY: every call is forwarded unchanged to `inner`; only counters are added.
unsafe impl<A: GlobalAlloc> GlobalAlloc for TrackingAllocator<A> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = self.inner.alloc(layout);
        if !ptr.is_null() {
            self.record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = self.inner.alloc_zeroed(layout);
        if !ptr.is_null() {
            self.record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        self.inner.dealloc(ptr, layout);
        self.record_dealloc(layout.size());
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = self.inner.realloc(ptr, layout, new_size);
        if !new_ptr.is_null() {
            // a realloc frees the old block and allocates the new one
            self.record_dealloc(layout.size());
            self.record_alloc(new_size);
        }
        new_ptr
    }
}
