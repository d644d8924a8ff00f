//! Region walker: snapshots the scannable address space and deals regions
//! out to workers one at a time

use crate::probe::{MemoryProbe, Region};
use std::sync::atomic::{AtomicUsize, Ordering};

/// 0 means use every available core
static SCAN_THREADS: AtomicUsize = AtomicUsize::new(0);

/// Caps the worker pool for subsequent scans; 0 restores auto mode
pub fn set_scan_threads(count: usize) {
    SCAN_THREADS.store(count, Ordering::Relaxed);
}

/// Cores the auto mode would use
pub fn max_scan_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Snapshot of readable regions, scanner arena excluded. May be stale by
/// the time a worker reads from it; the fault guard covers that window.
pub(crate) fn snapshot<P: MemoryProbe>(probe: &P) -> Vec<Region> {
    probe.readable_regions()
}

/// Worker count for a scan over `region_count` regions
pub(crate) fn worker_count(region_count: usize) -> usize {
    let configured = SCAN_THREADS.load(Ordering::Relaxed);
    let threads = if configured == 0 {
        max_scan_threads()
    } else {
        configured
    };
    threads.min(region_count).max(1)
}

/// Dynamic chunk-of-one scheduling: each worker steals the next unscanned
/// region index. Important under heavy size skew between regions.
pub(crate) struct RegionCursor {
    next: AtomicUsize,
}

impl RegionCursor {
    pub fn new() -> Self {
        RegionCursor {
            next: AtomicUsize::new(0),
        }
    }

    pub fn steal(&self, len: usize) -> Option<usize> {
        let idx = self.next.fetch_add(1, Ordering::Relaxed);
        (idx < len).then_some(idx)
    }
}
