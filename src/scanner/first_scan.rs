//! First-scan engine: parallel, chunk-buffered sweep of every readable
//! region, seeding the result store
//!
//! Workers steal regions one at a time and scan them through a
//! thread-local 64 KiB chunk buffer into thread-local result vectors
//! (system-allocated, so workers never touch the arena). Local results
//! merge into the shared store under a single mutex, where the result
//! quota is enforced; once the store saturates every worker sees the flag
//! and drops its remaining output.

use crate::core::types::{Address, ScanOp, ScanResult};
use crate::probe::{MemoryProbe, Region};
use crate::scanner::comparator::Comparator;
use crate::scanner::store::ResultStore;
use crate::scanner::walker::{self, RegionCursor};
use crate::scanner::SCAN_BUFFER_SIZE;

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

pub(crate) fn run<P: MemoryProbe + Sync>(
    probe: &P,
    comparator: &Comparator,
    op: ScanOp,
    max_results: usize,
    store: &mut ResultStore,
    errors: &mut Vec<String>,
) -> bool {
    let regions = walker::snapshot(probe);
    if regions.is_empty() {
        errors.push("No scannable memory regions found".to_string());
        return false;
    }

    let workers = walker::worker_count(regions.len());
    tracing::debug!(
        regions = regions.len(),
        workers,
        op = %op,
        "starting first scan"
    );

    let cursor = RegionCursor::new();
    let saturated = AtomicBool::new(false);
    let merge = Mutex::new(&mut *store);

    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| {
                let mut buffer = vec![0u8; SCAN_BUFFER_SIZE];
                let mut local: Vec<ScanResult> = Vec::with_capacity(max_results.min(10_000));

                while let Some(idx) = cursor.steal(regions.len()) {
                    if saturated.load(Ordering::Relaxed) {
                        continue;
                    }
                    scan_region(
                        probe,
                        comparator,
                        &regions[idx],
                        op,
                        &mut buffer,
                        &mut local,
                        max_results,
                    );
                }

                if !local.is_empty() {
                    let mut guard = merge.lock();
                    let shared: &mut ResultStore = &mut **guard;
                    // Another worker may have filled the store already
                    if shared.len() < max_results {
                        let remaining = max_results - shared.len();
                        let take = remaining.min(local.len());
                        shared.extend_from_slice(&local[..take]);
                        if shared.len() >= max_results {
                            saturated.store(true, Ordering::Relaxed);
                        }
                    }
                }
            });
        }
    });

    saturated.load(Ordering::Relaxed)
}

/// Scans one region in buffered chunks, overlapping consecutive chunks by
/// `data_size - 1` bytes so values straddling a chunk tail are not missed
fn scan_region<P: MemoryProbe>(
    probe: &P,
    comparator: &Comparator,
    region: &Region,
    op: ScanOp,
    buffer: &mut [u8],
    local: &mut Vec<ScanResult>,
    max_local: usize,
) {
    if region.size == 0 {
        return;
    }
    let data_size = comparator.data_size();
    let base = region.base.as_usize();
    let region_end = base + region.size;
    let mut current = base;

    while current < region_end && local.len() < max_local {
        let chunk_size = SCAN_BUFFER_SIZE.min(region_end - current);

        // Fault-guarded copy; a chunk that faults is skipped whole
        if !probe.read(Address::new(current), &mut buffer[..chunk_size]) {
            current += chunk_size;
            continue;
        }

        comparator.scan_chunk(&buffer[..chunk_size], Address::new(current), op, local, max_local);

        current += chunk_size;
        if data_size > 1 && current < region_end {
            current -= (data_size - 1).min(chunk_size);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{DataType, ScanValue};
    use crate::probe::SyntheticProbe;
    use crate::scanner::comparator::ScanTarget;

    fn int_comparator(target: i32, alignment: usize) -> Comparator {
        let mut comp = Comparator::for_data_type(DataType::Int, alignment);
        let mut errors = Vec::new();
        assert!(comp.setup(
            ScanOp::Exact,
            &ScanTarget::Scalar(ScanValue::from_int(target)),
            &mut errors
        ));
        comp
    }

    #[test]
    fn test_scan_finds_values_across_regions() {
        let mut probe = SyntheticProbe::new();
        let mut data_a = vec![0u8; 128];
        data_a[4..8].copy_from_slice(&77i32.to_le_bytes());
        let base_a = probe.add_region(data_a);
        let mut data_b = vec![0u8; 128];
        data_b[40..44].copy_from_slice(&77i32.to_le_bytes());
        let base_b = probe.add_region(data_b);

        let comp = int_comparator(77, 1);
        let mut store = ResultStore::new();
        let mut errors = Vec::new();
        let saturated = run(&probe, &comp, ScanOp::Exact, 1000, &mut store, &mut errors);

        assert!(!saturated);
        let mut addrs: Vec<usize> = store.as_slice().iter().map(|r| r.address.as_usize()).collect();
        addrs.sort_unstable();
        let mut want = vec![base_a.as_usize() + 4, base_b.as_usize() + 40];
        want.sort_unstable();
        assert_eq!(addrs, want);
    }

    #[test]
    fn test_value_straddling_chunk_boundary() {
        // Region two chunks long with a hit crossing the 64 KiB boundary
        let mut data = vec![0u8; SCAN_BUFFER_SIZE + 64];
        let pos = SCAN_BUFFER_SIZE - 2;
        data[pos..pos + 4].copy_from_slice(&1234i32.to_le_bytes());
        let mut probe = SyntheticProbe::new();
        let base = probe.add_region(data);

        let comp = int_comparator(1234, 1);
        let mut store = ResultStore::new();
        let mut errors = Vec::new();
        run(&probe, &comp, ScanOp::Exact, 1000, &mut store, &mut errors);

        let addrs: Vec<usize> = store.as_slice().iter().map(|r| r.address.as_usize()).collect();
        assert_eq!(addrs, vec![base.as_usize() + pos]);
    }

    #[test]
    fn test_saturation_stops_early() {
        let mut probe = SyntheticProbe::new();
        probe.add_region(vec![0u8; 4096]);

        let comp = int_comparator(0, 4);
        let mut store = ResultStore::new();
        let mut errors = Vec::new();
        let saturated = run(&probe, &comp, ScanOp::Exact, 10, &mut store, &mut errors);

        assert!(saturated);
        assert_eq!(store.len(), 10);
    }

    #[test]
    fn test_no_regions_is_an_error() {
        let probe = SyntheticProbe::new();
        let comp = int_comparator(1, 4);
        let mut store = ResultStore::new();
        let mut errors = Vec::new();
        let saturated = run(&probe, &comp, ScanOp::Exact, 10, &mut store, &mut errors);
        assert!(!saturated);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("No scannable memory regions"));
    }

    #[test]
    fn test_zero_length_region_is_quietly_skipped() {
        let mut probe = SyntheticProbe::new();
        probe.add_region(Vec::new());
        let mut data = vec![0u8; 16];
        data[0..4].copy_from_slice(&5i32.to_le_bytes());
        probe.add_region(data);

        let comp = int_comparator(5, 1);
        let mut store = ResultStore::new();
        let mut errors = Vec::new();
        run(&probe, &comp, ScanOp::Exact, 100, &mut store, &mut errors);
        assert_eq!(store.len(), 1);
        assert!(errors.is_empty());
    }
}
