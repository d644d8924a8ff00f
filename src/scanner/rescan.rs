//! Rescan engine: filters the existing result store by re-reading each
//! candidate with batched chunk reads
//!
//! Results are stable-sorted by address, then walked region by region with
//! just-in-time protection queries. Consecutive results whose span fits in
//! one 4 KiB chunk are validated out of a single fault-guarded copy; an
//! isolated result is read directly. One memcpy plus in-buffer compares is
//! far cheaper than N independent guarded reads, yet sparse results never
//! drag in unrelated pages.

use crate::arena::ArenaVec;
use crate::core::types::{Address, ScanOp, ScanResult};
use crate::probe::MemoryProbe;
use crate::scanner::comparator::{Comparator, Validation};
use crate::scanner::store::ResultStore;
use crate::scanner::CHUNK_THRESHOLD;

pub(crate) fn run<P: MemoryProbe>(
    probe: &P,
    comparator: &Comparator,
    op: ScanOp,
    store: &mut ResultStore,
    invalid_count: &mut usize,
) {
    store.sort_by_address();

    let mut buffer: ArenaVec<u8> = ArenaVec::new();
    buffer.resize(CHUNK_THRESHOLD, 0);
    let mut kept: ArenaVec<ScanResult> = ArenaVec::with_capacity(store.len());

    let lead = comparator.lead_bytes();
    let trail = comparator.trail_bytes();
    // Batching needs the whole candidate inside one chunk buffer
    let can_batch = lead + trail <= CHUNK_THRESHOLD;

    {
        let results = store.as_slice();
        let mut idx = 0;
        while idx < results.len() {
            let result = results[idx];

            // The walk visits each distinct address once
            if idx > 0 && results[idx - 1].address == result.address {
                idx += 1;
                continue;
            }

            // Just-in-time region query; enumeration-time knowledge is stale
            let Some(region) = probe.query(result.address) else {
                *invalid_count += 1;
                idx += 1;
                continue;
            };

            if !region.readable {
                // Skip every result in this region
                let region_end = region.end();
                while idx < results.len() && results[idx].address < region_end {
                    *invalid_count += 1;
                    idx += 1;
                }
                continue;
            }

            let region_base = region.base.as_usize();
            let region_end = region.end().as_usize();
            let addr = result.address.as_usize();

            // Candidates spanning the region boundary are not legal
            if addr < region_base || addr + trail > region_end {
                *invalid_count += 1;
                idx += 1;
                continue;
            }

            // Longest prefix of consecutive results within one chunk
            let chunk_start = region_base.max(addr.saturating_sub(lead));
            let mut span_end = addr + trail;
            let mut batch_end = idx + 1;
            if can_batch {
                while batch_end < results.len()
                    && results[batch_end].address.as_usize() < region_end
                {
                    let next = results[batch_end].address.as_usize();
                    if next + trail - chunk_start > CHUNK_THRESHOLD {
                        break;
                    }
                    span_end = span_end.max(next + trail);
                    batch_end += 1;
                }
            }

            if batch_end - idx > 1 {
                let chunk_size = (span_end - chunk_start)
                    .min(CHUNK_THRESHOLD)
                    .min(region_end - chunk_start);
                tracing::trace!(chunk_start, chunk_size, batch = batch_end - idx, "rescan batch");

                if !probe.read(Address::new(chunk_start), &mut buffer[..chunk_size]) {
                    // Memory went away under us; drop the whole batch
                    *invalid_count += batch_end - idx;
                    idx = batch_end;
                    continue;
                }

                let chunk = &buffer[..chunk_size];
                for j in idx..batch_end {
                    let old = results[j];
                    if j > idx && results[j - 1].address == old.address {
                        continue;
                    }
                    let offset = old.address.as_usize() - chunk_start;
                    if !comparator.fits_in_buffer(offset, chunk_size) {
                        *invalid_count += 1;
                        continue;
                    }
                    if let Some(mut fresh) =
                        comparator.validate_in_buffer(chunk, offset, old.address, op, Some(old.value))
                    {
                        fresh.old_value = old.value;
                        fresh.has_old = true;
                        kept.push(fresh);
                    }
                }
                idx = batch_end;
            } else {
                match comparator.validate_direct(probe, result.address, &region, op, Some(result.value))
                {
                    Validation::Match(mut fresh) => {
                        fresh.old_value = result.value;
                        fresh.has_old = true;
                        kept.push(fresh);
                    }
                    Validation::NoMatch => {}
                    Validation::Unreadable => *invalid_count += 1,
                }
                idx += 1;
            }
        }
    }

    store.replace(kept);
}
