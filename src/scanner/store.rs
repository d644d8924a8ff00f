//! Result store: ordered candidate records in arena storage

use crate::arena::ArenaVec;
use crate::core::types::ScanResult;

/// Indexed sequence of scan results with stable iteration order. Lives in
/// the private arena so the candidates never point into themselves.
#[derive(Debug, Default)]
pub(crate) struct ResultStore {
    items: ArenaVec<ScanResult>,
}

impl ResultStore {
    pub fn new() -> Self {
        ResultStore {
            items: ArenaVec::new(),
        }
    }

    pub fn with_capacity(cap: usize) -> Self {
        ResultStore {
            items: ArenaVec::with_capacity(cap),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn as_slice(&self) -> &[ScanResult] {
        &self.items
    }

    pub fn extend_from_slice(&mut self, results: &[ScanResult]) {
        self.items.extend_from_slice(results);
    }

    /// Stable sort by ascending address. Stable because results are
    /// nearly-sorted after the previous rescan.
    pub fn sort_by_address(&mut self) {
        self.items
            .as_mut_slice()
            .sort_by(|a, b| a.address.cmp(&b.address));
    }

    /// Swaps in the filtered output of a rescan
    pub fn replace(&mut self, items: ArenaVec<ScanResult>) {
        self.items = items;
    }

    /// Window of results for paging; clamps to the stored range
    pub fn page(&self, offset: usize, limit: usize) -> &[ScanResult] {
        let start = offset.min(self.items.len());
        let end = offset.saturating_add(limit).min(self.items.len());
        &self.items[start..end]
    }
}
