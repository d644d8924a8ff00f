//! Synthetic probe for tests
//!
//! Feeds the scanner a synthetic address map built from caller-owned
//! buffers. Regions can be revoked to simulate the host freeing or
//! re-protecting memory between enumeration and read, which is how the
//! transient-fault paths are exercised deterministically.

use super::{MemoryProbe, Region};
use crate::core::types::Address;

struct SyntheticRegion {
    data: Box<[u8]>,
    readable: bool,
    writable: bool,
}

impl SyntheticRegion {
    fn base(&self) -> usize {
        self.data.as_ptr() as usize
    }
}

/// In-memory address map over owned buffers
#[derive(Default)]
pub struct SyntheticProbe {
    regions: Vec<SyntheticRegion>,
}

impl SyntheticProbe {
    pub fn new() -> Self {
        SyntheticProbe {
            regions: Vec::new(),
        }
    }

    /// Adds a readable+writable region backed by `data`; returns its base
    /// address. The backing allocation is stable for the probe's lifetime.
    pub fn add_region(&mut self, data: Vec<u8>) -> Address {
        self.add_region_with(data, true, true)
    }

    /// Adds a region with explicit protection flags
    pub fn add_region_with(&mut self, data: Vec<u8>, readable: bool, writable: bool) -> Address {
        let region = SyntheticRegion {
            data: data.into_boxed_slice(),
            readable,
            writable,
        };
        let base = region.base();
        self.regions.push(region);
        Address::new(base)
    }

    /// Marks the region at `base` unreadable, simulating the host freeing
    /// it. Subsequent queries and reads fail the way a live scan would see.
    pub fn revoke(&mut self, base: Address) {
        if let Some(r) = self
            .regions
            .iter_mut()
            .find(|r| r.base() == base.as_usize())
        {
            r.readable = false;
            r.writable = false;
        }
    }

    /// Mutable view of a region's bytes, for tests that change values
    /// between scans
    pub fn data_mut(&mut self, base: Address) -> &mut [u8] {
        self.regions
            .iter_mut()
            .find(|r| r.base() == base.as_usize())
            .map(|r| &mut r.data[..])
            .expect("unknown synthetic region")
    }

    fn find(&self, addr: Address) -> Option<&SyntheticRegion> {
        self.regions.iter().find(|r| {
            let base = r.base();
            addr.as_usize() >= base && addr.as_usize() < base + r.data.len()
        })
    }

    fn describe(&self, r: &SyntheticRegion) -> Region {
        Region {
            base: Address::new(r.base()),
            size: r.data.len(),
            allocation_base: Address::new(r.base()),
            readable: r.readable,
            writable: r.writable,
        }
    }
}

impl MemoryProbe for SyntheticProbe {
    fn query(&self, addr: Address) -> Option<Region> {
        self.find(addr).map(|r| self.describe(r))
    }

    fn read(&self, addr: Address, buf: &mut [u8]) -> bool {
        let Some(region) = self.find(addr) else {
            return false;
        };
        if !region.readable {
            return false;
        }
        let offset = addr.as_usize() - region.base();
        let Some(src) = region.data.get(offset..offset + buf.len()) else {
            return false;
        };
        buf.copy_from_slice(src);
        true
    }

    fn regions(&self) -> Vec<Region> {
        let mut regions: Vec<Region> = self.regions.iter().map(|r| self.describe(r)).collect();
        regions.sort_by_key(|r| r.base);
        regions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_query() {
        let mut probe = SyntheticProbe::new();
        let base = probe.add_region(vec![0u8; 64]);
        let region = probe.query(base).unwrap();
        assert_eq!(region.base, base);
        assert_eq!(region.size, 64);
        assert!(region.readable);

        let region = probe.query(base.add(63)).unwrap();
        assert_eq!(region.base, base);
        assert!(probe.query(base.add(64)).is_none());
    }

    #[test]
    fn test_read_within_bounds() {
        let mut probe = SyntheticProbe::new();
        let base = probe.add_region(vec![1, 2, 3, 4]);
        let mut out = [0u8; 2];
        assert!(probe.read(base.add(1), &mut out));
        assert_eq!(out, [2, 3]);

        // Straddling the region end must fail
        let mut out = [0u8; 4];
        assert!(!probe.read(base.add(2), &mut out));
    }

    #[test]
    fn test_revoked_region_faults() {
        let mut probe = SyntheticProbe::new();
        let base = probe.add_region(vec![0u8; 16]);
        probe.revoke(base);
        let mut out = [0u8; 1];
        assert!(!probe.read(base, &mut out));
        assert!(!probe.query(base).unwrap().readable);
    }

    #[test]
    fn test_accessible_prefix() {
        let mut probe = SyntheticProbe::new();
        let base = probe.add_region(vec![0u8; 32]);
        assert_eq!(probe.accessible_prefix(base.add(8), 100), 24);
        assert_eq!(probe.accessible_prefix(base.add(8), 4), 4);
        probe.revoke(base);
        assert_eq!(probe.accessible_prefix(base.add(8), 4), 0);
    }

    #[test]
    fn test_readable_regions_sorted() {
        let mut probe = SyntheticProbe::new();
        probe.add_region(vec![0u8; 8]);
        probe.add_region(vec![0u8; 8]);
        let unreadable = probe.add_region_with(vec![0u8; 8], false, false);
        let regions = probe.readable_regions();
        assert_eq!(regions.len(), 2);
        assert!(regions.windows(2).all(|w| w[0].base <= w[1].base));
        assert!(regions.iter().all(|r| r.base != unreadable));
    }
}
