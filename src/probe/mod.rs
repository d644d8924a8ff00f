//! Safe-memory probing layer
//!
//! Classifies virtual pages of the host's own address space and performs
//! fault-guarded reads. Probes are advisory: protection can change at any
//! moment while the host runs, so every bulk read is additionally routed
//! through [`MemoryProbe::read`], which translates an access fault into a
//! `false` return instead of crashing the host.

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::OsProbe;

#[cfg(target_os = "linux")]
mod unix;
#[cfg(target_os = "linux")]
pub use unix::OsProbe;

pub mod synthetic;
pub use synthetic::SyntheticProbe;

use crate::arena;
use crate::core::types::Address;

/// A contiguous run of virtual address space with uniform protection,
/// as reported by the host OS at query time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub base: Address,
    pub size: usize,
    /// Base of the OS allocation this region belongs to
    pub allocation_base: Address,
    pub readable: bool,
    pub writable: bool,
}

impl Region {
    /// One-past-the-end address
    pub fn end(&self) -> Address {
        self.base.add(self.size)
    }

    /// True if `addr` lies inside the region
    pub fn contains(&self, addr: Address) -> bool {
        addr >= self.base && addr < self.end()
    }
}

/// Page classification and fault-guarded reading for one address space.
///
/// The OS-backed implementation answers from `VirtualQuery` /
/// `/proc/self/maps`; tests substitute a synthetic map.
pub trait MemoryProbe {
    /// Protection and extent of the region containing `addr`, or `None`
    /// if the address is not part of any known mapping
    fn query(&self, addr: Address) -> Option<Region>;

    /// Copies `buf.len()` bytes out of live memory at `addr`. Returns
    /// false if any part of the range faults; the buffer contents are then
    /// unspecified. This is the sole guard against the host freeing or
    /// re-protecting memory between enumeration and read.
    fn read(&self, addr: Address, buf: &mut [u8]) -> bool;

    /// Every region of the address space, readable or not, in ascending
    /// base order. A snapshot: it may be stale by the time it is used.
    fn regions(&self) -> Vec<Region>;

    /// True iff the whole range `[addr, addr + size)` lies in a single
    /// committed region with a readable protection
    fn is_readable(&self, addr: Address, size: usize) -> bool {
        match self.query(addr) {
            Some(r) => r.readable && addr.add(size) <= r.end(),
            None => false,
        }
    }

    /// True iff the whole range lies in a single writable region
    fn is_writable(&self, addr: Address, size: usize) -> bool {
        match self.query(addr) {
            Some(r) => r.writable && addr.add(size) <= r.end(),
            None => false,
        }
    }

    /// Bytes from `addr` to the end of its containing readable region,
    /// capped by `requested`; 0 if `addr` itself is inaccessible
    fn accessible_prefix(&self, addr: Address, requested: usize) -> usize {
        match self.query(addr) {
            Some(r) if r.readable && r.contains(addr) => {
                requested.min(r.end().as_usize() - addr.as_usize())
            }
            _ => 0,
        }
    }

    /// Readable regions only, with anything belonging to the scanner arena
    /// excluded so the scanner never reports its own state as a match
    fn readable_regions(&self) -> Vec<Region> {
        self.regions()
            .into_iter()
            .filter(|r| {
                r.readable
                    && r.size > 0
                    && !arena::contains(r.allocation_base.as_usize())
                    && !arena::overlaps(r.base.as_usize(), r.size)
            })
            .collect()
    }
}
