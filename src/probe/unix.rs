//! Linux probe: /proc/self/maps classification and process_vm_readv-on-self
//! as the fault guard
//!
//! `process_vm_readv` against the current pid is the OS-mediated equivalent
//! of a hardware-fault handler: a read that touches an unmapped or
//! unreadable page returns EFAULT instead of raising a signal.

use super::{MemoryProbe, Region};
use crate::core::types::Address;

use std::fs;

/// Probe over the current process's address space
#[derive(Debug, Default, Clone, Copy)]
pub struct OsProbe;

impl OsProbe {
    pub fn new() -> Self {
        OsProbe
    }

    fn parse_maps() -> Vec<Region> {
        let Ok(maps) = fs::read_to_string("/proc/self/maps") else {
            return Vec::new();
        };
        let mut regions = Vec::new();
        for line in maps.lines() {
            if let Some(region) = Self::parse_maps_line(line) {
                regions.push(region);
            }
        }
        regions
    }

    fn parse_maps_line(line: &str) -> Option<Region> {
        // Format: start-end perms offset dev inode [path]
        let mut fields = line.split_whitespace();
        let range = fields.next()?;
        let perms = fields.next()?;
        let (start, end) = range.split_once('-')?;
        let start = usize::from_str_radix(start, 16).ok()?;
        let end = usize::from_str_radix(end, 16).ok()?;
        if end <= start {
            return None;
        }
        // The vsyscall page reads as mapped but faults under process_vm_readv
        if line.ends_with("[vsyscall]") {
            return None;
        }
        let perms = perms.as_bytes();
        Some(Region {
            base: Address::new(start),
            size: end - start,
            allocation_base: Address::new(start),
            readable: perms.first() == Some(&b'r'),
            writable: perms.get(1) == Some(&b'w'),
        })
    }
}

impl MemoryProbe for OsProbe {
    fn query(&self, addr: Address) -> Option<Region> {
        Self::parse_maps().into_iter().find(|r| r.contains(addr))
    }

    fn read(&self, addr: Address, buf: &mut [u8]) -> bool {
        if buf.is_empty() {
            return true;
        }
        let local = libc::iovec {
            iov_base: buf.as_mut_ptr().cast(),
            iov_len: buf.len(),
        };
        let remote = libc::iovec {
            iov_base: addr.as_usize() as *mut libc::c_void,
            iov_len: buf.len(),
        };
        let n = unsafe { libc::process_vm_readv(current_pid(), &local, 1, &remote, 1, 0) };
        n >= 0 && n as usize == buf.len()
    }

    fn regions(&self) -> Vec<Region> {
        Self::parse_maps()
    }
}

fn current_pid() -> libc::pid_t {
    unsafe { libc::getpid() }
}
