//! Windows probe: VirtualQuery classification and ReadProcessMemory-on-self
//! as the fault guard

use super::{MemoryProbe, Region};
use crate::core::types::Address;

use winapi::shared::minwindef::FALSE;
use winapi::um::memoryapi::{ReadProcessMemory, VirtualQuery};
use winapi::um::processthreadsapi::GetCurrentProcess;
use winapi::um::sysinfoapi::{GetSystemInfo, SYSTEM_INFO};
use winapi::um::winnt::{
    MEMORY_BASIC_INFORMATION, MEM_COMMIT, PAGE_EXECUTE_READ, PAGE_EXECUTE_READWRITE,
    PAGE_EXECUTE_WRITECOPY, PAGE_GUARD, PAGE_NOACCESS, PAGE_READONLY, PAGE_READWRITE,
    PAGE_WRITECOPY,
};

const READABLE_MASK: u32 =
    PAGE_READONLY | PAGE_READWRITE | PAGE_WRITECOPY | PAGE_EXECUTE_READ | PAGE_EXECUTE_READWRITE
        | PAGE_EXECUTE_WRITECOPY;

const WRITABLE_MASK: u32 =
    PAGE_READWRITE | PAGE_WRITECOPY | PAGE_EXECUTE_READWRITE | PAGE_EXECUTE_WRITECOPY;

/// Probe over the current process's address space
#[derive(Debug, Default, Clone, Copy)]
pub struct OsProbe;

impl OsProbe {
    pub fn new() -> Self {
        OsProbe
    }

    fn parse_mbi(mbi: &MEMORY_BASIC_INFORMATION) -> Region {
        let committed = mbi.State == MEM_COMMIT;
        let guarded = mbi.Protect & PAGE_GUARD != 0;
        let no_access = mbi.Protect & PAGE_NOACCESS != 0;
        let accessible = committed && !guarded && !no_access;
        Region {
            base: Address::new(mbi.BaseAddress as usize),
            size: mbi.RegionSize,
            allocation_base: Address::new(mbi.AllocationBase as usize),
            readable: accessible && mbi.Protect & READABLE_MASK != 0,
            writable: accessible && mbi.Protect & WRITABLE_MASK != 0,
        }
    }

    fn address_space() -> (usize, usize) {
        unsafe {
            let mut si: SYSTEM_INFO = std::mem::zeroed();
            GetSystemInfo(&mut si);
            (
                si.lpMinimumApplicationAddress as usize,
                si.lpMaximumApplicationAddress as usize,
            )
        }
    }
}

impl MemoryProbe for OsProbe {
    fn query(&self, addr: Address) -> Option<Region> {
        unsafe {
            let mut mbi: MEMORY_BASIC_INFORMATION = std::mem::zeroed();
            let r = VirtualQuery(
                addr.as_ptr(),
                &mut mbi,
                std::mem::size_of::<MEMORY_BASIC_INFORMATION>(),
            );
            if r != std::mem::size_of::<MEMORY_BASIC_INFORMATION>() {
                return None;
            }
            Some(Self::parse_mbi(&mbi))
        }
    }

    fn read(&self, addr: Address, buf: &mut [u8]) -> bool {
        if buf.is_empty() {
            return true;
        }
        unsafe {
            let mut bytes_read = 0;
            let ok = ReadProcessMemory(
                GetCurrentProcess(),
                addr.as_ptr(),
                buf.as_mut_ptr().cast(),
                buf.len(),
                &mut bytes_read,
            );
            ok != FALSE && bytes_read == buf.len()
        }
    }

    fn regions(&self) -> Vec<Region> {
        let (min_addr, max_addr) = Self::address_space();
        let mut regions = Vec::new();
        let mut addr = min_addr;
        while addr < max_addr {
            let Some(region) = self.query(Address::new(addr)) else {
                break;
            };
            // VirtualQuery reports free ranges too; keep walking past them
            if region.size == 0 {
                break;
            }
            regions.push(region);
            addr = region.base.as_usize() + region.size;
        }
        regions
    }
}
