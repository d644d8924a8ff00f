//! Private allocation arena backing scanner state
//!
//! A process-wide, single-threaded private heap mapped directly from the OS.
//! Everything the scanner owns (results, search sequences, struct field
//! lists, rescan buffers) allocates through it, so scanner state lives in
//! regions the region walker can recognize and exclude: the scanner never
//! reports its own bookkeeping as a match.
//!
//! The arena starts with a 20 MiB chunk and grows by mapping further chunks.
//! If the OS mapping fails, allocation falls back to the global allocator;
//! those blocks cannot be excluded from scans, which is an accepted
//! degradation.

pub mod vec;

pub use vec::ArenaVec;

use parking_lot::Mutex;
use std::alloc::Layout;

/// Initial chunk reservation: room for a few scanners and their buffers
const INITIAL_CHUNK_SIZE: usize = 20 * 1024 * 1024;

/// Every block the arena hands out is aligned to this
const BLOCK_ALIGN: usize = 16;

const PAGE_SIZE: usize = 4096;

#[derive(Debug, Clone, Copy)]
struct FreeBlock {
    offset: usize,
    size: usize,
}

struct Chunk {
    base: usize,
    size: usize,
    /// Free blocks sorted by offset, coalesced on release
    free: Vec<FreeBlock>,
}

struct ArenaState {
    chunks: Vec<Chunk>,
    initialized: bool,
    os_backed: bool,
}

static ARENA: Mutex<ArenaState> = Mutex::new(ArenaState {
    chunks: Vec::new(),
    initialized: false,
    os_backed: false,
});

impl ArenaState {
    fn ensure_init(&mut self) {
        if self.initialized {
            return;
        }
        self.initialized = true;
        if self.add_chunk(INITIAL_CHUNK_SIZE) {
            self.os_backed = true;
        } else {
            // Fall back to the global allocator; scanner state will not be
            // excludable from scans in this mode.
            tracing::warn!("arena chunk mapping failed, falling back to the global allocator");
            self.os_backed = false;
        }
    }

    fn add_chunk(&mut self, size: usize) -> bool {
        let size = round_up(size, PAGE_SIZE);
        match os_map(size) {
            Some(base) => {
                self.chunks.push(Chunk {
                    base,
                    size,
                    free: vec![FreeBlock { offset: 0, size }],
                });
                true
            }
            None => false,
        }
    }

    fn alloc_from_chunks(&mut self, size: usize) -> Option<*mut u8> {
        for chunk in &mut self.chunks {
            for i in 0..chunk.free.len() {
                if chunk.free[i].size >= size {
                    let offset = chunk.free[i].offset;
                    if chunk.free[i].size == size {
                        chunk.free.remove(i);
                    } else {
                        chunk.free[i].offset += size;
                        chunk.free[i].size -= size;
                    }
                    return Some((chunk.base + offset) as *mut u8);
                }
            }
        }
        None
    }

    fn release(&mut self, chunk_idx: usize, offset: usize, size: usize) {
        let free = &mut self.chunks[chunk_idx].free;
        let pos = free.partition_point(|b| b.offset < offset);
        free.insert(pos, FreeBlock { offset, size });

        // Coalesce with the following block, then with the preceding one
        if pos + 1 < free.len() && free[pos].offset + free[pos].size == free[pos + 1].offset {
            free[pos].size += free[pos + 1].size;
            free.remove(pos + 1);
        }
        if pos > 0 && free[pos - 1].offset + free[pos - 1].size == free[pos].offset {
            free[pos - 1].size += free[pos].size;
            free.remove(pos);
        }
    }

    fn chunk_containing(&self, addr: usize) -> Option<usize> {
        self.chunks
            .iter()
            .position(|c| addr >= c.base && addr < c.base + c.size)
    }
}

const fn round_up(value: usize, align: usize) -> usize {
    (value + align - 1) / align * align
}

/// Initializes the arena eagerly. Hosts call this from their module entry
/// hook; allocation initializes lazily if they skip it. Returns true when
/// the arena is OS-backed (and therefore excludable from scans).
pub fn init() -> bool {
    let mut state = ARENA.lock();
    state.ensure_init();
    state.os_backed
}

/// Releases every chunk. All arena-backed collections must be dropped
/// first; the module teardown hook is the only sane caller.
pub fn shutdown() {
    let mut state = ARENA.lock();
    for chunk in state.chunks.drain(..) {
        os_unmap(chunk.base, chunk.size);
    }
    state.initialized = false;
    state.os_backed = false;
}

/// Allocates `size` bytes, 16-byte aligned. Falls back to the global
/// allocator when no chunk can satisfy the request and growing fails.
pub fn allocate(size: usize) -> *mut u8 {
    let size = round_up(size.max(1), BLOCK_ALIGN);
    {
        let mut state = ARENA.lock();
        state.ensure_init();
        if let Some(ptr) = state.alloc_from_chunks(size) {
            return ptr;
        }
        if state.add_chunk(size.max(INITIAL_CHUNK_SIZE)) {
            if let Some(ptr) = state.alloc_from_chunks(size) {
                return ptr;
            }
        }
    }
    // Global-allocator fallback; `deallocate` recognizes these by address.
    unsafe { std::alloc::alloc(Layout::from_size_align_unchecked(size, BLOCK_ALIGN)) }
}

/// Returns a block obtained from [`allocate`]. `size` must match the
/// original request.
pub fn deallocate(ptr: *mut u8, size: usize) {
    if ptr.is_null() {
        return;
    }
    let size = round_up(size.max(1), BLOCK_ALIGN);
    let addr = ptr as usize;
    {
        let mut state = ARENA.lock();
        if let Some(idx) = state.chunk_containing(addr) {
            let offset = addr - state.chunks[idx].base;
            state.release(idx, offset, size);
            return;
        }
    }
    unsafe { std::alloc::dealloc(ptr, Layout::from_size_align_unchecked(size, BLOCK_ALIGN)) }
}

/// True if `addr` lies inside any arena chunk. Region enumeration uses this
/// to keep scanner state out of the scan range.
pub fn contains(addr: usize) -> bool {
    ARENA.lock().chunk_containing(addr).is_some()
}

/// True if the range `[base, base + size)` intersects any arena chunk.
pub fn overlaps(base: usize, size: usize) -> bool {
    let end = base.saturating_add(size);
    ARENA
        .lock()
        .chunks
        .iter()
        .any(|c| base < c.base + c.size && c.base < end)
}

#[cfg(windows)]
fn os_map(size: usize) -> Option<usize> {
    use winapi::um::memoryapi::VirtualAlloc;
    use winapi::um::winnt::{MEM_COMMIT, MEM_RESERVE, PAGE_READWRITE};

    let ptr = unsafe {
        VirtualAlloc(
            std::ptr::null_mut(),
            size,
            MEM_COMMIT | MEM_RESERVE,
            PAGE_READWRITE,
        )
    };
    if ptr.is_null() {
        None
    } else {
        Some(ptr as usize)
    }
}

#[cfg(windows)]
fn os_unmap(base: usize, _size: usize) {
    use winapi::um::memoryapi::VirtualFree;
    use winapi::um::winnt::MEM_RELEASE;

    unsafe {
        VirtualFree(base as *mut _, 0, MEM_RELEASE);
    }
}

#[cfg(unix)]
fn os_map(size: usize) -> Option<usize> {
    let ptr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            size,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
            -1,
            0,
        )
    };
    if ptr == libc::MAP_FAILED {
        None
    } else {
        Some(ptr as usize)
    }
}

#[cfg(unix)]
fn os_unmap(base: usize, size: usize) {
    unsafe {
        libc::munmap(base as *mut _, size);
    }
}

#[cfg(not(any(windows, unix)))]
fn os_map(_size: usize) -> Option<usize> {
    None
}

#[cfg(not(any(windows, unix)))]
fn os_unmap(_base: usize, _size: usize) {}
