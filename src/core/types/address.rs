//! Memory address wrapper type with alignment helpers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents a virtual address in the host's own address space
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub usize);

impl Address {
    /// Creates a new address from a usize value
    pub const fn new(value: usize) -> Self {
        Address(value)
    }

    /// Creates a null address (0x0)
    pub const fn null() -> Self {
        Address(0)
    }

    /// Checks if the address is null
    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the address is aligned to the specified boundary
    pub const fn is_aligned(&self, alignment: usize) -> bool {
        alignment != 0 && self.0 % alignment == 0
    }

    /// Rounds the address up to the next multiple of `alignment`
    pub const fn align_up(&self, alignment: usize) -> Self {
        if alignment == 0 || self.0 % alignment == 0 {
            return *self;
        }
        Address((self.0 / alignment + 1) * alignment)
    }

    /// Adds a byte offset to the address
    pub const fn offset(&self, offset: isize) -> Self {
        Address((self.0 as isize + offset) as usize)
    }

    /// Adds an unsigned byte count to the address
    pub const fn add(&self, bytes: usize) -> Self {
        Address(self.0 + bytes)
    }

    /// Subtracts a byte count, saturating at zero
    pub const fn saturating_sub(&self, bytes: usize) -> Self {
        Address(self.0.saturating_sub(bytes))
    }

    /// Returns the raw usize value
    pub const fn as_usize(&self) -> usize {
        self.0
    }

    /// Returns the address widened to u64
    pub const fn as_u64(&self) -> u64 {
        self.0 as u64
    }

    /// Returns the address as a const pointer
    pub const fn as_ptr<T>(&self) -> *const T {
        self.0 as *const T
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.0)
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

impl From<usize> for Address {
    fn from(value: usize) -> Self {
        Address::new(value)
    }
}

impl From<Address> for usize {
    fn from(value: Address) -> Self {
        value.0
    }
}
