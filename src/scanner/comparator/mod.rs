//! Type-specialized comparators implementing the scan operators
//!
//! One comparator per data-type family, selected by the scanner facade from
//! its `DataType` tag. Each exposes the same pair of primitives: a pure
//! in-buffer predicate over an already-copied chunk, and a direct predicate
//! that reads live memory under the fault guard.

pub mod scalar;
pub mod sequence;
pub mod structure;

pub use structure::StructSearch;

use crate::core::types::{Address, DataType, ScanOp, ScanResult, ScanValue};
use crate::probe::{MemoryProbe, Region};

use scalar::ScalarComparator;
use sequence::SequenceComparator;
use structure::StructComparator;

/// Target value handed to a scan, borrowed from the caller for the duration
/// of setup (comparators copy what they keep)
#[derive(Debug, Clone, Copy)]
pub enum ScanTarget<'a> {
    /// No target; valid only for operators that compare against history
    None,
    Scalar(ScanValue),
    Bytes(&'a [u8]),
    Struct(&'a StructSearch),
}

/// Outcome of a direct (live-memory) validation
#[derive(Debug)]
pub(crate) enum Validation {
    Match(ScanResult),
    NoMatch,
    /// Bounds violation or faulted read; counted as an invalid address
    Unreadable,
}

/// Tagged dispatch over the three comparator families
#[derive(Debug)]
pub(crate) enum Comparator {
    Scalar(ScalarComparator),
    Sequence(SequenceComparator),
    Struct(StructComparator),
}

impl Comparator {
    pub fn for_data_type(data_type: DataType, alignment: usize) -> Self {
        match data_type {
            DataType::String | DataType::ByteArray => {
                Comparator::Sequence(SequenceComparator::new())
            }
            DataType::Struct => Comparator::Struct(StructComparator::new()),
            _ => Comparator::Scalar(ScalarComparator::new(data_type, alignment)),
        }
    }

    /// Width of one candidate: scalar width, sequence length, or total
    /// struct size. Drives chunk overlap and rescan batching.
    pub fn data_size(&self) -> usize {
        match self {
            Comparator::Scalar(c) => c.width(),
            Comparator::Sequence(c) => c.len(),
            Comparator::Struct(c) => c.data_size(),
        }
    }

    /// Bytes a rescan chunk must include before a candidate's address
    pub fn lead_bytes(&self) -> usize {
        match self {
            Comparator::Struct(c) => c.lead_bytes(),
            _ => 0,
        }
    }

    /// Bytes a candidate occupies from its address onward
    pub fn trail_bytes(&self) -> usize {
        match self {
            Comparator::Struct(c) => c.trail_bytes(),
            _ => self.data_size(),
        }
    }

    /// Scanner-specific setup before each scan: stores the target and
    /// rejects invalid shapes. Errors are rendered into the scan log.
    pub fn setup(&mut self, op: ScanOp, target: &ScanTarget<'_>, errors: &mut Vec<String>) -> bool {
        match self {
            Comparator::Scalar(c) => c.setup(op, target, errors),
            Comparator::Sequence(c) => c.setup(op, target, errors),
            Comparator::Struct(c) => c.setup(op, target, errors),
        }
    }

    /// Per-family restriction on first-scan operators
    pub fn validate_first_scan_op(&self, op: ScanOp, errors: &mut Vec<String>) -> bool {
        match self {
            // Scalar first scans accept Exact and Not; the
            // previous-value operators were already rejected upstream
            Comparator::Scalar(_) => true,
            Comparator::Sequence(c) => c.validate_first_scan_op(op, errors),
            Comparator::Struct(c) => c.validate_first_scan_op(op, errors),
        }
    }

    /// Drops any stored target so a reset scanner matches a fresh one
    pub fn reset(&mut self) {
        match self {
            Comparator::Scalar(c) => c.reset(),
            Comparator::Sequence(c) => c.reset(),
            Comparator::Struct(c) => c.reset(),
        }
    }

    /// First-scan sweep over one copied chunk; pushes matches until
    /// `budget` results are collected
    pub fn scan_chunk(
        &self,
        buf: &[u8],
        chunk_base: Address,
        op: ScanOp,
        out: &mut Vec<ScanResult>,
        budget: usize,
    ) {
        match self {
            Comparator::Scalar(c) => c.scan_chunk(buf, chunk_base, op, out, budget),
            Comparator::Sequence(c) => c.scan_chunk(buf, chunk_base, op, out, budget),
            Comparator::Struct(c) => c.scan_chunk(buf, chunk_base, op, out, budget),
        }
    }

    /// True if a candidate at `offset` has all its bytes inside a buffer
    /// of `buf_len` bytes
    pub fn fits_in_buffer(&self, offset: usize, buf_len: usize) -> bool {
        match self {
            Comparator::Scalar(c) => c.fits_in_buffer(offset, buf_len),
            Comparator::Sequence(c) => c.fits_in_buffer(offset, buf_len),
            Comparator::Struct(c) => c.fits_in_buffer(offset, buf_len),
        }
    }

    /// Pure in-buffer predicate; `None` means no match. Bounds are the
    /// caller's job via [`Comparator::fits_in_buffer`].
    pub fn validate_in_buffer(
        &self,
        buf: &[u8],
        offset: usize,
        address: Address,
        op: ScanOp,
        old: Option<ScanValue>,
    ) -> Option<ScanResult> {
        match self {
            Comparator::Scalar(c) => c.validate_in_buffer(buf, offset, address, op, old),
            Comparator::Sequence(c) => c.validate_in_buffer(buf, offset, address, op),
            Comparator::Struct(c) => c.validate_in_buffer(buf, offset, address, op),
        }
    }

    /// Live-memory predicate under the fault guard
    pub fn validate_direct<P: MemoryProbe>(
        &self,
        probe: &P,
        address: Address,
        region: &Region,
        op: ScanOp,
        old: Option<ScanValue>,
    ) -> Validation {
        match self {
            Comparator::Scalar(c) => c.validate_direct(probe, address, region, op, old),
            Comparator::Sequence(c) => c.validate_direct(probe, address, region, op),
            Comparator::Struct(c) => c.validate_direct(probe, address, region, op),
        }
    }

    /// The stored search sequence, for sequence scanners only
    pub fn search_sequence(&self) -> Option<&[u8]> {
        match self {
            Comparator::Sequence(c) => Some(c.pattern()),
            _ => None,
        }
    }

    /// Fault-guarded readback of the bytes a sequence result points at
    pub fn read_sequence_bytes<P: MemoryProbe>(
        &self,
        probe: &P,
        address: Address,
    ) -> Option<Vec<u8>> {
        match self {
            Comparator::Sequence(c) => c.read_sequence_bytes(probe, address),
            _ => None,
        }
    }
}
