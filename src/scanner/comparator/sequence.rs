//! Sequence comparator: string and byte-array matching
//!
//! First-scan anchors on the first pattern byte with memchr, then confirms
//! with a full memcmp. Only `Exact` and `Not` are meaningful for byte runs.

use crate::arena::ArenaVec;
use crate::core::types::{Address, ScanOp, ScanResult};
use crate::probe::{MemoryProbe, Region};
use crate::scanner::comparator::{ScanTarget, Validation};
use crate::scanner::MAX_SEQUENCE_SIZE;

#[derive(Debug, Default)]
pub(crate) struct SequenceComparator {
    pattern: ArenaVec<u8>,
}

impl SequenceComparator {
    pub fn new() -> Self {
        SequenceComparator {
            pattern: ArenaVec::new(),
        }
    }

    /// The stored search sequence; empty before the first setup
    pub fn pattern(&self) -> &[u8] {
        &self.pattern
    }

    pub fn len(&self) -> usize {
        self.pattern.len().max(1)
    }

    pub fn reset(&mut self) {
        self.pattern.clear();
    }

    pub fn setup(&mut self, op: ScanOp, target: &ScanTarget<'_>, errors: &mut Vec<String>) -> bool {
        if !matches!(op, ScanOp::Exact | ScanOp::Not) {
            errors.push("Only exact and not scans supported for string/byte_array".to_string());
            return false;
        }
        let ScanTarget::Bytes(bytes) = target else {
            errors.push("Sequence types require a byte-run target".to_string());
            return false;
        };
        if bytes.is_empty() {
            errors.push("Search sequence cannot be empty".to_string());
            return false;
        }
        if bytes.len() > MAX_SEQUENCE_SIZE {
            errors.push(format!(
                "Sequence size ({}) exceeds maximum allowed size ({})",
                bytes.len(),
                MAX_SEQUENCE_SIZE
            ));
            return false;
        }
        // Overwritten by each scan setup
        self.pattern.clear();
        self.pattern.extend_from_slice(bytes);
        true
    }

    pub fn validate_first_scan_op(&self, op: ScanOp, errors: &mut Vec<String>) -> bool {
        if op != ScanOp::Exact {
            errors.push("First scan for sequences only supports exact scan type".to_string());
            return false;
        }
        true
    }

    fn matches(&self, window: &[u8]) -> bool {
        window == self.pattern.as_slice()
    }

    fn check_match(&self, window: &[u8], op: ScanOp) -> bool {
        match op {
            ScanOp::Exact => self.matches(window),
            ScanOp::Not => !self.matches(window),
            _ => false,
        }
    }

    pub fn scan_chunk(
        &self,
        buf: &[u8],
        chunk_base: Address,
        op: ScanOp,
        out: &mut Vec<ScanResult>,
        budget: usize,
    ) {
        if self.pattern.is_empty() {
            return;
        }
        let len = self.pattern.len();
        let first = self.pattern[0];
        let mut start = 0;
        while out.len() < budget {
            let Some(found) = memchr::memchr(first, &buf[start..]) else {
                break;
            };
            let offset = start + found;
            if offset + len <= buf.len() && self.check_match(&buf[offset..offset + len], op) {
                out.push(ScanResult::at(chunk_base.add(offset)));
            }
            start = offset + 1;
        }
    }

    pub fn fits_in_buffer(&self, offset: usize, buf_len: usize) -> bool {
        offset + self.pattern.len() <= buf_len
    }

    pub fn validate_in_buffer(
        &self,
        buf: &[u8],
        offset: usize,
        address: Address,
        op: ScanOp,
    ) -> Option<ScanResult> {
        let window = buf.get(offset..offset + self.pattern.len())?;
        if self.check_match(window, op) {
            Some(ScanResult::at(address))
        } else {
            None
        }
    }

    pub fn validate_direct<P: MemoryProbe>(
        &self,
        probe: &P,
        address: Address,
        region: &Region,
        op: ScanOp,
    ) -> Validation {
        let len = self.pattern.len();
        if address.add(len) > region.end() {
            return Validation::Unreadable;
        }
        let mut bytes = vec![0u8; len];
        if !probe.read(address, &mut bytes) {
            return Validation::Unreadable;
        }
        if self.check_match(&bytes, op) {
            Validation::Match(ScanResult::at(address))
        } else {
            Validation::NoMatch
        }
    }

    /// Reads the bytes currently at `address` under the fault guard; the
    /// read length is the stored pattern length. Used to show what a `Not`
    /// match actually holds.
    pub fn read_sequence_bytes<P: MemoryProbe>(
        &self,
        probe: &P,
        address: Address,
    ) -> Option<Vec<u8>> {
        if self.pattern.is_empty() {
            return None;
        }
        let mut bytes = vec![0u8; self.pattern.len()];
        if probe.read(address, &mut bytes) {
            Some(bytes)
        } else {
            None
        }
    }
}
