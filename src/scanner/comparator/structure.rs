//! Keyed-struct comparator
//!
//! A struct pattern nominates one distinguished byte as a memchr anchor.
//! First-scan hunts for the key byte, then confirms every basic and
//! sequence field relative to it. Results report the struct's base address
//! (`key address - key_offset_from_base`).

use crate::arena::ArenaVec;
use crate::core::types::{Address, DataType, ScanError, ScanOp, ScanResult, ScanValue};
use crate::probe::{MemoryProbe, Region};
use crate::scanner::comparator::{scalar, ScanTarget, Validation};
use crate::scanner::MAX_STRUCT_SIZE;

/// A fixed-width field at a signed offset from the key byte
#[derive(Debug, Clone, Copy)]
struct BasicField {
    offset_from_key: i32,
    data_type: DataType,
    value: ScanValue,
}

/// A byte-run field at a signed offset from the key byte
#[derive(Debug, Clone)]
struct SequenceField {
    offset_from_key: i32,
    bytes: ArenaVec<u8>,
}

/// Composite search target built by the embedding surface.
///
/// Field offsets are given relative to the struct's base address and stored
/// relative to the key. `size_before_key`/`size_from_key` are maintained
/// incrementally as fields are added; `size_from_key` includes the key byte
/// itself and is never below 1.
#[derive(Debug, Clone)]
pub struct StructSearch {
    key_byte: u8,
    key_offset_from_base: i32,
    basic_fields: ArenaVec<BasicField>,
    sequence_fields: ArenaVec<SequenceField>,
    size_before_key: usize,
    size_from_key: usize,
}

impl StructSearch {
    pub fn new(key_byte: u8, key_offset_from_base: i32) -> Self {
        StructSearch {
            key_byte,
            key_offset_from_base,
            basic_fields: ArenaVec::new(),
            sequence_fields: ArenaVec::new(),
            size_before_key: 0,
            size_from_key: 1,
        }
    }

    pub fn key_byte(&self) -> u8 {
        self.key_byte
    }

    pub fn key_offset_from_base(&self) -> i32 {
        self.key_offset_from_base
    }

    pub fn field_count(&self) -> usize {
        self.basic_fields.len() + self.sequence_fields.len()
    }

    /// Adds a fixed-width field expected to hold `value`
    pub fn add_scalar_field(
        &mut self,
        offset_from_base: i32,
        data_type: DataType,
        value: ScanValue,
    ) -> Result<(), ScanError> {
        let Some(width) = data_type.scalar_size() else {
            return Err(ScanError::bad_config(format!(
                "{} is not a scalar field type",
                data_type
            )));
        };
        let offset_from_key = offset_from_base - self.key_offset_from_base;
        self.basic_fields.push(BasicField {
            offset_from_key,
            data_type,
            value,
        });
        self.adjust_sizes(offset_from_key, width);
        Ok(())
    }

    /// Adds a byte-run field expected to hold `bytes`
    pub fn add_sequence_field(
        &mut self,
        offset_from_base: i32,
        bytes: &[u8],
    ) -> Result<(), ScanError> {
        if bytes.is_empty() {
            return Err(ScanError::setup_missing(
                "struct sequence field cannot be empty",
            ));
        }
        let offset_from_key = offset_from_base - self.key_offset_from_base;
        let mut stored = ArenaVec::with_capacity(bytes.len());
        stored.extend_from_slice(bytes);
        self.sequence_fields.push(SequenceField {
            offset_from_key,
            bytes: stored,
        });
        self.adjust_sizes(offset_from_key, bytes.len());
        Ok(())
    }

    /// Widens the tracked extents to cover a field spanning
    /// `[key + offset, key + offset + length)`
    fn adjust_sizes(&mut self, offset: i32, length: usize) {
        if offset < 0 {
            let bytes_before_key = (-offset) as usize;
            if bytes_before_key > self.size_before_key {
                self.size_before_key = bytes_before_key;
            }
            // The field may also run past the key
            let field_end = offset as i64 + length as i64;
            if field_end > 0 && field_end as usize > self.size_from_key {
                self.size_from_key = field_end as usize;
            }
        } else {
            let field_end = offset as usize + length;
            if field_end > self.size_from_key {
                self.size_from_key = field_end;
            }
        }
    }

    pub fn size_before_key(&self) -> usize {
        self.size_before_key
    }

    pub fn size_from_key(&self) -> usize {
        self.size_from_key
    }

    pub fn total_size(&self) -> usize {
        self.size_before_key + self.size_from_key
    }

    /// True when every field matches the bytes around `key_off` in `buf`
    fn compare_at_key(&self, buf: &[u8], key_off: usize) -> bool {
        for field in &self.basic_fields {
            let idx = key_off as i64 + field.offset_from_key as i64;
            if idx < 0 {
                return false;
            }
            let Some(value) = buf
                .get(idx as usize..)
                .and_then(|s| ScanValue::from_le_bytes(field.data_type, s))
            else {
                return false;
            };
            if !scalar::values_equal(field.data_type, value, field.value) {
                return false;
            }
        }
        for field in &self.sequence_fields {
            let idx = key_off as i64 + field.offset_from_key as i64;
            if idx < 0 {
                return false;
            }
            let Some(window) = buf.get(idx as usize..idx as usize + field.bytes.len()) else {
                return false;
            };
            if window != field.bytes.as_slice() {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Default)]
pub(crate) struct StructComparator {
    search: Option<StructSearch>,
}

impl StructComparator {
    pub fn new() -> Self {
        StructComparator { search: None }
    }

    pub fn search(&self) -> Option<&StructSearch> {
        self.search.as_ref()
    }

    pub fn reset(&mut self) {
        self.search = None;
    }

    pub fn data_size(&self) -> usize {
        self.search.as_ref().map_or(1, |s| s.total_size().max(1))
    }

    /// Bytes the rescan chunk must include before the reported base address
    pub fn lead_bytes(&self) -> usize {
        self.search.as_ref().map_or(0, |s| {
            (s.size_before_key as i64 - s.key_offset_from_base as i64).max(0) as usize
        })
    }

    /// Bytes needed from the reported base address onward
    pub fn trail_bytes(&self) -> usize {
        self.search.as_ref().map_or(1, |s| {
            (s.key_offset_from_base as i64 + s.size_from_key as i64).max(1) as usize
        })
    }

    pub fn setup(&mut self, op: ScanOp, target: &ScanTarget<'_>, errors: &mut Vec<String>) -> bool {
        if !matches!(op, ScanOp::Exact | ScanOp::Not) {
            errors.push("Only exact and not scans supported for structs".to_string());
            return false;
        }
        let ScanTarget::Struct(search) = target else {
            errors.push("Struct types require a struct search target".to_string());
            return false;
        };
        if search.total_size() > MAX_STRUCT_SIZE {
            errors.push(format!(
                "Struct size ({}) exceeds maximum allowed size ({})",
                search.total_size(),
                MAX_STRUCT_SIZE
            ));
            return false;
        }
        self.search = Some((*search).clone());
        true
    }

    pub fn validate_first_scan_op(&self, op: ScanOp, errors: &mut Vec<String>) -> bool {
        if op != ScanOp::Exact {
            errors.push("First scan for structs only supports exact scan type".to_string());
            return false;
        }
        true
    }

    fn check_match(&self, search: &StructSearch, buf: &[u8], key_off: usize, op: ScanOp) -> bool {
        match op {
            ScanOp::Exact => search.compare_at_key(buf, key_off),
            ScanOp::Not => !search.compare_at_key(buf, key_off),
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
        let Some(search) = self.search.as_ref() else {
            return;
        };
        let mut start = 0;
        while out.len() < budget {
            let Some(found) = memchr::memchr(search.key_byte, &buf[start..]) else {
                break;
            };
            let key_off = start + found;
            if key_off >= search.size_before_key
                && key_off + search.size_from_key <= buf.len()
                && self.check_match(search, buf, key_off, op)
            {
                let base = chunk_base.as_usize() as i64 + key_off as i64
                    - search.key_offset_from_base as i64;
                out.push(ScanResult::at(Address::new(base as usize)));
            }
            start = key_off + 1;
        }
    }

    pub fn fits_in_buffer(&self, offset_of_base: usize, buf_len: usize) -> bool {
        let Some(search) = self.search.as_ref() else {
            return false;
        };
        let key_off = offset_of_base as i64 + search.key_offset_from_base as i64;
        key_off >= search.size_before_key as i64
            && key_off + search.size_from_key as i64 <= buf_len as i64
    }

    pub fn validate_in_buffer(
        &self,
        buf: &[u8],
        offset_of_base: usize,
        address: Address,
        op: ScanOp,
    ) -> Option<ScanResult> {
        let search = self.search.as_ref()?;
        let key_off = offset_of_base as i64 + search.key_offset_from_base as i64;
        if key_off < search.size_before_key as i64
            || key_off + search.size_from_key as i64 > buf.len() as i64
        {
            return None;
        }
        if self.check_match(search, buf, key_off as usize, op) {
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
        let Some(search) = self.search.as_ref() else {
            return Validation::Unreadable;
        };
        let key_addr = address.as_usize() as i64 + search.key_offset_from_base as i64;
        let struct_start = key_addr - search.size_before_key as i64;
        let struct_end = key_addr + search.size_from_key as i64;
        if struct_start < region.base.as_usize() as i64
            || struct_end > region.end().as_usize() as i64
        {
            return Validation::Unreadable;
        }
        let mut bytes = vec![0u8; search.total_size()];
        if !probe.read(Address::new(struct_start as usize), &mut bytes) {
            return Validation::Unreadable;
        }
        if self.check_match(search, &bytes, search.size_before_key, op) {
            Validation::Match(ScanResult::at(address))
        } else {
            Validation::NoMatch
        }
    }
}
