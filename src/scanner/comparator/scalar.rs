//! Scalar comparator: fixed-width integer, float and bool predicates

use crate::core::types::{Address, DataType, ScanOp, ScanResult, ScanValue};
use crate::probe::{MemoryProbe, Region};
use crate::scanner::comparator::{ScanTarget, Validation};
use crate::scanner::{simd, DOUBLE_EPSILON, FLOAT_EPSILON};

/// Equality with absolute epsilon for the float types
pub(crate) fn values_equal(data_type: DataType, a: ScanValue, b: ScanValue) -> bool {
    match data_type {
        DataType::Byte => a.as_byte() == b.as_byte(),
        DataType::Int => a.as_int() == b.as_int(),
        DataType::Float => (a.as_float() - b.as_float()).abs() < FLOAT_EPSILON,
        DataType::Double => (a.as_double() - b.as_double()).abs() < DOUBLE_EPSILON,
        DataType::Bool => a.as_bool() == b.as_bool(),
        _ => false,
    }
}

/// Strict ordering with the epsilon on the comparison side; true > false
pub(crate) fn value_greater(data_type: DataType, a: ScanValue, b: ScanValue) -> bool {
    match data_type {
        DataType::Byte => a.as_byte() > b.as_byte(),
        DataType::Int => a.as_int() > b.as_int(),
        DataType::Float => a.as_float() > b.as_float() + FLOAT_EPSILON,
        DataType::Double => a.as_double() > b.as_double() + DOUBLE_EPSILON,
        DataType::Bool => a.as_bool() && !b.as_bool(),
        _ => false,
    }
}

pub(crate) fn value_less(data_type: DataType, a: ScanValue, b: ScanValue) -> bool {
    match data_type {
        DataType::Byte => a.as_byte() < b.as_byte(),
        DataType::Int => a.as_int() < b.as_int(),
        DataType::Float => a.as_float() < b.as_float() - FLOAT_EPSILON,
        DataType::Double => a.as_double() < b.as_double() - DOUBLE_EPSILON,
        DataType::Bool => !a.as_bool() && b.as_bool(),
        _ => false,
    }
}

/// The six-operator predicate over a freshly read value. `old` is the value
/// recorded by the previous scan; operators that need it and don't have it
/// never match.
pub(crate) fn check_match(
    data_type: DataType,
    op: ScanOp,
    current: ScanValue,
    target: ScanValue,
    old: Option<ScanValue>,
) -> bool {
    match op {
        ScanOp::Exact => values_equal(data_type, current, target),
        ScanOp::Not => !values_equal(data_type, current, target),
        ScanOp::Increased => old.is_some_and(|o| value_greater(data_type, current, o)),
        ScanOp::Decreased => old.is_some_and(|o| value_less(data_type, current, o)),
        ScanOp::Changed => old.is_some_and(|o| !values_equal(data_type, current, o)),
        ScanOp::Unchanged => old.is_some_and(|o| values_equal(data_type, current, o)),
    }
}

/// Comparator for the fixed-width scalar family
#[derive(Debug)]
pub(crate) struct ScalarComparator {
    data_type: DataType,
    alignment: usize,
    target: ScanValue,
}

impl ScalarComparator {
    pub fn new(data_type: DataType, alignment: usize) -> Self {
        debug_assert!(data_type.is_scalar());
        ScalarComparator {
            data_type,
            alignment: alignment.max(1),
            target: ScanValue::zero(),
        }
    }

    pub fn width(&self) -> usize {
        self.data_type.scalar_size().unwrap_or(1)
    }

    pub fn reset(&mut self) {
        self.target = ScanValue::zero();
    }

    pub fn setup(&mut self, op: ScanOp, target: &ScanTarget<'_>, errors: &mut Vec<String>) -> bool {
        match target {
            ScanTarget::Scalar(v) => {
                self.target = *v;
                true
            }
            // Ordering operators compare against the stored old value and
            // may omit the target entirely
            ScanTarget::None if op.requires_previous() => {
                self.target = ScanValue::zero();
                true
            }
            _ => {
                errors.push(format!(
                    "Target value must be a {} scalar",
                    self.data_type
                ));
                false
            }
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
        let width = self.width();

        // The 256-bit path handles Exact/Not when every lane falls on an
        // aligned address; other alignments would skip sub-lane offsets
        if matches!(op, ScanOp::Exact | ScanOp::Not)
            && self.alignment == width
            && simd::supported()
        {
            simd::scan_chunk(
                buf,
                chunk_base,
                self.data_type,
                op,
                self.target,
                self.alignment,
                out,
                budget,
            );
            return;
        }

        // Aligned stepping through the buffer
        let first_aligned = chunk_base.align_up(self.alignment);
        let mut offset = first_aligned.as_usize() - chunk_base.as_usize();
        while offset + width <= buf.len() && out.len() < budget {
            let address = chunk_base.add(offset);
            if let Some(result) = self.validate_in_buffer(buf, offset, address, op, None) {
                out.push(result);
            }
            offset += self.alignment;
        }
    }

    pub fn fits_in_buffer(&self, offset: usize, buf_len: usize) -> bool {
        offset + self.width() <= buf_len
    }

    pub fn validate_in_buffer(
        &self,
        buf: &[u8],
        offset: usize,
        address: Address,
        op: ScanOp,
        old: Option<ScanValue>,
    ) -> Option<ScanResult> {
        let bytes = buf.get(offset..offset + self.width())?;
        let value = ScanValue::from_le_bytes(self.data_type, bytes)?;
        if !check_match(self.data_type, op, value, self.target, old) {
            return None;
        }
        Some(ScanResult {
            address,
            value,
            old_value: old.unwrap_or_default(),
            has_old: old.is_some(),
        })
    }

    pub fn validate_direct<P: MemoryProbe>(
        &self,
        probe: &P,
        address: Address,
        region: &Region,
        op: ScanOp,
        old: Option<ScanValue>,
    ) -> Validation {
        let width = self.width();
        if address.add(width) > region.end() {
            return Validation::Unreadable;
        }
        let mut bytes = [0u8; 8];
        if !probe.read(address, &mut bytes[..width]) {
            return Validation::Unreadable;
        }
        let Some(value) = ScanValue::from_le_bytes(self.data_type, &bytes[..width]) else {
            return Validation::Unreadable;
        };
        if check_match(self.data_type, op, value, self.target, old) {
            Validation::Match(ScanResult {
                address,
                value,
                old_value: old.unwrap_or_default(),
                has_old: old.is_some(),
            })
        } else {
            Validation::NoMatch
        }
    }
}
