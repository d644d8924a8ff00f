//! Scan result record

use super::{Address, ScanValue};

/// A single candidate surviving the most recent scan.
///
/// Only scalar scanners populate the value cells; sequence and struct
/// scanners store the address alone. `old_value` is carried from the
/// previous scan so ordering operators can compare against it.
#[derive(Debug, Clone, Copy)]
pub struct ScanResult {
    pub address: Address,
    pub value: ScanValue,
    pub old_value: ScanValue,
    pub has_old: bool,
}

impl ScanResult {
    /// Address-only record, value cells zeroed
    pub fn at(address: Address) -> Self {
        ScanResult {
            address,
            value: ScanValue::zero(),
            old_value: ScanValue::zero(),
            has_old: false,
        }
    }

    /// Record with a freshly read value and no history
    pub fn with_value(address: Address, value: ScanValue) -> Self {
        ScanResult {
            address,
            value,
            old_value: ScanValue::zero(),
            has_old: false,
        }
    }
}
