//! Scanner subsystem: first-scan / rescan engine with type-specialized
//! comparators, a SIMD fast path, a parallel region walker and batched
//! rescans
//!
//! A scanner is created for one data type and progressively narrows a
//! candidate set: `first_scan` sweeps every readable region of the host's
//! address space, `rescan` re-reads the surviving candidates, `reset`
//! returns to the pre-first-scan state. Scan methods never fail outright;
//! problems are rendered into an error log the embedding surface exposes.

pub mod comparator;
pub(crate) mod first_scan;
pub(crate) mod rescan;
pub(crate) mod simd;
pub(crate) mod store;
pub mod walker;

pub use comparator::{ScanTarget, StructSearch};
pub use walker::{max_scan_threads, set_scan_threads};

use crate::core::types::{DataType, ScanOp, ScanResult};
use crate::probe::MemoryProbe;
use comparator::Comparator;
use serde::Serialize;
use std::time::Instant;
use store::ResultStore;

/// Chunk buffer for first scans; 64 KiB keeps the working set in cache
pub const SCAN_BUFFER_SIZE: usize = 65536;

/// Rescan batching threshold: results within one 4 KiB span share a read
pub const CHUNK_THRESHOLD: usize = 4096;

/// Cap on string/byte-array search targets
pub const MAX_SEQUENCE_SIZE: usize = 4096;

/// Cap on struct search targets
pub const MAX_STRUCT_SIZE: usize = 8192;

/// Absolute epsilon for float comparisons
pub const FLOAT_EPSILON: f32 = 0.0001;

/// Absolute epsilon for double comparisons
pub const DOUBLE_EPSILON: f64 = 0.00000001;

// The chunk-overlap logic requires a whole target to fit in one buffer
const _: () = assert!(SCAN_BUFFER_SIZE > MAX_SEQUENCE_SIZE);
const _: () = assert!(SCAN_BUFFER_SIZE > MAX_STRUCT_SIZE);

/// Scanner construction options
#[derive(Debug, Clone, Copy)]
pub struct ScannerConfig {
    /// Result cap; 0 is clamped to 1 with a logged error
    pub max_results: usize,
    /// Candidate step in bytes; 0 means the data type's natural width
    pub alignment: usize,
    /// Record elapsed milliseconds per scan in the error log
    pub check_timing: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        ScannerConfig {
            max_results: 100_000,
            alignment: 0,
            check_timing: false,
        }
    }
}

/// What `first_scan` reports back
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ScanSummary {
    pub result_count: usize,
    pub max_results_reached: bool,
}

/// What `rescan` reports back
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RescanSummary {
    pub result_count: usize,
}

/// The scanner facade: owns configuration, comparator, result store and
/// the error log for one progressive scan session
pub struct Scanner<P: MemoryProbe> {
    probe: P,
    data_type: DataType,
    max_results: usize,
    alignment: usize,
    check_timing: bool,
    comparator: Comparator,
    store: ResultStore,
    first_scan_done: bool,
    max_results_reached: bool,
    last_op: ScanOp,
    errors: Vec<String>,
    invalid_address_count: usize,
}

#[cfg(any(windows, target_os = "linux"))]
impl Scanner<crate::probe::OsProbe> {
    /// Scanner over the current process's address space
    pub fn new(data_type: DataType, config: ScannerConfig) -> Self {
        Self::with_probe(crate::probe::OsProbe::new(), data_type, config)
    }
}

impl<P: MemoryProbe + Sync> Scanner<P> {
    /// Scanner over an explicit probe; tests feed a synthetic address map
    pub fn with_probe(probe: P, data_type: DataType, config: ScannerConfig) -> Self {
        let mut errors = Vec::new();
        let mut max_results = config.max_results;
        if max_results == 0 {
            errors.push("maxResults cannot be 0, defaulting to 1".to_string());
            max_results = 1;
        }
        let alignment = if config.alignment == 0 {
            data_type.default_alignment()
        } else {
            config.alignment
        };

        Scanner {
            probe,
            data_type,
            max_results,
            alignment,
            check_timing: config.check_timing,
            comparator: Comparator::for_data_type(data_type, alignment),
            store: ResultStore::with_capacity(max_results.min(10_000)),
            first_scan_done: false,
            max_results_reached: false,
            last_op: ScanOp::Exact,
            errors,
            invalid_address_count: 0,
        }
    }

    /// Full-address-space scan seeding the result store.
    ///
    /// Precondition: no completed first scan. Scalar scanners accept
    /// `Exact` and `Not`; sequence and struct scanners accept `Exact`.
    pub fn first_scan(&mut self, op: ScanOp, target: ScanTarget<'_>) -> ScanSummary {
        let started = self.check_timing.then(Instant::now);

        if self.first_scan_done {
            self.errors.push(
                "First scan already performed - use reset() first or create new scanner"
                    .to_string(),
            );
            return self.summary();
        }
        if op.requires_previous() {
            self.errors.push(
                "First scan cannot use increased/decreased/changed/unchanged - these require a \
                 previous scan. Use exact or not for first scan."
                    .to_string(),
            );
            return self.summary();
        }

        self.store.clear();
        self.max_results_reached = false;
        self.errors.clear();
        self.invalid_address_count = 0;
        self.last_op = op;

        if !self.comparator.setup(op, &target, &mut self.errors) {
            return self.summary();
        }
        if !self.comparator.validate_first_scan_op(op, &mut self.errors) {
            return self.summary();
        }

        let saturated = first_scan::run(
            &self.probe,
            &self.comparator,
            op,
            self.max_results,
            &mut self.store,
            &mut self.errors,
        );
        if saturated {
            self.max_results_reached = true;
            self.errors.push(format!(
                "Maximum results ({}) reached, stopping scan early",
                self.max_results
            ));
            tracing::warn!(max_results = self.max_results, "first scan saturated");
        }

        self.first_scan_done = true;
        self.report_invalid_stats();

        if let Some(t) = started {
            self.errors.push(format!(
                "firstScan timing: {} ms ({} results found)",
                t.elapsed().as_millis(),
                self.store.len()
            ));
        }
        tracing::debug!(results = self.store.len(), "first scan complete");
        self.summary()
    }

    /// Filters the existing result store by re-reading each candidate.
    ///
    /// Precondition: a completed first scan with surviving results.
    pub fn rescan(&mut self, op: ScanOp, target: ScanTarget<'_>) -> RescanSummary {
        let started = self.check_timing.then(Instant::now);

        if !self.first_scan_done {
            self.errors
                .push("Must perform first scan before rescanning".to_string());
            return RescanSummary {
                result_count: self.store.len(),
            };
        }
        if self.store.is_empty() {
            self.errors
                .push("No previous results to rescan".to_string());
            return RescanSummary { result_count: 0 };
        }

        self.errors.clear();
        self.invalid_address_count = 0;
        self.last_op = op;

        if !self.comparator.setup(op, &target, &mut self.errors) {
            return RescanSummary {
                result_count: self.store.len(),
            };
        }

        rescan::run(
            &self.probe,
            &self.comparator,
            op,
            &mut self.store,
            &mut self.invalid_address_count,
        );

        self.report_invalid_stats();
        if let Some(t) = started {
            self.errors.push(format!(
                "rescan timing: {} ms ({} results remaining)",
                t.elapsed().as_millis(),
                self.store.len()
            ));
        }
        tracing::debug!(results = self.store.len(), "rescan complete");
        RescanSummary {
            result_count: self.store.len(),
        }
    }

    /// Returns to the pre-first-scan state with the same configuration
    pub fn reset(&mut self) {
        self.store.clear();
        self.first_scan_done = false;
        self.max_results_reached = false;
        self.invalid_address_count = 0;
        self.errors.clear();
        self.comparator.reset();
    }

    pub fn results(&self) -> &[ScanResult] {
        self.store.as_slice()
    }

    /// Window of results for paging
    pub fn results_range(&self, offset: usize, limit: usize) -> &[ScanResult] {
        self.store.page(offset, limit)
    }

    pub fn result_count(&self) -> usize {
        self.store.len()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn invalid_address_count(&self) -> usize {
        self.invalid_address_count
    }

    pub fn max_results_reached(&self) -> bool {
        self.max_results_reached
    }

    pub fn first_scan_done(&self) -> bool {
        self.first_scan_done
    }

    pub fn last_scan_op(&self) -> ScanOp {
        self.last_op
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn alignment(&self) -> usize {
        self.alignment
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    pub fn set_check_timing(&mut self, enabled: bool) {
        self.check_timing = enabled;
    }

    /// The stored search sequence, for sequence scanners
    pub fn search_sequence(&self) -> Option<&[u8]> {
        self.comparator.search_sequence()
    }

    /// Fault-guarded readback of the bytes at a sequence result
    pub fn read_sequence_bytes(&self, address: crate::core::types::Address) -> Option<Vec<u8>> {
        self.comparator.read_sequence_bytes(&self.probe, address)
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// Mutable probe access; used by tests to mutate synthetic memory
    /// between scans
    pub fn probe_mut(&mut self) -> &mut P {
        &mut self.probe
    }

    fn summary(&self) -> ScanSummary {
        ScanSummary {
            result_count: self.store.len(),
            max_results_reached: self.max_results_reached,
        }
    }

    fn report_invalid_stats(&mut self) {
        if self.invalid_address_count > 0 {
            if self.store.is_empty() {
                self.errors.push(format!(
                    "All {} addresses became invalid (memory may have been freed)",
                    self.invalid_address_count
                ));
            } else {
                self.errors.push(format!(
                    "{} addresses became invalid",
                    self.invalid_address_count
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ScanValue;
    use crate::probe::SyntheticProbe;

    fn int_scanner(probe: SyntheticProbe, max_results: usize) -> Scanner<SyntheticProbe> {
        Scanner::with_probe(
            probe,
            DataType::Int,
            ScannerConfig {
                max_results,
                alignment: 1,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_zero_max_results_clamped() {
        let scanner = Scanner::with_probe(
            SyntheticProbe::new(),
            DataType::Int,
            ScannerConfig {
                max_results: 0,
                ..Default::default()
            },
        );
        assert_eq!(scanner.max_results(), 1);
        assert!(scanner.errors()[0].contains("cannot be 0"));
    }

    #[test]
    fn test_alignment_defaults_to_type_width() {
        let scanner = Scanner::with_probe(
            SyntheticProbe::new(),
            DataType::Double,
            ScannerConfig::default(),
        );
        assert_eq!(scanner.alignment(), 8);

        let scanner = Scanner::with_probe(
            SyntheticProbe::new(),
            DataType::String,
            ScannerConfig::default(),
        );
        assert_eq!(scanner.alignment(), 1);
    }

    #[test]
    fn test_first_scan_rejects_history_ops() {
        let mut probe = SyntheticProbe::new();
        probe.add_region(vec![0u8; 16]);
        let mut scanner = int_scanner(probe, 100);
        let summary = scanner.first_scan(ScanOp::Increased, ScanTarget::None);
        assert_eq!(summary.result_count, 0);
        assert!(!scanner.first_scan_done());
        assert!(scanner.errors()[0].contains("require a previous scan"));
    }

    #[test]
    fn test_rescan_before_first_scan_rejected() {
        let mut scanner = int_scanner(SyntheticProbe::new(), 100);
        scanner.rescan(ScanOp::Exact, ScanTarget::Scalar(ScanValue::from_int(1)));
        assert!(scanner.errors()[0].contains("Must perform first scan"));
    }

    #[test]
    fn test_double_first_scan_rejected() {
        let mut probe = SyntheticProbe::new();
        let mut data = vec![0u8; 16];
        data[0..4].copy_from_slice(&7i32.to_le_bytes());
        probe.add_region(data);

        let mut scanner = int_scanner(probe, 100);
        scanner.first_scan(ScanOp::Exact, ScanTarget::Scalar(ScanValue::from_int(7)));
        assert!(scanner.first_scan_done());
        assert_eq!(scanner.result_count(), 1);

        scanner.first_scan(ScanOp::Exact, ScanTarget::Scalar(ScanValue::from_int(7)));
        assert!(scanner.errors()[0].contains("already performed"));
        // Prior results preserved
        assert_eq!(scanner.result_count(), 1);
    }

    #[test]
    fn test_reset_restores_fresh_state() {
        let mut probe = SyntheticProbe::new();
        let mut data = vec![0u8; 16];
        data[0..4].copy_from_slice(&7i32.to_le_bytes());
        probe.add_region(data);

        let mut scanner = int_scanner(probe, 100);
        scanner.first_scan(ScanOp::Exact, ScanTarget::Scalar(ScanValue::from_int(7)));
        scanner.reset();
        assert!(!scanner.first_scan_done());
        assert_eq!(scanner.result_count(), 0);
        assert!(!scanner.has_errors());

        // An identical scan after reset finds the identical result set
        let summary = scanner.first_scan(ScanOp::Exact, ScanTarget::Scalar(ScanValue::from_int(7)));
        assert_eq!(summary.result_count, 1);
    }

    #[test]
    fn test_timing_entries_logged() {
        let mut probe = SyntheticProbe::new();
        probe.add_region(vec![0u8; 16]);
        let mut scanner = Scanner::with_probe(
            probe,
            DataType::Int,
            ScannerConfig {
                max_results: 10,
                alignment: 1,
                check_timing: true,
            },
        );
        scanner.first_scan(ScanOp::Exact, ScanTarget::Scalar(ScanValue::from_int(0)));
        assert!(scanner
            .errors()
            .iter()
            .any(|e| e.starts_with("firstScan timing:")));
    }

    #[test]
    fn test_missing_target_is_noop() {
        let mut probe = SyntheticProbe::new();
        probe.add_region(vec![0u8; 16]);
        let mut scanner = int_scanner(probe, 100);
        let summary = scanner.first_scan(ScanOp::Exact, ScanTarget::None);
        assert_eq!(summary.result_count, 0);
        assert!(!scanner.first_scan_done());
        assert!(scanner.has_errors());
    }
}
