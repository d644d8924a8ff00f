//! In-process memory-scanning engine
//!
//! Locates addresses in the host's own virtual address space whose
//! contents match a pattern, then progressively filters that candidate set
//! as the host's state evolves: find every `int` holding 73, wait for the
//! value on screen to drop to 72, keep only candidates that decreased,
//! repeat until one address remains.
//!
//! The crate is built around a few pieces:
//! - [`probe`]: classifies virtual pages and performs fault-guarded reads
//! - [`arena`]: private heap keeping scanner state out of its own scans
//! - [`scanner`]: the first-scan / rescan engine with scalar, sequence and
//!   keyed-struct comparators and an AVX2 fast path
//! - [`api`]: the typed surface the host's scripting layer marshals through
//!
//! ```no_run
//! use memscan::{api, ScannerConfig, ScanOp, ScanTarget, ScanValue};
//!
//! let mut scanner = api::scanner_new("int", ScannerConfig::default())?;
//! scanner.first_scan(ScanOp::Exact, ScanTarget::Scalar(ScanValue::from_int(73)));
//! // ... the host's state changes ...
//! scanner.rescan(ScanOp::Decreased, ScanTarget::None);
//! # Ok::<(), memscan::ScanError>(())
//! ```

pub mod api;
pub mod arena;
pub mod core;
pub mod probe;
pub mod scanner;

pub use crate::core::types::{Address, DataType, ScanError, ScanOp, ScanResult, ScanValue};
pub use api::{FieldValue, ResultEntry, ResultValue, ResultsPage, ResultsQuery};
pub use probe::{MemoryProbe, Region, SyntheticProbe};
pub use scanner::{
    max_scan_threads, set_scan_threads, RescanSummary, ScanSummary, ScanTarget, Scanner,
    ScannerConfig, StructSearch,
};

#[cfg(any(windows, target_os = "linux"))]
pub use probe::OsProbe;
