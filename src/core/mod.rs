//! Core module with shared types and crate metadata

pub mod types;

pub use types::{Address, DataType, ScanError, ScanOp, ScanResult, ScanValue};

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate authors from Cargo.toml
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");
