//! Custom error types for the scanning engine

use super::Address;
use thiserror::Error;

/// Error taxonomy for scanner operations.
///
/// Scan methods never return these directly; they render them into the
/// scanner's append-only error log and make the failing operation a no-op.
/// The embedding-surface constructors and the results pager do return them.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid configuration: {0}")]
    BadConfig(String),

    #[error("Unsupported scan operator: {0}")]
    BadOp(String),

    #[error("Target size ({size}) exceeds maximum allowed size ({max})")]
    OversizeTarget { size: usize, max: usize },

    #[error("Scan target missing: {0}")]
    SetupMissing(String),

    #[error("Maximum results ({0}) reached, stopping scan early")]
    Saturated(usize),

    #[error("Memory unreadable at {address}")]
    TransientFault { address: Address },

    #[error("Internal invariant violated: {0}")]
    InternalInvariant(String),

    #[error("Invalid data type: {0} (valid: byte, int, float, double, bool, string, byte_array, struct)")]
    UnknownDataType(String),

    #[error("Invalid scan type: {0} (valid: exact, not, increased, decreased, changed, unchanged)")]
    UnknownScanOp(String),
}

impl ScanError {
    /// Creates a bad-configuration error
    pub fn bad_config(reason: impl Into<String>) -> Self {
        ScanError::BadConfig(reason.into())
    }

    /// Creates an unsupported-operator error
    pub fn bad_op(reason: impl Into<String>) -> Self {
        ScanError::BadOp(reason.into())
    }

    /// Creates a missing-target error
    pub fn setup_missing(reason: impl Into<String>) -> Self {
        ScanError::SetupMissing(reason.into())
    }
}
