/*!
 * Memory Types
 * Errors and snapshots for memory accounting
 */

use crate::core::types::Size;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Memory operation result
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Memory errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Diagnostic)]
#[serde(tag = "error", content = "details", rename_all = "snake_case")]
pub enum MemoryError {
    #[error("memory_limit exceeded: requested {requested} bytes, limit {limit} bytes, current {current} bytes")]
    #[diagnostic(
        code(memory::limit_exceeded),
        help("The script allocated more than its memory ceiling allows.")
    )]
    LimitExceeded {
        requested: Size,
        limit: Size,
        current: Size,
    },

    #[error("out of memory: host refused {requested} bytes")]
    #[diagnostic(
        code(memory::out_of_memory),
        help("The host allocator failed. System may be low on memory.")
    )]
    OutOfMemory { requested: Size },

    #[error("invalid allocation size: {0} bytes")]
    #[diagnostic(code(memory::invalid_size))]
    InvalidSize(Size),
}

/// Point-in-time view of one ledger entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaSnapshot {
    pub limit: Size,
    pub current: Size,
    pub maximum: Size,
}

impl QuotaSnapshot {
    /// Usage as a percentage of the limit, `None` when unlimited
    pub fn usage_percent(&self) -> Option<f64> {
        (self.limit > 0).then(|| (self.current as f64 / self.limit as f64) * 100.0)
    }
}

/// Point-in-time view of the whole ledger
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub memory: QuotaSnapshot,
    pub instruction: QuotaSnapshot,
    pub output: QuotaSnapshot,
}
