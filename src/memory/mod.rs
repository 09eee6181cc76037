/*!
 * Memory Module
 * Quota accounting and allocation interception
 */

pub mod allocator;
pub mod tracking;
pub mod types;

// Re-export for convenience
pub use allocator::{engine_allocator, AllocationGuard, Block};
pub use tracking::{QuotaEntry, QuotaLedger};
pub use types::*;
