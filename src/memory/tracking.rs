/*!
 * Quota Ledger
 * Per-instance current/peak/limit counters for memory, instructions and output
 */

use super::types::{LedgerSnapshot, MemoryError, MemoryResult, QuotaSnapshot};
use crate::core::types::{Size, UsageStat, UsageType};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::warn;

/// One (limit, current, peak) triple
///
/// A limit of 0 means unlimited. `maximum` never decreases.
#[derive(Debug, Default)]
pub struct QuotaEntry {
    limit: Size,
    current: AtomicUsize,
    maximum: AtomicUsize,
}

impl QuotaEntry {
    pub fn new(limit: Size) -> Self {
        Self {
            limit,
            current: AtomicUsize::new(0),
            maximum: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub fn limit(&self) -> Size {
        self.limit
    }

    #[inline]
    pub fn current(&self) -> Size {
        self.current.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn maximum(&self) -> Size {
        self.maximum.load(Ordering::Relaxed)
    }

    pub fn get(&self, stat: UsageStat) -> Size {
        match stat {
            UsageStat::Limit => self.limit(),
            UsageStat::Current => self.current(),
            UsageStat::Maximum => self.maximum(),
        }
    }

    /// Compute the total that replacing a block of `old_size` with `new_size`
    /// would produce, rejecting it if it breaches the limit
    ///
    /// Nothing is committed; call [`QuotaEntry::record`] once the underlying
    /// allocation has succeeded.
    pub fn check_resize(&self, old_size: Size, new_size: Size) -> MemoryResult<Size> {
        let current = self.current();
        let total = current
            .checked_add(new_size)
            .map(|t| t.saturating_sub(old_size))
            .ok_or(MemoryError::InvalidSize(new_size))?;

        if self.limit > 0 && total > self.limit {
            warn!(
                requested = new_size,
                limit = self.limit,
                current,
                "Memory ceiling rejected allocation"
            );
            return Err(MemoryError::LimitExceeded {
                requested: new_size,
                limit: self.limit,
                current,
            });
        }
        Ok(total)
    }

    /// Set the current value and raise the peak if exceeded
    pub fn record(&self, value: Size) {
        self.current.store(value, Ordering::Relaxed);
        self.maximum.fetch_max(value, Ordering::Relaxed);
    }

    /// Return `size` bytes to the pool
    pub fn release(&self, size: Size) {
        // The closure always returns Some, so the update cannot fail
        let _ = self
            .current
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                Some(current.saturating_sub(size))
            });
    }

    /// Zero the current value; the peak is kept
    pub fn clear(&self) {
        self.current.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> QuotaSnapshot {
        QuotaSnapshot {
            limit: self.limit(),
            current: self.current(),
            maximum: self.maximum(),
        }
    }
}

/// Usage counters for one sandbox instance
///
/// Shared only between the instance and its own allocation guard.
#[derive(Debug, Default)]
pub struct QuotaLedger {
    pub memory: QuotaEntry,
    pub instruction: QuotaEntry,
    pub output: QuotaEntry,
}

impl QuotaLedger {
    pub fn new(memory_limit: Size, instruction_limit: Size, output_limit: Size) -> Self {
        Self {
            memory: QuotaEntry::new(memory_limit),
            instruction: QuotaEntry::new(instruction_limit),
            output: QuotaEntry::new(output_limit),
        }
    }

    pub fn entry(&self, kind: UsageType) -> &QuotaEntry {
        match kind {
            UsageType::Memory => &self.memory,
            UsageType::Instruction => &self.instruction,
            UsageType::Output => &self.output,
        }
    }

    pub fn usage(&self, kind: UsageType, stat: UsageStat) -> Size {
        self.entry(kind).get(stat)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            memory: self.memory.snapshot(),
            instruction: self.instruction.snapshot(),
            output: self.output.snapshot(),
        }
    }
}
