/*!
 * Allocation Guard
 *
 * Every allocation the engine performs on behalf of a script is routed through
 * here. The guard consults the instance's memory ledger before touching the host
 * allocator, so a rejected request never disturbs the caller's existing block.
 */

use super::tracking::QuotaLedger;
use super::types::{MemoryError, MemoryResult};
use crate::core::limits::ALLOCATION_ALIGNMENT;
use crate::core::types::Size;
use std::alloc::{self, Layout};
use std::ffi::c_void;
use std::ptr::{self, NonNull};
use std::sync::Arc;
use tracing::error;

/// Per-instance allocation guard
#[derive(Debug, Clone)]
pub struct AllocationGuard {
    ledger: Arc<QuotaLedger>,
}

impl AllocationGuard {
    pub fn new(ledger: Arc<QuotaLedger>) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &QuotaLedger {
        &self.ledger
    }

    #[inline]
    fn layout(size: Size) -> MemoryResult<Layout> {
        Layout::from_size_align(size, ALLOCATION_ALIGNMENT).map_err(|_| MemoryError::InvalidSize(size))
    }

    /// Allocate, resize or free a block
    ///
    /// - `new_size == 0` frees `ptr` and always succeeds with `Ok(None)`.
    /// - Otherwise returns the (possibly moved) block. On error `ptr` is left
    ///   valid and owned by the caller, and the ledger is unchanged.
    ///
    /// A null `ptr` is a fresh allocation; `old_size` is ignored for it.
    ///
    /// # Safety
    /// `ptr` must be null or a block previously returned by this guard (or a
    /// clone of it) whose current size is `old_size`.
    pub unsafe fn reallocate(
        &self,
        ptr: *mut u8,
        old_size: Size,
        new_size: Size,
    ) -> MemoryResult<Option<NonNull<u8>>> {
        let old_size = if ptr.is_null() { 0 } else { old_size };

        if new_size == 0 {
            if !ptr.is_null() && old_size > 0 {
                alloc::dealloc(ptr, Self::layout(old_size)?);
            }
            self.ledger.memory.release(old_size);
            return Ok(None);
        }

        let total = self.ledger.memory.check_resize(old_size, new_size)?;
        let new_layout = Self::layout(new_size)?;

        let raw = if ptr.is_null() || old_size == 0 {
            alloc::alloc(new_layout)
        } else {
            alloc::realloc(ptr, Self::layout(old_size)?, new_size)
        };

        match NonNull::new(raw) {
            Some(block) => {
                self.ledger.memory.record(total);
                Ok(Some(block))
            }
            None => {
                error!(requested = new_size, "Host allocator refused request");
                Err(MemoryError::OutOfMemory {
                    requested: new_size,
                })
            }
        }
    }

    /// Allocate an owned block that frees itself on drop
    pub fn allocate(&self, size: Size) -> MemoryResult<Block> {
        if size == 0 {
            return Err(MemoryError::InvalidSize(0));
        }
        // SAFETY: null pointer, fresh allocation
        let ptr = unsafe { self.reallocate(ptr::null_mut(), 0, size)? };
        let ptr = ptr.ok_or(MemoryError::InvalidSize(size))?;
        // SAFETY: freshly allocated block of `size` bytes
        unsafe { ptr::write_bytes(ptr.as_ptr(), 0, size) };
        Ok(Block {
            ptr,
            size,
            guard: self.clone(),
        })
    }
}

/// Allocator hook with the conventional embedded-engine signature
///
/// `ud` must point to the instance's [`AllocationGuard`]. Returns null on any
/// failure and for frees.
///
/// # Safety
/// `ud` must be a valid `*const AllocationGuard` for the duration of the call and
/// `ptr`/`osize` must satisfy the contract of [`AllocationGuard::reallocate`].
pub unsafe extern "C" fn engine_allocator(
    ud: *mut c_void,
    ptr: *mut c_void,
    osize: usize,
    nsize: usize,
) -> *mut c_void {
    let Some(guard) = (ud as *const AllocationGuard).as_ref() else {
        return ptr::null_mut();
    };
    match guard.reallocate(ptr.cast(), osize, nsize) {
        Ok(Some(block)) => block.as_ptr().cast(),
        _ => ptr::null_mut(),
    }
}

/// Owned, ledger-accounted heap block
#[derive(Debug)]
pub struct Block {
    ptr: NonNull<u8>,
    size: Size,
    guard: AllocationGuard,
}

// SAFETY: a Block exclusively owns its allocation; the guard's counters are atomic.
unsafe impl Send for Block {}

impl Block {
    #[inline]
    pub fn size(&self) -> Size {
        self.size
    }

    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: live block of `size` bytes, zero-initialized on allocation and growth
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.size) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: exclusive access to a live block of `size` bytes
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.size) }
    }

    /// Resize in place or move; on error the block is unchanged
    pub fn resize(&mut self, new_size: Size) -> MemoryResult<()> {
        if new_size == 0 {
            return Err(MemoryError::InvalidSize(0));
        }
        // SAFETY: ptr/size describe a live block from this guard
        let moved = unsafe { self.guard.reallocate(self.ptr.as_ptr(), self.size, new_size)? };
        if let Some(ptr) = moved {
            if new_size > self.size {
                // SAFETY: the tail [size, new_size) belongs to the resized block
                unsafe { ptr::write_bytes(ptr.as_ptr().add(self.size), 0, new_size - self.size) };
            }
            self.ptr = ptr;
            self.size = new_size;
        }
        Ok(())
    }
}

impl Drop for Block {
    fn drop(&mut self) {
        // SAFETY: ptr/size describe a live block from this guard; freeing cannot fail
        let _ = unsafe { self.guard.reallocate(self.ptr.as_ptr(), self.size, 0) };
    }
}
