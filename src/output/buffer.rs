/*!
 * Output Buffer
 *
 * Growable byte buffer a script writes into. `data[pos]` always holds a zero
 * terminator, so `size - pos` bytes are writable including it.
 */

use super::types::{OutputError, OutputResult};
use crate::core::types::Size;
use std::fmt;
use tracing::{trace, warn};

#[derive(Debug)]
pub struct OutputBuffer {
    data: Box<[u8]>,
    pos: Size,
    maxsize: Size,
}

impl OutputBuffer {
    /// Create a buffer of `initial_size` bytes (clamped to `maxsize` when
    /// bounded); `maxsize == 0` means unbounded
    pub fn new(initial_size: Size, maxsize: Size) -> OutputResult<Self> {
        let mut size = initial_size.max(1);
        if maxsize > 0 {
            size = size.min(maxsize);
        }
        Ok(Self {
            data: Self::allocate(size, &[])?,
            pos: 0,
            maxsize,
        })
    }

    /// Fallibly allocate `size` zeroed bytes seeded with `prefix`
    fn allocate(size: Size, prefix: &[u8]) -> OutputResult<Box<[u8]>> {
        let mut data = Vec::new();
        data.try_reserve_exact(size)
            .map_err(|_| OutputError::OutOfMemory { requested: size })?;
        data.extend_from_slice(prefix);
        data.resize(size, 0);
        Ok(data.into_boxed_slice())
    }

    /// Bytes written so far
    #[inline]
    pub fn pos(&self) -> Size {
        self.pos
    }

    /// Allocated capacity
    #[inline]
    pub fn size(&self) -> Size {
        self.data.len()
    }

    #[inline]
    pub fn max_size(&self) -> Size {
        self.maxsize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pos == 0
    }

    /// Make room for `needed` more bytes, terminator included
    ///
    /// On any error the buffer is unchanged.
    fn reserve(&mut self, needed: Size) -> OutputResult<()> {
        let size = self.size();
        if size - self.pos >= needed {
            return Ok(());
        }

        let required = self.pos.saturating_add(needed);
        if self.maxsize > 0 && required > self.maxsize {
            warn!(required, limit = self.maxsize, "Output ceiling reached");
            return Err(OutputError::LimitExceeded {
                needed: required,
                limit: self.maxsize,
            });
        }

        let overflow = OutputError::OutOfMemory { requested: required };
        let mut new_size = size.checked_mul(2).ok_or_else(|| overflow.clone())?;
        while new_size - self.pos < needed {
            new_size = new_size.checked_mul(2).ok_or_else(|| overflow.clone())?;
        }
        if self.maxsize > 0 && new_size > self.maxsize {
            new_size = self.maxsize;
        }

        trace!(from = size, to = new_size, "Growing output buffer");
        self.data = Self::allocate(new_size, &self.data[..self.pos])?;
        Ok(())
    }

    /// Append raw bytes
    pub fn append_bytes(&mut self, bytes: &[u8]) -> OutputResult<()> {
        self.reserve(bytes.len().saturating_add(1))?;
        let end = self.pos + bytes.len();
        self.data[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
        self.data[self.pos] = 0;
        Ok(())
    }

    #[inline]
    pub fn append_str(&mut self, text: &str) -> OutputResult<()> {
        self.append_bytes(text.as_bytes())
    }

    pub fn append_char(&mut self, byte: u8) -> OutputResult<()> {
        self.append_bytes(&[byte])
    }

    /// Append formatted text, e.g. `buffer.append_fmt(format_args!("{}:{}", a, b))`
    pub fn append_fmt(&mut self, args: fmt::Arguments<'_>) -> OutputResult<()> {
        match args.as_str() {
            Some(text) => self.append_str(text),
            None => self.append_str(&fmt::format(args)),
        }
    }

    /// Written bytes, terminator excluded
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.pos]
    }

    /// Written bytes followed by the zero terminator
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.data[..=self.pos]
    }

    /// Discard everything written after `pos`
    pub fn truncate(&mut self, pos: Size) {
        if pos < self.pos {
            self.pos = pos;
            self.data[pos] = 0;
        }
    }

    /// Rewind to empty, keeping the allocation
    pub fn reset(&mut self) {
        self.truncate(0);
    }

    /// Copy out the written bytes and rewind
    pub fn take(&mut self) -> Vec<u8> {
        let out = self.as_bytes().to_vec();
        self.reset();
        out
    }
}
