//! Linear memory instance (32-bit index space).
//! Page-based growth and bounds-checked little-endian access.

use std::collections::TryReserveError;

use crate::error::Trap;
use crate::model::{MemoryType, ValType};
use crate::value::Value;

/// WASM page size in bytes (64 KiB).
pub const PAGE_SIZE: usize = 64 * 1024;

/// Largest page count a 32-bit memory can address.
pub const MAX_PAGES: u32 = 65_536;

#[derive(Debug, Clone)]
pub struct MemoryInstance {
    buf: Vec<u8>,
    max: Option<u32>,
}

impl MemoryInstance {
    /// Allocate `ty.limits.min` zeroed pages. Callers reject a minimum above
    /// `MAX_PAGES` before getting here; an allocation the host cannot satisfy
    /// is returned as an error.
    pub fn new(ty: &MemoryType) -> Result<Self, TryReserveError> {
        let len = ty.limits.min.min(MAX_PAGES) as usize * PAGE_SIZE;
        let mut buf = Vec::new();
        buf.try_reserve_exact(len)?;
        buf.resize(len, 0);
        Ok(Self {
            buf,
            max: ty.limits.max.map(|m| m.min(MAX_PAGES)),
        })
    }

    pub fn size_pages(&self) -> u32 {
        (self.buf.len() / PAGE_SIZE) as u32
    }

    /// Grow by `delta` pages. Returns the previous size, or `None` (leaving the
    /// memory untouched) if the new size exceeds the maximum or cannot be
    /// allocated.
    pub fn grow(&mut self, delta: u32) -> Option<u32> {
        let prev = self.size_pages();
        let new = u64::from(prev) + u64::from(delta);
        if new > u64::from(self.max.unwrap_or(MAX_PAGES)) {
            return None;
        }
        let new_len = new as usize * PAGE_SIZE;
        self.buf.try_reserve_exact(new_len - self.buf.len()).ok()?;
        self.buf.resize(new_len, 0);
        Some(prev)
    }

    pub fn data(&self) -> &[u8] {
        &self.buf
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    fn range(&self, addr: u64, len: u64) -> Result<std::ops::Range<usize>, Trap> {
        match addr.checked_add(len) {
            Some(end) if end <= self.buf.len() as u64 => Ok(addr as usize..end as usize),
            _ => Err(Trap::MemoryOutOfBounds { addr, len }),
        }
    }

    pub fn read(&self, addr: u64, len: usize) -> Result<&[u8], Trap> {
        let range = self.range(addr, len as u64)?;
        Ok(&self.buf[range])
    }

    pub fn write(&mut self, addr: u64, bytes: &[u8]) -> Result<(), Trap> {
        let range = self.range(addr, bytes.len() as u64)?;
        self.buf[range].copy_from_slice(bytes);
        Ok(())
    }

    pub fn read_u32(&self, addr: u64) -> Result<u32, Trap> {
        let bytes = self.read(addr, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn write_u32(&mut self, addr: u64, v: u32) -> Result<(), Trap> {
        self.write(addr, &v.to_le_bytes())
    }

    /// Load `width` bytes as a value of type `ty`, extending narrow loads.
    pub fn load(&self, addr: u64, ty: ValType, width: usize, signed: bool) -> Result<Value, Trap> {
        let bytes = self.read(addr, width)?;
        Ok(Value::from_le_bytes(ty, bytes, signed))
    }

    /// Store the low `width` bytes of `value`.
    pub fn store(&mut self, addr: u64, value: Value, width: usize) -> Result<(), Trap> {
        let bytes = value.to_le_bytes();
        self.write(addr, &bytes[..width.min(8)])
    }

    pub fn fill(&mut self, dst: u64, byte: u8, len: u64) -> Result<(), Trap> {
        let range = self.range(dst, len)?;
        self.buf[range].fill(byte);
        Ok(())
    }

    /// Overlap-safe copy inside this memory.
    pub fn copy_within(&mut self, dst: u64, src: u64, len: u64) -> Result<(), Trap> {
        let src_range = self.range(src, len)?;
        let dst_range = self.range(dst, len)?;
        self.buf.copy_within(src_range, dst_range.start);
        Ok(())
    }
}
