//! Byte cursor with offset tracking and little-endian primitives.
//!
//! A `Cursor` is the whole parser state: loaders thread it by `&mut` through
//! the decode call chain, and bounded payloads get their own sub-cursor.

use super::BinaryReadError;

/// Cursor over a byte slice. Offsets are absolute within the outermost buffer
/// so error messages point at the right byte even inside a sub-cursor.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0, base: 0 }
    }

    /// Absolute byte offset of the next unread byte.
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    /// Position relative to the start of this cursor's slice.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn eof(&self) -> BinaryReadError {
        BinaryReadError::UnexpectedEof { offset: self.offset() }
    }

    pub fn peek_u8(&self) -> super::Result<u8> {
        self.data.get(self.pos).copied().ok_or_else(|| self.eof())
    }

    pub fn read_u8(&mut self) -> super::Result<u8> {
        let b = self.peek_u8()?;
        self.pos += 1;
        Ok(b)
    }

    /// Read exactly n bytes and return a view into the underlying data.
    pub fn read_bytes(&mut self, n: usize) -> super::Result<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or(BinaryReadError::Malformed {
            offset: self.offset(),
            msg: "position overflow",
        })?;
        let slice = self.data.get(self.pos..end).ok_or_else(|| self.eof())?;
        self.pos = end;
        Ok(slice)
    }

    /// Read a fixed-size array (used for raw float immediates and headers).
    pub fn read_array<const N: usize>(&mut self) -> super::Result<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_u32_le(&mut self) -> super::Result<u32> {
        self.read_array::<4>().map(u32::from_le_bytes)
    }

    pub fn read_u64_le(&mut self) -> super::Result<u64> {
        self.read_array::<8>().map(u64::from_le_bytes)
    }

    /// Carve the next `n` bytes into a bounded cursor and advance past them.
    /// Nothing read through the returned cursor can escape those `n` bytes.
    pub fn sub_cursor(&mut self, n: usize) -> super::Result<Cursor<'a>> {
        let start = self.offset();
        let data = self.read_bytes(n)?;
        Ok(Cursor { data, pos: 0, base: start })
    }

    /// Everything not yet consumed, advancing to the end.
    pub fn read_rest(&mut self) -> &'a [u8] {
        let rest = &self.data[self.pos.min(self.data.len())..];
        self.pos = self.data.len();
        rest
    }
}
