//! ULEB128/SLEB128 decoding for the integer widths used by the binary format.
//!
//! A value of N bits may use at most ceil(N/7) groups (5 for 32-bit, 10 for
//! 64-bit). In the last permitted group the bits that fall outside the target
//! width must be zero (unsigned) or a copy of the sign bit (signed).

use super::{cursor::Cursor, BinaryReadError, Result};

/// Decode an unsigned LEB128 as u32 (max 5 bytes).
pub fn read_uleb_u32(cur: &mut Cursor) -> Result<u32> {
    read_uleb_generic(cur, 32).map(|v| v as u32)
}

/// Decode an unsigned LEB128 as u64 (max 10 bytes).
pub fn read_uleb_u64(cur: &mut Cursor) -> Result<u64> {
    read_uleb_generic(cur, 64)
}

/// Decode a signed LEB128 as i32 (max 5 bytes).
pub fn read_sleb_i32(cur: &mut Cursor) -> Result<i32> {
    read_sleb_generic(cur, 32).map(|v| v as i32)
}

/// Decode a signed LEB128 as i64 (max 10 bytes).
pub fn read_sleb_i64(cur: &mut Cursor) -> Result<i64> {
    read_sleb_generic(cur, 64)
}

/// Decode the 33-bit signed integer used by block types.
pub fn read_sleb_s33(cur: &mut Cursor) -> Result<i64> {
    read_sleb_generic(cur, 33)
}

fn read_uleb_generic(cur: &mut Cursor, bits: u32) -> Result<u64> {
    let max_bytes = (bits + 6) / 7;
    let mut result: u64 = 0;

    for i in 0..max_bytes {
        let byte = cur.read_u8()?;
        let shift = i * 7;
        let low = u64::from(byte & 0x7F);

        if i + 1 == max_bytes {
            if byte & 0x80 != 0 {
                return Err(BinaryReadError::Leb128TooManyBytes {
                    limit: max_bytes,
                    offset: cur.offset(),
                });
            }
            let room = bits - shift;
            if low >> room != 0 {
                return Err(BinaryReadError::Leb128Overflow {
                    target_bits: bits,
                    offset: cur.offset(),
                });
            }
        }

        result |= low << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
    }

    Err(BinaryReadError::Leb128TooManyBytes {
        limit: max_bytes,
        offset: cur.offset(),
    })
}

fn read_sleb_generic(cur: &mut Cursor, bits: u32) -> Result<i64> {
    let max_bytes = (bits + 6) / 7;
    let mut result: i64 = 0;

    for i in 0..max_bytes {
        let byte = cur.read_u8()?;
        let shift = i * 7;
        let last = byte & 0x80 == 0;

        if i + 1 == max_bytes {
            if !last {
                return Err(BinaryReadError::Leb128TooManyBytes {
                    limit: max_bytes,
                    offset: cur.offset(),
                });
            }
            // Bits from the target sign bit up to bit 6 must be all equal.
            let room = bits - shift;
            let sign_and_pad = (byte & 0x7F) >> (room - 1);
            let all_ones = 0x7F >> (room - 1);
            if sign_and_pad != 0 && sign_and_pad != all_ones {
                return Err(BinaryReadError::Leb128Overflow {
                    target_bits: bits,
                    offset: cur.offset(),
                });
            }
        }

        result |= i64::from(byte & 0x7F) << shift;
        if last {
            let consumed = shift + 7;
            if consumed < 64 && byte & 0x40 != 0 {
                result |= -1i64 << consumed;
            }
            return Ok(result);
        }
    }

    Err(BinaryReadError::Leb128TooManyBytes {
        limit: max_bytes,
        offset: cur.offset(),
    })
}
