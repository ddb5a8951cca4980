//! Length-prefixed vectors, names and byte strings.

use super::{cursor::Cursor, leb128, BinaryReadError, Result};

/// Read a length-prefixed byte string (u32 length via ULEB128).
pub fn read_len_prefixed_bytes<'a>(cur: &mut Cursor<'a>) -> Result<&'a [u8]> {
    let len = leb128::read_uleb_u32(cur)? as usize;
    cur.read_bytes(len)
}

/// Read a UTF-8 name (length-prefixed bytes).
pub fn read_name(cur: &mut Cursor) -> Result<String> {
    let offset = cur.offset();
    let bytes = read_len_prefixed_bytes(cur)?;
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|_| BinaryReadError::InvalidUtf8 { offset })
}

/// Read a vector of T using the provided element reader.
///
/// The declared count only sizes the allocation up to the bytes actually left,
/// so a lying length prefix cannot trigger a huge up-front allocation.
pub fn read_vec<'a, T, E, F>(cur: &mut Cursor<'a>, mut elem: F) -> core::result::Result<Vec<T>, E>
where
    F: FnMut(&mut Cursor<'a>) -> core::result::Result<T, E>,
    E: From<BinaryReadError>,
{
    let len = leb128::read_uleb_u32(cur)? as usize;
    let mut out = Vec::with_capacity(len.min(cur.remaining()));
    for _ in 0..len {
        out.push(elem(cur)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_name_ok() {
        let data = [0x03, b'e', b'n', b'v'];
        let mut c = Cursor::new(&data);
        assert_eq!(read_name(&mut c).unwrap(), "env");
    }

    #[test]
    fn read_name_rejects_bad_utf8() {
        let data = [0x02, 0xC3, 0x28];
        let mut c = Cursor::new(&data);
        assert_eq!(
            read_name(&mut c).unwrap_err(),
            BinaryReadError::InvalidUtf8 { offset: 0 }
        );
    }

    #[test]
    fn read_vec_of_bytes() {
        let data = [0x02, 0xAA, 0xBB];
        let mut c = Cursor::new(&data);
        let v: Vec<u8> = read_vec(&mut c, |c| c.read_u8()).unwrap();
        assert_eq!(v, vec![0xAA, 0xBB]);
    }

    #[test]
    fn read_vec_with_lying_length_fails_cleanly() {
        let data = [0xFF, 0xFF, 0xFF, 0xFF, 0x0F, 0x01];
        let mut c = Cursor::new(&data);
        let err = read_vec::<u8, BinaryReadError, _>(&mut c, |c| c.read_u8()).unwrap_err();
        assert!(matches!(err, BinaryReadError::UnexpectedEof { .. }));
    }
}
