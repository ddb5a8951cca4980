use ember_wasm::binary::{cursor::Cursor, leb128};
use ember_wasm::value::num;
use ember_wasm::{Trap, ValType, Value};
use proptest::prelude::*;

fn uleb(mut v: u64) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let byte = (v & 0x7F) as u8;
        v >>= 7;
        if v == 0 {
            out.push(byte);
            return out;
        }
        out.push(byte | 0x80);
    }
}

fn sleb(mut v: i64) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let byte = (v & 0x7F) as u8;
        v >>= 7;
        let done = (v == 0 && byte & 0x40 == 0) || (v == -1 && byte & 0x40 != 0);
        if done {
            out.push(byte);
            return out;
        }
        out.push(byte | 0x80);
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256, .. ProptestConfig::default()
    })]

    #[test]
    fn uleb_u32_decodes_minimal_encoding(v in any::<u32>()) {
        let bytes = uleb(u64::from(v));
        let mut c = Cursor::new(&bytes);
        prop_assert_eq!(leb128::read_uleb_u32(&mut c).unwrap(), v);
        prop_assert!(c.is_eof());
    }

    #[test]
    fn sleb_i64_decodes_minimal_encoding(v in any::<i64>()) {
        let bytes = sleb(v);
        let mut c = Cursor::new(&bytes);
        prop_assert_eq!(leb128::read_sleb_i64(&mut c).unwrap(), v);
    }

    #[test]
    fn padded_uleb_within_limit_is_accepted(v in 0u32..0x80) {
        // Same value spread over five groups.
        let bytes = [v as u8 | 0x80, 0x80, 0x80, 0x80, 0x00];
        let mut c = Cursor::new(&bytes);
        prop_assert_eq!(leb128::read_uleb_u32(&mut c).unwrap(), v);
    }

    #[test]
    fn arbitrary_bytes_never_overread(bytes in proptest::collection::vec(any::<u8>(), 0..16)) {
        let mut c = Cursor::new(&bytes);
        if leb128::read_uleb_u32(&mut c).is_ok() {
            prop_assert!(c.offset() <= 5);
        }
        let mut c = Cursor::new(&bytes);
        if leb128::read_sleb_i64(&mut c).is_ok() {
            prop_assert!(c.offset() <= 10);
        }
    }

    #[test]
    fn signed_division_traps_exactly_on_zero_or_overflow(a in any::<i32>(), b in any::<i32>()) {
        let got = num::i32_div_s(a as u32, b as u32);
        match a.checked_div(b) {
            Some(q) => prop_assert_eq!(got, Ok(q as u32)),
            None if b == 0 => prop_assert_eq!(got, Err(Trap::IntegerDivideByZero)),
            None => prop_assert_eq!(got, Err(Trap::IntegerOverflow)),
        }
    }

    #[test]
    fn signed_remainder_never_overflows(
        a in any::<i64>(),
        b in any::<i64>().prop_filter("non-zero", |b| *b != 0),
    ) {
        prop_assert_eq!(num::i64_rem_s(a as u64, b as u64), Ok(a.wrapping_rem(b) as u64));
    }

    #[test]
    fn saturating_truncation_clamps(x in any::<f64>()) {
        let got = num::trunc_sat_to_i32(x) as i32;
        if x.is_nan() {
            prop_assert_eq!(got, 0);
        } else if x <= f64::from(i32::MIN) {
            prop_assert_eq!(got, i32::MIN);
        } else if x >= f64::from(i32::MAX) {
            prop_assert_eq!(got, i32::MAX);
        } else {
            prop_assert_eq!(got, x.trunc() as i32);
        }
    }

    #[test]
    fn checked_truncation_agrees_with_saturating_when_in_range(x in -3.0e9f64..3.0e9) {
        match num::trunc_to_i32(x) {
            Ok(v) => prop_assert_eq!(v, num::trunc_sat_to_i32(x)),
            Err(trap) => {
                prop_assert_eq!(trap, Trap::IntegerOverflow);
                prop_assert!(x.trunc() < f64::from(i32::MIN) || x.trunc() > f64::from(i32::MAX));
            }
        }
    }

    #[test]
    fn float_min_max_propagate_nan(x in any::<f32>()) {
        prop_assert!(num::f32_min(x, f32::NAN).is_nan());
        prop_assert!(num::f32_max(f32::NAN, x).is_nan());
        if !x.is_nan() {
            prop_assert!(num::f32_min(x, x) == x);
        }
    }

    #[test]
    fn narrow_loads_sign_extend(byte in any::<u8>()) {
        let signed = Value::from_le_bytes(ValType::I64, &[byte], true);
        let unsigned = Value::from_le_bytes(ValType::I64, &[byte], false);
        prop_assert_eq!(signed, Value::i64(i64::from(byte as i8)));
        prop_assert_eq!(unsigned, Value::I64(u64::from(byte)));
    }

    #[test]
    fn float_bits_survive_storage(bits in any::<u32>()) {
        let v = Value::F32(bits);
        let bytes = v.to_le_bytes();
        prop_assert_eq!(Value::from_le_bytes(ValType::F32, &bytes[..4], false), v);
    }
}
