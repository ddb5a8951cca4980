//! Arithmetic kernels with trapping, saturating and IEEE-754 edge semantics.
//!
//! Integers travel as unsigned bit patterns; the signed operators reinterpret
//! them locally. Float helpers that are pure bit manipulations (`abs`, `neg`,
//! `copysign`) take and return raw bits so NaN payloads are never touched.

use crate::error::Trap;

macro_rules! int_division {
    ($div_s:ident, $div_u:ident, $rem_s:ident, $rem_u:ident, $u:ty, $s:ty) => {
        pub fn $div_s(a: $u, b: $u) -> Result<$u, Trap> {
            let (a, b) = (a as $s, b as $s);
            if b == 0 {
                return Err(Trap::IntegerDivideByZero);
            }
            a.checked_div(b).map(|q| q as $u).ok_or(Trap::IntegerOverflow)
        }

        pub fn $div_u(a: $u, b: $u) -> Result<$u, Trap> {
            a.checked_div(b).ok_or(Trap::IntegerDivideByZero)
        }

        /// `MIN rem -1` is 0 rather than an overflow.
        pub fn $rem_s(a: $u, b: $u) -> Result<$u, Trap> {
            let (a, b) = (a as $s, b as $s);
            if b == 0 {
                return Err(Trap::IntegerDivideByZero);
            }
            Ok(a.wrapping_rem(b) as $u)
        }

        pub fn $rem_u(a: $u, b: $u) -> Result<$u, Trap> {
            a.checked_rem(b).ok_or(Trap::IntegerDivideByZero)
        }
    };
}

int_division!(i32_div_s, i32_div_u, i32_rem_s, i32_rem_u, u32, i32);
int_division!(i64_div_s, i64_div_u, i64_rem_s, i64_rem_u, u64, i64);

// Exclusive upper / inclusive lower bounds, exact in f64.
const I32_LOWER: f64 = -2_147_483_648.0;
const I32_UPPER: f64 = 2_147_483_648.0;
const U32_UPPER: f64 = 4_294_967_296.0;
const I64_LOWER: f64 = -9_223_372_036_854_775_808.0;
const I64_UPPER: f64 = 9_223_372_036_854_775_808.0;
const U64_UPPER: f64 = 18_446_744_073_709_551_616.0;

/// Truncate toward zero after rejecting NaN. `x` may come from an f32: the
/// widening is exact so one set of bounds serves both source widths.
fn checked_trunc(x: f64, lower: f64, upper: f64) -> Result<f64, Trap> {
    if x.is_nan() {
        return Err(Trap::InvalidConversionToInteger);
    }
    let t = x.trunc();
    if t < lower || t >= upper {
        return Err(Trap::IntegerOverflow);
    }
    Ok(t)
}

pub fn trunc_to_i32(x: f64) -> Result<u32, Trap> {
    checked_trunc(x, I32_LOWER, I32_UPPER).map(|t| t as i32 as u32)
}

pub fn trunc_to_u32(x: f64) -> Result<u32, Trap> {
    // -0.9 truncates to -0.0, which compares equal to the 0.0 bound.
    checked_trunc(x, 0.0, U32_UPPER).map(|t| t as u32)
}

pub fn trunc_to_i64(x: f64) -> Result<u64, Trap> {
    checked_trunc(x, I64_LOWER, I64_UPPER).map(|t| t as i64 as u64)
}

pub fn trunc_to_u64(x: f64) -> Result<u64, Trap> {
    checked_trunc(x, 0.0, U64_UPPER).map(|t| t as u64)
}

// `as` casts from float to int saturate and send NaN to zero.

pub fn trunc_sat_to_i32(x: f64) -> u32 {
    x as i32 as u32
}

pub fn trunc_sat_to_u32(x: f64) -> u32 {
    x as u32
}

pub fn trunc_sat_to_i64(x: f64) -> u64 {
    x as i64 as u64
}

pub fn trunc_sat_to_u64(x: f64) -> u64 {
    x as u64
}

macro_rules! float_kernels {
    ($min:ident, $max:ident, $nearest:ident, $abs:ident, $neg:ident, $copysign:ident,
     $f:ty, $bits:ty, $sign:expr) => {
        /// NaN-propagating minimum; `-0` is below `+0`.
        pub fn $min(a: $f, b: $f) -> $f {
            if a.is_nan() || b.is_nan() {
                return <$f>::NAN;
            }
            if a == 0.0 && b == 0.0 {
                return <$f>::from_bits(a.to_bits() | b.to_bits());
            }
            a.min(b)
        }

        /// NaN-propagating maximum; `+0` is above `-0`.
        pub fn $max(a: $f, b: $f) -> $f {
            if a.is_nan() || b.is_nan() {
                return <$f>::NAN;
            }
            if a == 0.0 && b == 0.0 {
                return <$f>::from_bits(a.to_bits() & b.to_bits());
            }
            a.max(b)
        }

        pub fn $nearest(a: $f) -> $f {
            a.round_ties_even()
        }

        pub fn $abs(bits: $bits) -> $bits {
            bits & !$sign
        }

        pub fn $neg(bits: $bits) -> $bits {
            bits ^ $sign
        }

        pub fn $copysign(magnitude: $bits, sign: $bits) -> $bits {
            (magnitude & !$sign) | (sign & $sign)
        }
    };
}

float_kernels!(f32_min, f32_max, f32_nearest, f32_abs, f32_neg, f32_copysign, f32, u32, 1u32 << 31);
float_kernels!(f64_min, f64_max, f64_nearest, f64_abs, f64_neg, f64_copysign, f64, u64, 1u64 << 63);

pub fn i32_extend8_s(x: u32) -> u32 {
    x as i8 as i32 as u32
}

pub fn i32_extend16_s(x: u32) -> u32 {
    x as i16 as i32 as u32
}

pub fn i64_extend8_s(x: u64) -> u64 {
    x as i8 as i64 as u64
}

pub fn i64_extend16_s(x: u64) -> u64 {
    x as i16 as i64 as u64
}

pub fn i64_extend32_s(x: u64) -> u64 {
    x as i32 as i64 as u64
}
