//! Stack-level execution of the numeric, comparison and conversion
//! instructions. Kernels with non-trivial edge semantics live in
//! `value::num`; this module only moves operands on and off the stack.

use super::instructions::Opcode;
use super::stack::ValueStack;
use crate::error::{EvalError, RuntimeError, Trap};
use crate::value::num;
use crate::value::Value;

type Res = Result<(), RuntimeError>;

macro_rules! lane {
    ($un:ident, $bin:ident, $cmp:ident, $pop:ident, $t:ty, $wrap:expr) => {
        fn $un(s: &mut ValueStack, f: impl FnOnce($t) -> $t) -> Res {
            let a = s.$pop()?;
            s.push($wrap(f(a)));
            Ok(())
        }

        fn $bin(s: &mut ValueStack, f: impl FnOnce($t, $t) -> $t) -> Res {
            let b = s.$pop()?;
            let a = s.$pop()?;
            s.push($wrap(f(a, b)));
            Ok(())
        }

        fn $cmp(s: &mut ValueStack, f: impl FnOnce($t, $t) -> bool) -> Res {
            let b = s.$pop()?;
            let a = s.$pop()?;
            s.push(Value::I32(u32::from(f(a, b))));
            Ok(())
        }
    };
    // Integer lanes also carry trapping binary ops (div, rem).
    ($un:ident, $bin:ident, $try_bin:ident, $cmp:ident, $pop:ident, $t:ty, $wrap:expr) => {
        lane!($un, $bin, $cmp, $pop, $t, $wrap);

        fn $try_bin(s: &mut ValueStack, f: impl FnOnce($t, $t) -> Result<$t, Trap>) -> Res {
            let b = s.$pop()?;
            let a = s.$pop()?;
            s.push($wrap(f(a, b)?));
            Ok(())
        }
    };
}

lane!(i32_un, i32_bin, i32_try_bin, i32_cmp, pop_i32, u32, Value::I32);
lane!(i64_un, i64_bin, i64_try_bin, i64_cmp, pop_i64, u64, Value::I64);
lane!(f32_un, f32_bin, f32_cmp, pop_f32, f32, Value::f32);
lane!(f64_un, f64_bin, f64_cmp, pop_f64, f64, Value::f64);

/// Pop one operand, convert it, push the result. Conversions may trap.
fn convert<A, B>(
    s: &mut ValueStack,
    pop: impl FnOnce(&mut ValueStack) -> Result<A, EvalError>,
    f: impl FnOnce(A) -> Result<B, Trap>,
    wrap: impl FnOnce(B) -> Value,
) -> Res {
    let a = pop(s)?;
    s.push(wrap(f(a)?));
    Ok(())
}

fn pop_f32_wide(s: &mut ValueStack) -> Result<f64, EvalError> {
    s.pop_f32().map(f64::from)
}

/// Execute one value-only instruction against `s`.
pub(crate) fn exec(opcode: Opcode, s: &mut ValueStack) -> Res {
    use Opcode::*;
    match opcode {
        I32Eqz => i32_un(s, |a| u32::from(a == 0)),
        I32Eq => i32_cmp(s, |a, b| a == b),
        I32Ne => i32_cmp(s, |a, b| a != b),
        I32LtS => i32_cmp(s, |a, b| (a as i32) < (b as i32)),
        I32LtU => i32_cmp(s, |a, b| a < b),
        I32GtS => i32_cmp(s, |a, b| (a as i32) > (b as i32)),
        I32GtU => i32_cmp(s, |a, b| a > b),
        I32LeS => i32_cmp(s, |a, b| (a as i32) <= (b as i32)),
        I32LeU => i32_cmp(s, |a, b| a <= b),
        I32GeS => i32_cmp(s, |a, b| (a as i32) >= (b as i32)),
        I32GeU => i32_cmp(s, |a, b| a >= b),

        I64Eqz => {
            let a = s.pop_i64()?;
            s.push(Value::I32(u32::from(a == 0)));
            Ok(())
        }
        I64Eq => i64_cmp(s, |a, b| a == b),
        I64Ne => i64_cmp(s, |a, b| a != b),
        I64LtS => i64_cmp(s, |a, b| (a as i64) < (b as i64)),
        I64LtU => i64_cmp(s, |a, b| a < b),
        I64GtS => i64_cmp(s, |a, b| (a as i64) > (b as i64)),
        I64GtU => i64_cmp(s, |a, b| a > b),
        I64LeS => i64_cmp(s, |a, b| (a as i64) <= (b as i64)),
        I64LeU => i64_cmp(s, |a, b| a <= b),
        I64GeS => i64_cmp(s, |a, b| (a as i64) >= (b as i64)),
        I64GeU => i64_cmp(s, |a, b| a >= b),

        F32Eq => f32_cmp(s, |a, b| a == b),
        F32Ne => f32_cmp(s, |a, b| a != b),
        F32Lt => f32_cmp(s, |a, b| a < b),
        F32Gt => f32_cmp(s, |a, b| a > b),
        F32Le => f32_cmp(s, |a, b| a <= b),
        F32Ge => f32_cmp(s, |a, b| a >= b),

        F64Eq => f64_cmp(s, |a, b| a == b),
        F64Ne => f64_cmp(s, |a, b| a != b),
        F64Lt => f64_cmp(s, |a, b| a < b),
        F64Gt => f64_cmp(s, |a, b| a > b),
        F64Le => f64_cmp(s, |a, b| a <= b),
        F64Ge => f64_cmp(s, |a, b| a >= b),

        I32Clz => i32_un(s, u32::leading_zeros),
        I32Ctz => i32_un(s, u32::trailing_zeros),
        I32Popcnt => i32_un(s, u32::count_ones),
        I32Add => i32_bin(s, u32::wrapping_add),
        I32Sub => i32_bin(s, u32::wrapping_sub),
        I32Mul => i32_bin(s, u32::wrapping_mul),
        I32DivS => i32_try_bin(s, num::i32_div_s),
        I32DivU => i32_try_bin(s, num::i32_div_u),
        I32RemS => i32_try_bin(s, num::i32_rem_s),
        I32RemU => i32_try_bin(s, num::i32_rem_u),
        I32And => i32_bin(s, |a, b| a & b),
        I32Or => i32_bin(s, |a, b| a | b),
        I32Xor => i32_bin(s, |a, b| a ^ b),
        I32Shl => i32_bin(s, u32::wrapping_shl),
        I32ShrS => i32_bin(s, |a, b| (a as i32).wrapping_shr(b) as u32),
        I32ShrU => i32_bin(s, u32::wrapping_shr),
        I32Rotl => i32_bin(s, |a, b| a.rotate_left(b % 32)),
        I32Rotr => i32_bin(s, |a, b| a.rotate_right(b % 32)),

        I64Clz => i64_un(s, |a| u64::from(a.leading_zeros())),
        I64Ctz => i64_un(s, |a| u64::from(a.trailing_zeros())),
        I64Popcnt => i64_un(s, |a| u64::from(a.count_ones())),
        I64Add => i64_bin(s, u64::wrapping_add),
        I64Sub => i64_bin(s, u64::wrapping_sub),
        I64Mul => i64_bin(s, u64::wrapping_mul),
        I64DivS => i64_try_bin(s, num::i64_div_s),
        I64DivU => i64_try_bin(s, num::i64_div_u),
        I64RemS => i64_try_bin(s, num::i64_rem_s),
        I64RemU => i64_try_bin(s, num::i64_rem_u),
        I64And => i64_bin(s, |a, b| a & b),
        I64Or => i64_bin(s, |a, b| a | b),
        I64Xor => i64_bin(s, |a, b| a ^ b),
        I64Shl => i64_bin(s, |a, b| a.wrapping_shl(b as u32)),
        I64ShrS => i64_bin(s, |a, b| (a as i64).wrapping_shr(b as u32) as u64),
        I64ShrU => i64_bin(s, |a, b| a.wrapping_shr(b as u32)),
        I64Rotl => i64_bin(s, |a, b| a.rotate_left((b % 64) as u32)),
        I64Rotr => i64_bin(s, |a, b| a.rotate_right((b % 64) as u32)),

        F32Abs => bits32(s, num::f32_abs),
        F32Neg => bits32(s, num::f32_neg),
        F32Ceil => f32_un(s, f32::ceil),
        F32Floor => f32_un(s, f32::floor),
        F32Trunc => f32_un(s, f32::trunc),
        F32Nearest => f32_un(s, num::f32_nearest),
        F32Sqrt => f32_un(s, f32::sqrt),
        F32Add => f32_bin(s, |a, b| a + b),
        F32Sub => f32_bin(s, |a, b| a - b),
        F32Mul => f32_bin(s, |a, b| a * b),
        F32Div => f32_bin(s, |a, b| a / b),
        F32Min => f32_bin(s, num::f32_min),
        F32Max => f32_bin(s, num::f32_max),
        F32Copysign => {
            let sign = s.pop_f32_bits()?;
            let mag = s.pop_f32_bits()?;
            s.push(Value::F32(num::f32_copysign(mag, sign)));
            Ok(())
        }

        F64Abs => bits64(s, num::f64_abs),
        F64Neg => bits64(s, num::f64_neg),
        F64Ceil => f64_un(s, f64::ceil),
        F64Floor => f64_un(s, f64::floor),
        F64Trunc => f64_un(s, f64::trunc),
        F64Nearest => f64_un(s, num::f64_nearest),
        F64Sqrt => f64_un(s, f64::sqrt),
        F64Add => f64_bin(s, |a, b| a + b),
        F64Sub => f64_bin(s, |a, b| a - b),
        F64Mul => f64_bin(s, |a, b| a * b),
        F64Div => f64_bin(s, |a, b| a / b),
        F64Min => f64_bin(s, num::f64_min),
        F64Max => f64_bin(s, num::f64_max),
        F64Copysign => {
            let sign = s.pop_f64_bits()?;
            let mag = s.pop_f64_bits()?;
            s.push(Value::F64(num::f64_copysign(mag, sign)));
            Ok(())
        }

        I32WrapI64 => convert(s, ValueStack::pop_i64, |a| Ok(a as u32), Value::I32),
        I32TruncF32S => convert(s, pop_f32_wide, num::trunc_to_i32, Value::I32),
        I32TruncF32U => convert(s, pop_f32_wide, num::trunc_to_u32, Value::I32),
        I32TruncF64S => convert(s, ValueStack::pop_f64, num::trunc_to_i32, Value::I32),
        I32TruncF64U => convert(s, ValueStack::pop_f64, num::trunc_to_u32, Value::I32),
        I64ExtendI32S => {
            convert(s, ValueStack::pop_i32, |a| Ok(a as i32 as i64 as u64), Value::I64)
        }
        I64ExtendI32U => convert(s, ValueStack::pop_i32, |a| Ok(u64::from(a)), Value::I64),
        I64TruncF32S => convert(s, pop_f32_wide, num::trunc_to_i64, Value::I64),
        I64TruncF32U => convert(s, pop_f32_wide, num::trunc_to_u64, Value::I64),
        I64TruncF64S => convert(s, ValueStack::pop_f64, num::trunc_to_i64, Value::I64),
        I64TruncF64U => convert(s, ValueStack::pop_f64, num::trunc_to_u64, Value::I64),
        F32ConvertI32S => convert(s, ValueStack::pop_i32, |a| Ok(a as i32 as f32), Value::f32),
        F32ConvertI32U => convert(s, ValueStack::pop_i32, |a| Ok(a as f32), Value::f32),
        F32ConvertI64S => convert(s, ValueStack::pop_i64, |a| Ok(a as i64 as f32), Value::f32),
        F32ConvertI64U => convert(s, ValueStack::pop_i64, |a| Ok(a as f32), Value::f32),
        F32DemoteF64 => convert(s, ValueStack::pop_f64, |a| Ok(a as f32), Value::f32),
        F64ConvertI32S => convert(s, ValueStack::pop_i32, |a| Ok(f64::from(a as i32)), Value::f64),
        F64ConvertI32U => convert(s, ValueStack::pop_i32, |a| Ok(f64::from(a)), Value::f64),
        F64ConvertI64S => convert(s, ValueStack::pop_i64, |a| Ok(a as i64 as f64), Value::f64),
        F64ConvertI64U => convert(s, ValueStack::pop_i64, |a| Ok(a as f64), Value::f64),
        F64PromoteF32 => convert(s, ValueStack::pop_f32, |a| Ok(f64::from(a)), Value::f64),
        I32ReinterpretF32 => convert(s, ValueStack::pop_f32_bits, Ok, Value::I32),
        I64ReinterpretF64 => convert(s, ValueStack::pop_f64_bits, Ok, Value::I64),
        F32ReinterpretI32 => convert(s, ValueStack::pop_i32, Ok, Value::F32),
        F64ReinterpretI64 => convert(s, ValueStack::pop_i64, Ok, Value::F64),

        I32Extend8S => i32_un(s, num::i32_extend8_s),
        I32Extend16S => i32_un(s, num::i32_extend16_s),
        I64Extend8S => i64_un(s, num::i64_extend8_s),
        I64Extend16S => i64_un(s, num::i64_extend16_s),
        I64Extend32S => i64_un(s, num::i64_extend32_s),

        I32TruncSatF32S => sat(s, pop_f32_wide, num::trunc_sat_to_i32, Value::I32),
        I32TruncSatF32U => sat(s, pop_f32_wide, num::trunc_sat_to_u32, Value::I32),
        I32TruncSatF64S => sat(s, ValueStack::pop_f64, num::trunc_sat_to_i32, Value::I32),
        I32TruncSatF64U => sat(s, ValueStack::pop_f64, num::trunc_sat_to_u32, Value::I32),
        I64TruncSatF32S => sat(s, pop_f32_wide, num::trunc_sat_to_i64, Value::I64),
        I64TruncSatF32U => sat(s, pop_f32_wide, num::trunc_sat_to_u64, Value::I64),
        I64TruncSatF64S => sat(s, ValueStack::pop_f64, num::trunc_sat_to_i64, Value::I64),
        I64TruncSatF64U => sat(s, ValueStack::pop_f64, num::trunc_sat_to_u64, Value::I64),

        other => Err(EvalError::Unsupported(other.mnemonic()).into()),
    }
}

fn bits32(s: &mut ValueStack, f: impl FnOnce(u32) -> u32) -> Res {
    let a = s.pop_f32_bits()?;
    s.push(Value::F32(f(a)));
    Ok(())
}

fn bits64(s: &mut ValueStack, f: impl FnOnce(u64) -> u64) -> Res {
    let a = s.pop_f64_bits()?;
    s.push(Value::F64(f(a)));
    Ok(())
}

fn sat<B>(
    s: &mut ValueStack,
    pop: impl FnOnce(&mut ValueStack) -> Result<f64, EvalError>,
    f: impl FnOnce(f64) -> B,
    wrap: impl FnOnce(B) -> Value,
) -> Res {
    convert(s, pop, |a| Ok(f(a)), wrap)
}
