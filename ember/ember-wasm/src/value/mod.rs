//! Tagged runtime values.
//!
//! Every value is stored as the canonical unsigned bit pattern of its width.
//! Integers are reinterpreted as signed on demand; floats keep their raw
//! IEEE-754 bits so NaN payloads survive loads, stores and moves untouched.

pub mod num;

use std::fmt;

use crate::model::ValType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    I32(u32),
    I64(u64),
    F32(u32),
    F64(u64),
}

impl Value {
    pub const fn i32(v: i32) -> Self {
        Value::I32(v as u32)
    }

    pub const fn i64(v: i64) -> Self {
        Value::I64(v as u64)
    }

    pub fn f32(v: f32) -> Self {
        Value::F32(v.to_bits())
    }

    pub fn f64(v: f64) -> Self {
        Value::F64(v.to_bits())
    }

    /// Build an integer value of type `ty` from a host integer, taking the
    /// two's-complement pattern first and then masking to the target width.
    /// Float types reinterpret the masked pattern as raw bits.
    pub const fn from_int(ty: ValType, v: i64) -> Self {
        let bits = v as u64;
        match ty {
            ValType::I32 => Value::I32(bits as u32),
            ValType::I64 => Value::I64(bits),
            ValType::F32 => Value::F32(bits as u32),
            ValType::F64 => Value::F64(bits),
        }
    }

    /// The zero value locals of type `ty` start with.
    pub const fn zero(ty: ValType) -> Self {
        Self::from_int(ty, 0)
    }

    pub const fn ty(&self) -> ValType {
        match self {
            Value::I32(_) => ValType::I32,
            Value::I64(_) => ValType::I64,
            Value::F32(_) => ValType::F32,
            Value::F64(_) => ValType::F64,
        }
    }

    pub const fn as_u32(&self) -> Option<u32> {
        match *self {
            Value::I32(v) => Some(v),
            _ => None,
        }
    }

    pub const fn as_i32(&self) -> Option<i32> {
        match *self {
            Value::I32(v) => Some(v as i32),
            _ => None,
        }
    }

    pub const fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::I64(v) => Some(v),
            _ => None,
        }
    }

    pub const fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::I64(v) => Some(v as i64),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            Value::F32(bits) => Some(f32::from_bits(bits)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::F64(bits) => Some(f64::from_bits(bits)),
            _ => None,
        }
    }

    /// Raw bit pattern zero-extended to 64 bits.
    pub const fn bits(&self) -> u64 {
        match *self {
            Value::I32(v) | Value::F32(v) => v as u64,
            Value::I64(v) | Value::F64(v) => v,
        }
    }

    /// Little-endian encoding padded to eight bytes. A narrow store of `n`
    /// bytes writes `to_le_bytes()[..n]`, which is the wrapped low part.
    pub const fn to_le_bytes(&self) -> [u8; 8] {
        self.bits().to_le_bytes()
    }

    /// Decode `bytes` (1, 2, 4 or 8 of them) into a value of type `ty`,
    /// sign- or zero-extending narrow loads.
    pub fn from_le_bytes(ty: ValType, bytes: &[u8], signed: bool) -> Self {
        let mut buf = [0u8; 8];
        let n = bytes.len().min(8);
        buf[..n].copy_from_slice(&bytes[..n]);
        let mut bits = u64::from_le_bytes(buf);
        if signed && n < 8 && n > 0 {
            let unused = 64 - 8 * n as u32;
            bits = (((bits << unused) as i64) >> unused) as u64;
        }
        Self::from_int(ty, bits as i64)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::i32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::i64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::f32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::f64(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Value::I32(v) => write!(f, "i32:{}", v as i32),
            Value::I64(v) => write!(f, "i64:{}", v as i64),
            Value::F32(bits) => write!(f, "f32:{}", f32::from_bits(bits)),
            Value::F64(bits) => write!(f, "f64:{}", f64::from_bits(bits)),
        }
    }
}
