//! Value stack for the interpreter.

use crate::error::EvalError;
use crate::model::ValType;
use crate::value::Value;

#[derive(Debug, Default)]
pub struct ValueStack {
    stack: Vec<Value>,
}

fn mismatch(expected: ValType, found: Value) -> EvalError {
    EvalError::TypeMismatch { expected, found: found.ty() }
}

impl ValueStack {
    pub fn new() -> Self {
        Self { stack: Vec::with_capacity(1024) }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    #[inline]
    pub fn push(&mut self, v: Value) {
        self.stack.push(v);
    }

    #[inline]
    pub fn pop(&mut self) -> Result<Value, EvalError> {
        self.stack.pop().ok_or(EvalError::StackUnderflow)
    }

    pub fn peek(&self) -> Option<&Value> {
        self.stack.last()
    }

    pub fn pop_typed(&mut self, ty: ValType) -> Result<Value, EvalError> {
        let v = self.pop()?;
        if v.ty() == ty {
            Ok(v)
        } else {
            Err(mismatch(ty, v))
        }
    }

    pub fn pop_i32(&mut self) -> Result<u32, EvalError> {
        match self.pop()? {
            Value::I32(v) => Ok(v),
            other => Err(mismatch(ValType::I32, other)),
        }
    }

    pub fn pop_i64(&mut self) -> Result<u64, EvalError> {
        match self.pop()? {
            Value::I64(v) => Ok(v),
            other => Err(mismatch(ValType::I64, other)),
        }
    }

    pub fn pop_f32_bits(&mut self) -> Result<u32, EvalError> {
        match self.pop()? {
            Value::F32(bits) => Ok(bits),
            other => Err(mismatch(ValType::F32, other)),
        }
    }

    pub fn pop_f64_bits(&mut self) -> Result<u64, EvalError> {
        match self.pop()? {
            Value::F64(bits) => Ok(bits),
            other => Err(mismatch(ValType::F64, other)),
        }
    }

    pub fn pop_f32(&mut self) -> Result<f32, EvalError> {
        self.pop_f32_bits().map(f32::from_bits)
    }

    pub fn pop_f64(&mut self) -> Result<f64, EvalError> {
        self.pop_f64_bits().map(f64::from_bits)
    }

    /// Pop the top `n` values, returned bottom-first.
    pub fn pop_n(&mut self, n: usize) -> Result<Vec<Value>, EvalError> {
        let at = self
            .stack
            .len()
            .checked_sub(n)
            .ok_or(EvalError::StackUnderflow)?;
        Ok(self.stack.split_off(at))
    }

    /// Discard everything above `height` except the top `arity` values.
    pub fn unwind(&mut self, height: usize, arity: usize) -> Result<(), EvalError> {
        let len = self.stack.len();
        if len < height + arity {
            return Err(EvalError::StackUnderflow);
        }
        self.stack.drain(height..len - arity);
        Ok(())
    }

    pub fn truncate(&mut self, height: usize) {
        self.stack.truncate(height);
    }
}
