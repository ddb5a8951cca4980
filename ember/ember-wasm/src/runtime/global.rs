//! Global instance: current value plus its declared type.

use crate::error::EvalError;
use crate::model::GlobalType;
use crate::value::Value;

#[derive(Debug, Clone)]
pub struct GlobalInstance {
    ty: GlobalType,
    val: Value,
}

impl GlobalInstance {
    pub fn new(ty: GlobalType, init: Value) -> Self {
        Self { ty, val: init }
    }

    pub fn get(&self) -> Value {
        self.val
    }

    pub fn ty(&self) -> &GlobalType {
        &self.ty
    }

    /// Replace the value. `idx` only labels the error.
    pub fn set(&mut self, idx: u32, v: Value) -> Result<(), EvalError> {
        if !self.ty.mutable {
            return Err(EvalError::ImmutableGlobal(idx));
        }
        if v.ty() != self.ty.val_type {
            return Err(EvalError::TypeMismatch { expected: self.ty.val_type, found: v.ty() });
        }
        self.val = v;
        Ok(())
    }
}
