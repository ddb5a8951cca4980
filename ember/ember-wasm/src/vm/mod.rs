//! Decoded instruction set and the interpreter that executes it.

pub mod frames;
pub mod instructions;
pub mod interpreter;
mod numeric;
pub mod stack;

pub use instructions::{Op, Opcode, Operand, Scope};
pub use interpreter::Runtime;
