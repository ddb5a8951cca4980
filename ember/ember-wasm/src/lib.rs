//! ember-wasm: an embeddable interpreter for WebAssembly core modules
//! (binary format version 1).
//!
//! ```no_run
//! use ember_wasm::{Imports, Instance, Value};
//!
//! # fn main() -> Result<(), ember_wasm::Error> {
//! let bytes = std::fs::read("add.wasm").map_err(ember_wasm::LoadError::from)?;
//! let mut instance = Instance::new(&bytes, &Imports::new())?;
//! let sum = instance.invoke("add", &[Value::i32(100), Value::i32(200)])?;
//! assert_eq!(sum, Some(Value::i32(300)));
//! # Ok(())
//! # }
//! ```

pub mod binary;
pub mod config;
pub mod error;
pub mod host;
pub mod instance;
pub mod model;
pub mod runtime;
pub mod validate;
pub mod value;
pub mod vm;

pub use config::Config;
pub use error::{
    ArgumentError, DecodeError, Error, EvalError, LinkError, LoadError, RuntimeError, Trap,
    ValidationError,
};
pub use host::{HostFunc, ImportResolver, Imports};
pub use instance::Instance;
pub use model::{FuncType, Module, ValType};
pub use runtime::{MemoryInstance, Store};
pub use value::Value;

/// Decode and validate a module from bytes.
pub fn parse(bytes: &[u8]) -> Result<Module, LoadError> {
    binary::sections::parse(bytes)
}

/// Decode and validate a module from a reader.
pub fn load(reader: impl std::io::Read) -> Result<Module, LoadError> {
    binary::sections::load(reader)
}
