use crate::error::Trap;
use crate::runtime::Store;
use crate::value::Value;

/// Host function callable from WASM. It receives the instance Store (to
/// reach memory) and its arguments in declaration order, and returns at most
/// one value.
pub type HostFunc = dyn Fn(&mut Store, &[Value]) -> Result<Option<Value>, Trap> + Send + Sync;
