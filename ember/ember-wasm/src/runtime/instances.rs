//! Function instances held by the Store.

use std::sync::Arc;

use crate::host::HostFunc;
use crate::model::{FuncBody, TypeIdx};

/// A callable entry in the function index space.
#[derive(Clone)]
pub enum FuncInstance {
    /// Module-defined function sharing its decoded body.
    Wasm { ty: TypeIdx, body: Arc<FuncBody> },
    /// Host function resolved from an import.
    Host { ty: TypeIdx, f: Arc<HostFunc> },
}

impl FuncInstance {
    pub fn type_idx(&self) -> TypeIdx {
        match self {
            FuncInstance::Wasm { ty, .. } | FuncInstance::Host { ty, .. } => *ty,
        }
    }
}

impl std::fmt::Debug for FuncInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FuncInstance::Wasm { ty, body } => f
                .debug_struct("Wasm")
                .field("ty", ty)
                .field("ops", &body.ops.len())
                .finish(),
            FuncInstance::Host { ty, .. } => f.debug_struct("Host").field("ty", ty).finish(),
        }
    }
}
