//! Host import contract.

pub mod func;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use crate::error::Trap;
use crate::model::FuncType;
use crate::runtime::Store;
use crate::value::Value;
pub use func::HostFunc;

/// Supplies host functions for a module's function imports.
pub trait ImportResolver {
    fn resolve_func(&self, module: &str, name: &str, ty: &FuncType) -> Option<Arc<HostFunc>>;
}

/// Two-level `module -> field -> function` import table.
#[derive(Default, Clone)]
pub struct Imports {
    funcs: HashMap<String, HashMap<String, Arc<HostFunc>>>,
}

impl Imports {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `f` under `module.name`, replacing any earlier definition.
    pub fn define<F>(&mut self, module: &str, name: &str, f: F) -> &mut Self
    where
        F: Fn(&mut Store, &[Value]) -> Result<Option<Value>, Trap> + Send + Sync + 'static,
    {
        self.funcs
            .entry(module.to_owned())
            .or_default()
            .insert(name.to_owned(), Arc::new(f));
        self
    }

    pub fn get(&self, module: &str, name: &str) -> Option<Arc<HostFunc>> {
        self.funcs.get(module)?.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.funcs.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for Imports {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<String> = self
            .funcs
            .iter()
            .flat_map(|(m, fields)| fields.keys().map(move |n| format!("{m}.{n}")))
            .collect();
        names.sort();
        f.debug_struct("Imports").field("funcs", &names).finish()
    }
}

impl ImportResolver for Imports {
    fn resolve_func(&self, module: &str, name: &str, ty: &FuncType) -> Option<Arc<HostFunc>> {
        let found = self.get(module, name);
        trace!(module, name, %ty, resolved = found.is_some(), "resolving function import");
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_and_resolve() {
        let mut imports = Imports::new();
        imports
            .define("env", "one", |_, _| Ok(Some(Value::i32(1))))
            .define("env", "nothing", |_, _| Ok(None));
        assert_eq!(imports.len(), 2);

        let f = imports.resolve_func("env", "one", &FuncType::default()).unwrap();
        let mut store = Store::new();
        assert_eq!(f(&mut store, &[]), Ok(Some(Value::i32(1))));
        assert!(imports.get("env", "missing").is_none());
        assert!(imports.get("wasi", "one").is_none());
    }
}
