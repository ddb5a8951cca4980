//! Embedding facade: load, link and invoke a module in one place.

use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use tracing::debug;

use crate::binary::sections;
use crate::config::Config;
use crate::error::{ArgumentError, Error, LinkError, RuntimeError};
use crate::host::ImportResolver;
use crate::model::{ExportDesc, Module};
use crate::runtime::{link, Linked, MemoryInstance, Store};
use crate::value::Value;
use crate::vm::Runtime;

/// A linked module with its own Store.
#[derive(Debug)]
pub struct Instance {
    module: Arc<Module>,
    store: Store,
    exports: HashMap<String, ExportDesc>,
    config: Config,
}

impl Instance {
    /// Decode `bytes` and instantiate with the default configuration.
    pub fn new<R>(bytes: &[u8], imports: &R) -> Result<Self, Error>
    where
        R: ImportResolver + ?Sized,
    {
        Self::with_config(bytes, imports, Config::default())
    }

    pub fn with_config<R>(bytes: &[u8], imports: &R, config: Config) -> Result<Self, Error>
    where
        R: ImportResolver + ?Sized,
    {
        let module = sections::parse(bytes)?;
        Self::from_module(Arc::new(module), imports, config)
    }

    pub fn from_reader<Rd, R>(reader: Rd, imports: &R, config: Config) -> Result<Self, Error>
    where
        Rd: Read,
        R: ImportResolver + ?Sized,
    {
        let module = sections::load(reader)?;
        Self::from_module(Arc::new(module), imports, config)
    }

    /// Link an already decoded module. The start function, if any, runs
    /// before this returns.
    pub fn from_module<R>(module: Arc<Module>, imports: &R, config: Config) -> Result<Self, Error>
    where
        R: ImportResolver + ?Sized,
    {
        let Linked { store, exports } = link(&module, imports, &config)?;
        let mut instance = Instance { module, store, exports, config };

        if let Some(start) = instance.module.start {
            debug!(func = start, "running start function");
            Runtime::new(&mut instance.store, config)
                .invoke(start, &[])
                .map_err(LinkError::StartTrap)?;
        }
        debug!(exports = instance.exports.len(), "instantiated module");
        Ok(instance)
    }

    /// Call the exported function `name`.
    pub fn invoke(&mut self, name: &str, args: &[Value]) -> Result<Option<Value>, RuntimeError> {
        let func = match self.exports.get(name) {
            Some(ExportDesc::Func(idx)) => *idx,
            Some(_) => return Err(ArgumentError::NotAFunction(name.to_owned()).into()),
            None => return Err(ArgumentError::UnknownExport(name.to_owned()).into()),
        };
        debug!(name, func, args = args.len(), "invoking export");
        Runtime::new(&mut self.store, self.config).invoke(func, args)
    }

    fn memory_idx(&self, name: &str) -> Option<u32> {
        match self.exports.get(name)? {
            ExportDesc::Memory(idx) => Some(*idx),
            _ => None,
        }
    }

    /// Exported memory `name`.
    pub fn memory(&self, name: &str) -> Option<&MemoryInstance> {
        let idx = self.memory_idx(name)?;
        self.store.mems.get(idx as usize)
    }

    pub fn memory_mut(&mut self, name: &str) -> Option<&mut MemoryInstance> {
        let idx = self.memory_idx(name)?;
        self.store.mems.get_mut(idx as usize)
    }

    /// Grow exported memory `name` by `delta` pages. Returns the previous size,
    /// or `None` if the memory does not exist or cannot grow that far.
    pub fn grow_memory(&mut self, name: &str, delta: u32) -> Option<u32> {
        self.memory_mut(name)?.grow(delta)
    }

    /// Current value of exported global `name`.
    pub fn global(&self, name: &str) -> Option<Value> {
        match self.exports.get(name)? {
            ExportDesc::Global(idx) => self.store.globals.get(*idx as usize).map(|g| g.get()),
            _ => None,
        }
    }

    pub fn exports(&self) -> impl Iterator<Item = (&str, ExportDesc)> {
        self.exports.iter().map(|(name, desc)| (name.as_str(), *desc))
    }

    pub fn module(&self) -> &Arc<Module> {
        &self.module
    }

    pub fn config(&self) -> Config {
        self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }
}
