//! Turn a decoded `Module` plus host imports into a populated `Store`.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace};

use super::{
    global::GlobalInstance,
    instances::FuncInstance,
    memory::{MemoryInstance, MAX_PAGES},
    table::TableInstance,
    Store,
};
use crate::config::Config;
use crate::error::LinkError;
use crate::host::ImportResolver;
use crate::model::{DataMode, ExportDesc, ImportDesc, Module, RefType, ValType};
use crate::value::Value;

/// A fully initialized Store and the module's export map.
#[derive(Debug)]
pub struct Linked {
    pub store: Store,
    pub exports: HashMap<String, ExportDesc>,
}

fn offset_of(value: Value, context: &'static str) -> Result<u32, LinkError> {
    value.as_u32().ok_or_else(|| LinkError::TypeMismatch {
        context,
        expected: ValType::I32.to_string(),
        found: value.ty().to_string(),
    })
}

/// Build the Store. Any failure aborts the whole link; no partial state
/// escapes.
pub fn link<R>(module: &Module, resolver: &R, config: &Config) -> Result<Linked, LinkError>
where
    R: ImportResolver + ?Sized,
{
    let mut store = Store::new();
    store.types = module.types.clone();

    for imp in &module.imports {
        let ImportDesc::Func(ty) = imp.desc else {
            return Err(LinkError::UnsupportedImport {
                module: imp.module.clone(),
                name: imp.name.clone(),
                kind: imp.desc.kind(),
            });
        };
        let func_type = module
            .types
            .get(ty as usize)
            .ok_or(LinkError::MissingIndex { space: "type", index: ty })?;
        let f = resolver
            .resolve_func(&imp.module, &imp.name, func_type)
            .ok_or_else(|| LinkError::UnresolvedImport {
                module: imp.module.clone(),
                name: imp.name.clone(),
            })?;
        let idx = store.alloc_func(FuncInstance::Host { ty, f });
        trace!(module = %imp.module, name = %imp.name, idx, "bound host import");
    }

    for (&ty, body) in module.func_type_indices.iter().zip(&module.codes) {
        store.alloc_func(FuncInstance::Wasm { ty, body: Arc::clone(body) });
    }

    for tt in &module.tables {
        if tt.limits.min > config.max_table_elems {
            return Err(LinkError::LimitsExceeded {
                context: "table minimum above configured cap",
            });
        }
        let table = TableInstance::new(tt)
            .map_err(|_| LinkError::LimitsExceeded { context: "table allocation failed" })?;
        store.alloc_table(table);
    }

    for mt in &module.memories {
        if mt.limits.min > MAX_PAGES {
            return Err(LinkError::LimitsExceeded {
                context: "memory minimum above 65536 pages",
            });
        }
        let memory = MemoryInstance::new(mt)
            .map_err(|_| LinkError::LimitsExceeded { context: "memory allocation failed" })?;
        store.alloc_memory(memory);
    }

    for g in &module.globals {
        store.alloc_global(GlobalInstance::new(g.ty, g.init));
    }

    let total_funcs = store.funcs.len() as u32;
    for (segment, seg) in module.elements.iter().enumerate() {
        let table = store
            .tables
            .get_mut(seg.table as usize)
            .ok_or(LinkError::MissingIndex { space: "table", index: seg.table })?;
        if table.kind() != RefType::FuncRef {
            return Err(LinkError::ElementKind { table: seg.table, found: table.kind() });
        }
        if let Some(&bad) = seg.init.iter().find(|&&f| f >= total_funcs) {
            return Err(LinkError::MissingIndex { space: "function", index: bad });
        }
        let offset = offset_of(seg.offset, "element segment offset")?;
        table
            .init(offset, &seg.init)
            .map_err(|_| LinkError::ElemOutOfBounds { segment })?;
    }

    for (segment, seg) in module.data.iter().enumerate() {
        match seg.mode {
            DataMode::Passive => {
                store.alloc_data(Arc::from(seg.init.as_slice()));
            }
            DataMode::Active { memory, offset } => {
                let offset = offset_of(offset, "data segment offset")?;
                store
                    .mems
                    .get_mut(memory as usize)
                    .ok_or(LinkError::MissingIndex { space: "memory", index: memory })?
                    .write(u64::from(offset), &seg.init)
                    .map_err(|_| LinkError::DataOutOfBounds { segment })?;
                // Active segments are consumed by instantiation.
                store.alloc_data(Arc::from(&[][..]));
            }
        }
    }

    let exports = module
        .exports
        .iter()
        .map(|e| (e.name.clone(), e.desc))
        .collect();

    debug!(
        funcs = store.funcs.len(),
        tables = store.tables.len(),
        memories = store.mems.len(),
        globals = store.globals.len(),
        "linked module"
    );
    Ok(Linked { store, exports })
}
