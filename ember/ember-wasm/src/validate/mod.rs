//! Structural checks run after decoding: index spaces, limits, exports and
//! the start function. Instruction typing is not performed; the interpreter
//! reports ill-typed code as `EvalError` when it executes it.

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::model::{DataMode, ExportDesc, FuncIdx, FuncType, ImportDesc, Limits, Module, TypeIdx};

type VResult<T> = Result<T, ValidationError>;

struct TypeEnv<'a> {
    m: &'a Module,
}

impl<'a> TypeEnv<'a> {
    fn new(m: &'a Module) -> Self {
        Self { m }
    }

    fn check_type(&self, context: &'static str, index: TypeIdx) -> VResult<&'a FuncType> {
        self.m
            .types
            .get(index as usize)
            .ok_or(ValidationError::TypeIndex { context, index })
    }

    fn check_index(
        &self,
        context: &'static str,
        space: &'static str,
        index: u32,
        total: u32,
    ) -> VResult<()> {
        if index < total {
            Ok(())
        } else {
            Err(ValidationError::IndexOutOfRange { context, space, index })
        }
    }

    fn func(&self, context: &'static str, index: FuncIdx) -> VResult<()> {
        self.check_index(context, "function", index, self.m.total_funcs())
    }
}

fn check_limits(context: &'static str, limits: &Limits) -> VResult<()> {
    match limits.max {
        Some(max) if max < limits.min => {
            Err(ValidationError::Limits { context, min: limits.min, max })
        }
        _ => Ok(()),
    }
}

pub fn validate_module(m: &Module) -> VResult<()> {
    let env = TypeEnv::new(m);

    /* Imports and function declarations */
    for imp in &m.imports {
        if let ImportDesc::Func(ty) = imp.desc {
            env.check_type("function import", ty)?;
        }
    }
    for &ty in &m.func_type_indices {
        env.check_type("function declaration", ty)?;
    }

    /* Tables and memories */
    for tt in &m.tables {
        check_limits("table", &tt.limits)?;
    }
    let memories = m.total_memories();
    if memories > 1 {
        return Err(ValidationError::MultipleMemories(memories));
    }
    for mt in &m.memories {
        check_limits("memory", &mt.limits)?;
    }

    /* Exports */
    let mut names = HashSet::new();
    for ex in &m.exports {
        if !names.insert(ex.name.as_str()) {
            return Err(ValidationError::DuplicateExport(ex.name.clone()));
        }
        match ex.desc {
            ExportDesc::Func(f) => env.func("export", f)?,
            ExportDesc::Table(t) => env.check_index("export", "table", t, m.total_tables())?,
            ExportDesc::Memory(mem) => env.check_index("export", "memory", mem, memories)?,
            ExportDesc::Global(g) => env.check_index("export", "global", g, m.total_globals())?,
        }
    }

    /* Start function */
    if let Some(start) = m.start {
        env.func("start", start)?;
        if let Some(ty) = m.func_type(start) {
            if !ty.params.is_empty() || !ty.results.is_empty() {
                return Err(ValidationError::StartSignature(ty.to_string()));
            }
        }
    }

    /* Element segments */
    for seg in &m.elements {
        env.check_index("element segment", "table", seg.table, m.total_tables())?;
        for &f in &seg.init {
            env.func("element segment", f)?;
        }
    }

    /* Data segments */
    for seg in &m.data {
        if let DataMode::Active { memory, .. } = seg.mode {
            env.check_index("data segment", "memory", memory, memories)?;
        }
    }

    Ok(())
}
