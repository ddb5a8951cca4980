//! Decoded module structure: sections, function bodies, segments and the
//! assembled `Module`.

use std::sync::Arc;

use super::types::{
    Export, ExportDesc, FuncIdx, FuncType, GlobalType, Import, ImportDesc, MemIdx, MemoryType,
    TableIdx, TableType, TypeIdx, ValType,
};
use crate::error::LoadError;
use crate::value::Value;
use crate::vm::instructions::{Op, Scope};

/// `count` repetitions of a local of type `val_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LocalDecl {
    pub count: u32,
    pub val_type: ValType,
}

/// A decoded function body. The op vector is indexed by program counter and
/// `scopes[pc]` holds the matching `else`/`end` for every block, loop and if.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FuncBody {
    pub locals: Vec<LocalDecl>,
    pub ops: Vec<Op>,
    pub scopes: Vec<Option<Scope>>,
}

impl FuncBody {
    pub fn op(&self, pc: usize) -> Option<&Op> {
        self.ops.get(pc)
    }

    pub fn scope(&self, pc: usize) -> Option<Scope> {
        self.scopes.get(pc).copied().flatten()
    }

    /// Declared locals expanded one entry per slot, excluding parameters.
    pub fn local_types(&self) -> impl Iterator<Item = ValType> + '_ {
        self.locals
            .iter()
            .flat_map(|decl| std::iter::repeat(decl.val_type).take(decl.count as usize))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Global {
    pub ty: GlobalType,
    pub init: Value,
}

/// Active element segment: writes function indices into `table` at `offset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSegment {
    pub table: TableIdx,
    pub offset: Value,
    pub init: Vec<FuncIdx>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataMode {
    Active { memory: MemIdx, offset: Value },
    /// Only reachable through `memory.init`.
    Passive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSegment {
    pub mode: DataMode,
    pub init: Vec<u8>,
}

/// Decoded payload of one standard section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionContent {
    Type(Vec<FuncType>),
    Import(Vec<Import>),
    Function(Vec<TypeIdx>),
    Table(Vec<TableType>),
    Memory(Vec<MemoryType>),
    Global(Vec<Global>),
    Export(Vec<Export>),
    Start(FuncIdx),
    Element(Vec<ElementSegment>),
    DataCount(u32),
    Code(Vec<FuncBody>),
    Data(Vec<DataSegment>),
}

impl SectionContent {
    pub fn id(&self) -> u8 {
        match self {
            SectionContent::Type(_) => 1,
            SectionContent::Import(_) => 2,
            SectionContent::Function(_) => 3,
            SectionContent::Table(_) => 4,
            SectionContent::Memory(_) => 5,
            SectionContent::Global(_) => 6,
            SectionContent::Export(_) => 7,
            SectionContent::Start(_) => 8,
            SectionContent::Element(_) => 9,
            SectionContent::Code(_) => 10,
            SectionContent::Data(_) => 11,
            SectionContent::DataCount(_) => 12,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SectionContent::Type(_) => "type",
            SectionContent::Import(_) => "import",
            SectionContent::Function(_) => "function",
            SectionContent::Table(_) => "table",
            SectionContent::Memory(_) => "memory",
            SectionContent::Global(_) => "global",
            SectionContent::Export(_) => "export",
            SectionContent::Start(_) => "start",
            SectionContent::Element(_) => "element",
            SectionContent::Code(_) => "code",
            SectionContent::Data(_) => "data",
            SectionContent::DataCount(_) => "datacount",
        }
    }
}

/// A section together with where its payload sat in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub payload_offset: usize,
    pub payload_len: u32,
    pub content: SectionContent,
}

/// A decoded module. Immutable once built; instances share it through `Arc`.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub types: Vec<FuncType>,
    pub imports: Vec<Import>,
    /// Type index of each locally defined function, in definition order.
    pub func_type_indices: Vec<TypeIdx>,
    pub tables: Vec<TableType>,
    pub memories: Vec<MemoryType>,
    pub globals: Vec<Global>,
    pub exports: Vec<Export>,
    pub start: Option<FuncIdx>,
    pub elements: Vec<ElementSegment>,
    pub data_count: Option<u32>,
    pub codes: Vec<Arc<FuncBody>>,
    pub data: Vec<DataSegment>,

    pub imported_funcs: u32,
    pub imported_tables: u32,
    pub imported_memories: u32,
    pub imported_globals: u32,
}

impl Module {
    /// Assemble a module from its decoded sections and run the cross-section
    /// count checks.
    pub fn from_sections(sections: Vec<Section>) -> Result<Self, LoadError> {
        let mut module = Module::default();
        for section in sections {
            match section.content {
                SectionContent::Type(types) => module.types = types,
                SectionContent::Import(imports) => {
                    for imp in &imports {
                        match imp.desc {
                            ImportDesc::Func(_) => module.imported_funcs += 1,
                            ImportDesc::Table(_) => module.imported_tables += 1,
                            ImportDesc::Memory(_) => module.imported_memories += 1,
                            ImportDesc::Global(_) => module.imported_globals += 1,
                        }
                    }
                    module.imports = imports;
                }
                SectionContent::Function(indices) => module.func_type_indices = indices,
                SectionContent::Table(tables) => module.tables = tables,
                SectionContent::Memory(memories) => module.memories = memories,
                SectionContent::Global(globals) => module.globals = globals,
                SectionContent::Export(exports) => module.exports = exports,
                SectionContent::Start(idx) => module.start = Some(idx),
                SectionContent::Element(elements) => module.elements = elements,
                SectionContent::DataCount(n) => module.data_count = Some(n),
                SectionContent::Code(bodies) => {
                    module.codes = bodies.into_iter().map(Arc::new).collect();
                }
                SectionContent::Data(data) => module.data = data,
            }
        }

        if module.func_type_indices.len() != module.codes.len() {
            return Err(LoadError::FunctionCodeMismatch {
                functions: module.func_type_indices.len(),
                bodies: module.codes.len(),
            });
        }
        if let Some(declared) = module.data_count {
            if declared as usize != module.data.len() {
                return Err(LoadError::DataCountMismatch {
                    declared,
                    actual: module.data.len(),
                });
            }
        }
        Ok(module)
    }

    pub fn total_funcs(&self) -> u32 {
        self.imported_funcs + self.func_type_indices.len() as u32
    }

    pub fn total_tables(&self) -> u32 {
        self.imported_tables + self.tables.len() as u32
    }

    pub fn total_memories(&self) -> u32 {
        self.imported_memories + self.memories.len() as u32
    }

    pub fn total_globals(&self) -> u32 {
        self.imported_globals + self.globals.len() as u32
    }

    /// Type index of function `idx` in the combined (imports first) space.
    pub fn func_type_idx(&self, idx: FuncIdx) -> Option<TypeIdx> {
        if idx < self.imported_funcs {
            self.imports
                .iter()
                .filter_map(|imp| match imp.desc {
                    ImportDesc::Func(ty) => Some(ty),
                    _ => None,
                })
                .nth(idx as usize)
        } else {
            self.func_type_indices
                .get((idx - self.imported_funcs) as usize)
                .copied()
        }
    }

    pub fn func_type(&self, idx: FuncIdx) -> Option<&FuncType> {
        self.func_type_idx(idx)
            .and_then(|ty| self.types.get(ty as usize))
    }

    pub fn export(&self, name: &str) -> Option<ExportDesc> {
        self.exports
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.desc)
    }
}
