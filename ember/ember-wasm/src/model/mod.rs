//! Decoded module representation.

pub mod module;
pub mod types;

pub use module::{
    DataMode, DataSegment, ElementSegment, FuncBody, Global, LocalDecl, Module, Section,
    SectionContent,
};
pub use types::{
    BlockType, DataIdx, Export, ExportDesc, FuncIdx, FuncType, GlobalIdx, GlobalType, Import,
    ImportDesc, Limits, MemIdx, MemoryType, RefType, TableIdx, TableType, TypeIdx, ValType,
};
