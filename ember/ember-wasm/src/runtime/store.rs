//! All runtime state of one instance: functions, tables, memories, globals
//! and the data segments still available to `memory.init`.

use std::sync::Arc;

use super::{
    global::GlobalInstance, instances::FuncInstance, memory::MemoryInstance, table::TableInstance,
};
use crate::error::{EvalError, RuntimeError, Trap};
use crate::model::{DataIdx, FuncIdx, FuncType, GlobalIdx, MemIdx, TableIdx, TypeIdx};
use crate::value::Value;

#[derive(Debug, Default)]
pub struct Store {
    pub types: Vec<FuncType>,
    pub funcs: Vec<FuncInstance>,
    pub tables: Vec<TableInstance>,
    pub mems: Vec<MemoryInstance>,
    pub globals: Vec<GlobalInstance>,
    /// One entry per data segment; dropped and active segments are empty.
    pub datas: Vec<Arc<[u8]>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_func(&mut self, f: FuncInstance) -> FuncIdx {
        self.funcs.push(f);
        (self.funcs.len() - 1) as FuncIdx
    }

    pub fn alloc_table(&mut self, t: TableInstance) -> TableIdx {
        self.tables.push(t);
        (self.tables.len() - 1) as TableIdx
    }

    pub fn alloc_memory(&mut self, m: MemoryInstance) -> MemIdx {
        self.mems.push(m);
        (self.mems.len() - 1) as MemIdx
    }

    pub fn alloc_global(&mut self, g: GlobalInstance) -> GlobalIdx {
        self.globals.push(g);
        (self.globals.len() - 1) as GlobalIdx
    }

    pub fn alloc_data(&mut self, bytes: Arc<[u8]>) -> DataIdx {
        self.datas.push(bytes);
        (self.datas.len() - 1) as DataIdx
    }

    pub fn func_type(&self, idx: TypeIdx) -> Result<&FuncType, EvalError> {
        self.types.get(idx as usize).ok_or(EvalError::MissingType(idx))
    }

    pub fn func(&self, idx: FuncIdx) -> Result<&FuncInstance, EvalError> {
        self.funcs.get(idx as usize).ok_or(EvalError::MissingFunction(idx))
    }

    pub fn table(&self, idx: TableIdx) -> Result<&TableInstance, EvalError> {
        self.tables.get(idx as usize).ok_or(EvalError::MissingTable(idx))
    }

    pub fn memory(&self, idx: MemIdx) -> Result<&MemoryInstance, EvalError> {
        self.mems.get(idx as usize).ok_or(EvalError::MissingMemory(idx))
    }

    pub fn memory_mut(&mut self, idx: MemIdx) -> Result<&mut MemoryInstance, EvalError> {
        self.mems.get_mut(idx as usize).ok_or(EvalError::MissingMemory(idx))
    }

    pub fn global(&self, idx: GlobalIdx) -> Result<&GlobalInstance, EvalError> {
        self.globals.get(idx as usize).ok_or(EvalError::MissingGlobal(idx))
    }

    pub fn set_global(&mut self, idx: GlobalIdx, v: Value) -> Result<(), EvalError> {
        self.globals
            .get_mut(idx as usize)
            .ok_or(EvalError::MissingGlobal(idx))?
            .set(idx, v)
    }

    pub fn data(&self, idx: DataIdx) -> Result<&[u8], EvalError> {
        self.datas
            .get(idx as usize)
            .map(|d| &d[..])
            .ok_or(EvalError::MissingData(idx))
    }

    /// Release a data segment; later `memory.init` sees it as empty.
    pub fn drop_data(&mut self, idx: DataIdx) -> Result<(), EvalError> {
        let slot = self.datas.get_mut(idx as usize).ok_or(EvalError::MissingData(idx))?;
        *slot = Arc::from(&[][..]);
        Ok(())
    }

    /// Copy `len` bytes of data segment `data` starting at `src` into memory
    /// `mem` at `dst`.
    pub fn memory_init(
        &mut self,
        mem: MemIdx,
        data: DataIdx,
        dst: u64,
        src: u64,
        len: u64,
    ) -> Result<(), RuntimeError> {
        let bytes = self.datas.get(data as usize).ok_or(EvalError::MissingData(data))?;
        let chunk = src
            .checked_add(len)
            .filter(|&end| end <= bytes.len() as u64)
            .map(|end| &bytes[src as usize..end as usize])
            .ok_or(Trap::MemoryOutOfBounds { addr: src, len })?;
        let memory = self.mems.get_mut(mem as usize).ok_or(EvalError::MissingMemory(mem))?;
        memory.write(dst, chunk)?;
        Ok(())
    }
}
