//! Table instance. Slots hold nullable function indices into the Store.

use std::collections::TryReserveError;

use crate::error::Trap;
use crate::model::{FuncIdx, RefType, TableType};

#[derive(Debug, Clone)]
pub struct TableInstance {
    kind: RefType,
    elems: Vec<Option<FuncIdx>>,
}

impl TableInstance {
    /// Allocate `ty.limits.min` null slots. The linker caps the minimum; the
    /// allocation itself may still fail on a constrained host.
    pub fn new(ty: &TableType) -> Result<Self, TryReserveError> {
        let len = ty.limits.min as usize;
        let mut elems = Vec::new();
        elems.try_reserve_exact(len)?;
        elems.resize(len, None);
        Ok(Self {
            kind: ty.elem,
            elems,
        })
    }

    pub fn kind(&self) -> RefType {
        self.kind
    }

    pub fn size(&self) -> u32 {
        self.elems.len() as u32
    }

    pub fn get(&self, index: u32) -> Result<Option<FuncIdx>, Trap> {
        self.elems
            .get(index as usize)
            .copied()
            .ok_or(Trap::TableOutOfBounds { index })
    }

    pub fn set(&mut self, index: u32, func: Option<FuncIdx>) -> Result<(), Trap> {
        let slot = self
            .elems
            .get_mut(index as usize)
            .ok_or(Trap::TableOutOfBounds { index })?;
        *slot = func;
        Ok(())
    }

    /// Write `funcs` starting at `offset`. Nothing is written unless the
    /// whole run fits.
    pub fn init(&mut self, offset: u32, funcs: &[FuncIdx]) -> Result<(), Trap> {
        let start = offset as usize;
        let end = start
            .checked_add(funcs.len())
            .filter(|&end| end <= self.elems.len())
            .ok_or(Trap::TableOutOfBounds { index: offset })?;
        for (slot, &f) in self.elems[start..end].iter_mut().zip(funcs) {
            *slot = Some(f);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Limits;

    fn table(min: u32) -> TableInstance {
        TableInstance::new(&TableType { elem: RefType::FuncRef, limits: Limits::new(min, None) })
            .unwrap()
    }

    #[test]
    fn slots_start_null() {
        let t = table(3);
        assert_eq!(t.size(), 3);
        assert_eq!(t.get(0), Ok(None));
        assert_eq!(t.get(3), Err(Trap::TableOutOfBounds { index: 3 }));
    }

    #[test]
    fn init_is_all_or_nothing() {
        let mut t = table(3);
        assert!(t.init(2, &[7, 8]).is_err());
        assert_eq!(t.get(2), Ok(None));
        t.init(1, &[7, 8]).unwrap();
        assert_eq!(t.get(1), Ok(Some(7)));
        assert_eq!(t.get(2), Ok(Some(8)));
        t.set(1, None).unwrap();
        assert_eq!(t.get(1), Ok(None));
    }
}
