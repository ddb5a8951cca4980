//! Call frames and structured-control labels.

use std::sync::Arc;

use crate::model::FuncBody;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    Block,
    Loop,
    If,
}

/// An entered block, loop or if.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label {
    pub kind: LabelKind,
    /// Where a branch to this label continues: the loop body start, or just
    /// past the matching `end`.
    pub target_pc: usize,
    pub end_pc: usize,
    /// Stack height when the label was entered.
    pub sp: usize,
    /// Values left on the stack when control leaves through `end`.
    pub arity: usize,
}

impl Label {
    /// Values carried by a branch to this label. Loops take their parameters,
    /// which are always empty here.
    pub fn branch_arity(&self) -> usize {
        match self.kind {
            LabelKind::Loop => 0,
            LabelKind::Block | LabelKind::If => self.arity,
        }
    }
}

/// Activation of a module-defined function.
#[derive(Debug)]
pub struct Frame {
    pub pc: usize,
    /// Stack height below the arguments.
    pub sp: usize,
    pub body: Arc<FuncBody>,
    pub arity: usize,
    pub locals: Vec<Value>,
    pub labels: Vec<Label>,
}

impl Frame {
    pub fn new(body: Arc<FuncBody>, sp: usize, arity: usize, locals: Vec<Value>) -> Self {
        Self { pc: 0, sp, body, arity, locals, labels: Vec::new() }
    }
}
