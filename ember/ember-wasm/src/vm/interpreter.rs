//! Interpreter core: executes decoded function bodies against a `Store`.
//!
//! Control flow never recurses on the native stack. Each wasm call pushes a
//! `Frame` onto a heap vector and the dispatch loop always runs the top frame.
//! Structured control uses the scope map precomputed at decode time, so
//! `block`, `if` and `br` jump straight to their targets without scanning.

use std::sync::Arc;

use tracing::{trace, warn};

use super::frames::{Frame, Label, LabelKind};
use super::instructions::{Op, Opcode, Scope};
use super::numeric;
use super::stack::ValueStack;
use crate::config::Config;
use crate::error::{ArgumentError, EvalError, RuntimeError, Trap};
use crate::model::{BlockType, FuncBody, FuncIdx, RefType, TableIdx, TypeIdx, ValType};
use crate::runtime::{FuncInstance, Store};
use crate::value::Value;

type Res = Result<(), RuntimeError>;

const NO_FRAME: RuntimeError = RuntimeError::Internal("no active frame");

/// A single-use execution context borrowing the Store for one call.
pub struct Runtime<'s> {
    store: &'s mut Store,
    config: Config,
    stack: ValueStack,
    frames: Vec<Frame>,
}

impl<'s> Runtime<'s> {
    pub fn new(store: &'s mut Store, config: Config) -> Self {
        Self { store, config, stack: ValueStack::new(), frames: Vec::new() }
    }

    /// Call function `func` with `args` and run it to completion.
    pub fn invoke(&mut self, func: FuncIdx, args: &[Value]) -> Result<Option<Value>, RuntimeError> {
        let ty = self.store.func_type(self.store.func(func)?.type_idx())?;
        if args.len() != ty.params.len() {
            return Err(ArgumentError::Arity { expected: ty.params.len(), got: args.len() }.into());
        }
        for (index, (arg, &expected)) in args.iter().zip(&ty.params).enumerate() {
            if arg.ty() != expected {
                return Err(ArgumentError::Type { index, expected, found: arg.ty() }.into());
            }
        }
        if ty.results.len() > 1 {
            return Err(EvalError::Unsupported("multi-value results").into());
        }
        let result_ty = ty.results.first().copied();

        let base = self.stack.len();
        for &arg in args {
            self.stack.push(arg);
        }
        self.call(func, None)?;
        self.run()?;

        let result = result_ty.map(|t| self.stack.pop_typed(t)).transpose()?;
        self.stack.truncate(base);
        Ok(result)
    }

    fn run(&mut self) -> Res {
        while let Some(frame) = self.frames.last_mut() {
            let pc = frame.pc;
            frame.pc += 1;
            let body = Arc::clone(&frame.body);
            match body.op(pc) {
                Some(op) => self.step(&body, op, pc)?,
                None => self.return_from_frame()?,
            }
        }
        Ok(())
    }

    fn frame(&self) -> Result<&Frame, RuntimeError> {
        self.frames.last().ok_or(NO_FRAME)
    }

    fn frame_mut(&mut self) -> Result<&mut Frame, RuntimeError> {
        self.frames.last_mut().ok_or(NO_FRAME)
    }

    fn step(&mut self, body: &FuncBody, op: &Op, pc: usize) -> Res {
        use Opcode::*;
        match op.opcode {
            Unreachable => return Err(Trap::Unreachable.into()),
            Nop => {}

            Block => {
                let scope = scope_at(body, pc)?;
                let arity = self.block_arity(op.block_type()?)?;
                self.push_label(LabelKind::Block, scope.end_pc + 1, scope.end_pc, arity)?;
            }
            Loop => {
                let scope = scope_at(body, pc)?;
                let arity = self.block_arity(op.block_type()?)?;
                self.push_label(LabelKind::Loop, pc + 1, scope.end_pc, arity)?;
            }
            If => {
                let scope = scope_at(body, pc)?;
                let arity = self.block_arity(op.block_type()?)?;
                let cond = self.stack.pop_i32()?;
                if cond != 0 {
                    self.push_label(LabelKind::If, scope.end_pc + 1, scope.end_pc, arity)?;
                } else if let Some(else_pc) = scope.else_pc {
                    self.push_label(LabelKind::If, scope.end_pc + 1, scope.end_pc, arity)?;
                    self.frame_mut()?.pc = else_pc + 1;
                } else {
                    self.frame_mut()?.pc = scope.end_pc + 1;
                }
            }
            Else => {
                // Reached only by falling out of the then-arm.
                let label = self
                    .frame_mut()?
                    .labels
                    .pop()
                    .ok_or(RuntimeError::Internal("else without an open if"))?;
                self.stack.unwind(label.sp, label.arity)?;
                self.frame_mut()?.pc = label.end_pc + 1;
            }
            End => {
                let label = self.frame_mut()?.labels.pop();
                match label {
                    Some(label) => self.stack.unwind(label.sp, label.arity)?,
                    None => self.return_from_frame()?,
                }
            }
            Br => self.branch(op.u32_at(0)?)?,
            BrIf => {
                if self.stack.pop_i32()? != 0 {
                    self.branch(op.u32_at(0)?)?;
                }
            }
            BrTable => {
                let (targets, default) = op.label_table()?;
                let selector = self.stack.pop_i32()?;
                let level = targets.get(selector as usize).copied().unwrap_or(default);
                self.branch(level)?;
            }
            Return => self.return_from_frame()?,
            Call => self.call(op.u32_at(0)?, None)?,
            CallIndirect => self.call_indirect(op.u32_at(0)?, op.u32_at(1)?)?,

            Drop => {
                self.stack.pop()?;
            }
            Select => {
                let cond = self.stack.pop_i32()?;
                let rhs = self.stack.pop()?;
                let lhs = self.stack.pop()?;
                if lhs.ty() != rhs.ty() {
                    return Err(
                        EvalError::TypeMismatch { expected: lhs.ty(), found: rhs.ty() }.into()
                    );
                }
                self.stack.push(if cond != 0 { lhs } else { rhs });
            }

            LocalGet => {
                let idx = op.u32_at(0)?;
                let v = *self
                    .frame()?
                    .locals
                    .get(idx as usize)
                    .ok_or(EvalError::MissingLocal(idx))?;
                self.stack.push(v);
            }
            LocalSet => {
                let v = self.stack.pop()?;
                self.set_local(op.u32_at(0)?, v)?;
            }
            LocalTee => {
                let v = self.stack.pop()?;
                self.set_local(op.u32_at(0)?, v)?;
                self.stack.push(v);
            }
            GlobalGet => {
                let v = self.store.global(op.u32_at(0)?)?.get();
                self.stack.push(v);
            }
            GlobalSet => {
                let v = self.stack.pop()?;
                self.store.set_global(op.u32_at(0)?, v)?;
            }

            I32Load => self.load(op, ValType::I32, 4, false)?,
            I64Load => self.load(op, ValType::I64, 8, false)?,
            F32Load => self.load(op, ValType::F32, 4, false)?,
            F64Load => self.load(op, ValType::F64, 8, false)?,
            I32Load8S => self.load(op, ValType::I32, 1, true)?,
            I32Load8U => self.load(op, ValType::I32, 1, false)?,
            I32Load16S => self.load(op, ValType::I32, 2, true)?,
            I32Load16U => self.load(op, ValType::I32, 2, false)?,
            I64Load8S => self.load(op, ValType::I64, 1, true)?,
            I64Load8U => self.load(op, ValType::I64, 1, false)?,
            I64Load16S => self.load(op, ValType::I64, 2, true)?,
            I64Load16U => self.load(op, ValType::I64, 2, false)?,
            I64Load32S => self.load(op, ValType::I64, 4, true)?,
            I64Load32U => self.load(op, ValType::I64, 4, false)?,
            I32Store => self.store_mem(op, ValType::I32, 4)?,
            I64Store => self.store_mem(op, ValType::I64, 8)?,
            F32Store => self.store_mem(op, ValType::F32, 4)?,
            F64Store => self.store_mem(op, ValType::F64, 8)?,
            I32Store8 => self.store_mem(op, ValType::I32, 1)?,
            I32Store16 => self.store_mem(op, ValType::I32, 2)?,
            I64Store8 => self.store_mem(op, ValType::I64, 1)?,
            I64Store16 => self.store_mem(op, ValType::I64, 2)?,
            I64Store32 => self.store_mem(op, ValType::I64, 4)?,

            MemorySize => {
                self.check_reserved(op, 0)?;
                let pages = self.store.memory(0)?.size_pages();
                self.stack.push(Value::I32(pages));
            }
            MemoryGrow => {
                self.check_reserved(op, 0)?;
                let delta = self.stack.pop_i32()?;
                let prev = self.store.memory_mut(0)?.grow(delta).unwrap_or(u32::MAX);
                self.stack.push(Value::I32(prev));
            }
            MemoryInit => {
                self.check_reserved(op, 1)?;
                let len = self.stack.pop_i32()?;
                let src = self.stack.pop_i32()?;
                let dst = self.stack.pop_i32()?;
                self.store.memory_init(
                    0,
                    op.u32_at(0)?,
                    u64::from(dst),
                    u64::from(src),
                    u64::from(len),
                )?;
            }
            DataDrop => self.store.drop_data(op.u32_at(0)?)?,
            MemoryCopy => {
                self.check_reserved(op, 0)?;
                self.check_reserved(op, 1)?;
                let len = self.stack.pop_i32()?;
                let src = self.stack.pop_i32()?;
                let dst = self.stack.pop_i32()?;
                self.store.memory_mut(0)?.copy_within(
                    u64::from(dst),
                    u64::from(src),
                    u64::from(len),
                )?;
            }
            MemoryFill => {
                self.check_reserved(op, 0)?;
                let len = self.stack.pop_i32()?;
                let byte = self.stack.pop_i32()?;
                let dst = self.stack.pop_i32()?;
                self.store
                    .memory_mut(0)?
                    .fill(u64::from(dst), byte as u8, u64::from(len))?;
            }

            I32Const => self.stack.push(Value::i32(op.i32_imm()?)),
            I64Const => self.stack.push(Value::i64(op.i64_imm()?)),
            F32Const => self.stack.push(Value::F32(op.f32_bits()?)),
            F64Const => self.stack.push(Value::F64(op.f64_bits()?)),

            other => numeric::exec(other, &mut self.stack)?,
        }
        Ok(())
    }

    fn block_arity(&self, bt: BlockType) -> Result<usize, RuntimeError> {
        match bt {
            BlockType::Empty => Ok(0),
            BlockType::Value(_) => Ok(1),
            BlockType::TypeIndex(idx) => {
                let ty = self.store.func_type(idx)?;
                if !ty.params.is_empty() || ty.results.len() > 1 {
                    return Err(EvalError::Unsupported("multi-value block types").into());
                }
                Ok(ty.results.len())
            }
        }
    }

    fn push_label(
        &mut self,
        kind: LabelKind,
        target_pc: usize,
        end_pc: usize,
        arity: usize,
    ) -> Res {
        let sp = self.stack.len();
        self.frame_mut()?.labels.push(Label { kind, target_pc, end_pc, sp, arity });
        Ok(())
    }

    /// Branch to the label `level` entries out. The label count itself names
    /// the function body.
    fn branch(&mut self, level: u32) -> Res {
        let frame = self.frames.last_mut().ok_or(NO_FRAME)?;
        let depth = frame.labels.len();
        let level_idx = level as usize;
        if level_idx == depth {
            return self.return_from_frame();
        }
        if level_idx > depth {
            return Err(EvalError::InvalidBranch { level, depth }.into());
        }
        let at = depth - 1 - level_idx;
        let label = frame.labels[at];
        // A loop keeps its label so the next iteration runs inside it.
        let keep = if label.kind == LabelKind::Loop { at + 1 } else { at };
        frame.labels.truncate(keep);
        frame.pc = label.target_pc;
        self.stack.unwind(label.sp, label.branch_arity())?;
        Ok(())
    }

    fn return_from_frame(&mut self) -> Res {
        let frame = self.frames.pop().ok_or(NO_FRAME)?;
        self.stack.unwind(frame.sp, frame.arity)?;
        Ok(())
    }

    fn set_local(&mut self, idx: u32, v: Value) -> Res {
        let slot = self
            .frame_mut()?
            .locals
            .get_mut(idx as usize)
            .ok_or(EvalError::MissingLocal(idx))?;
        if slot.ty() != v.ty() {
            return Err(EvalError::TypeMismatch { expected: slot.ty(), found: v.ty() }.into());
        }
        *slot = v;
        Ok(())
    }

    /// Pop and type-check the arguments for a call to a function of type `ty`.
    fn pop_args(&mut self, ty: TypeIdx) -> Result<Vec<Value>, RuntimeError> {
        let count = self.store.func_type(ty)?.params.len();
        let args = self.stack.pop_n(count)?;
        let params = &self.store.func_type(ty)?.params;
        for (arg, &expected) in args.iter().zip(params) {
            if arg.ty() != expected {
                return Err(EvalError::TypeMismatch { expected, found: arg.ty() }.into());
            }
        }
        Ok(args)
    }

    /// Call `idx`. `signature` is the call-site type of an indirect call and
    /// must match the callee structurally.
    fn call(&mut self, idx: FuncIdx, signature: Option<TypeIdx>) -> Res {
        let func = self.store.func(idx)?.clone();
        let ty = func.type_idx();
        if let Some(sig) = signature {
            if self.store.func_type(sig)? != self.store.func_type(ty)? {
                return Err(Trap::IndirectCallTypeMismatch.into());
            }
        }
        let arity = self.store.func_type(ty)?.results.len();
        if arity > 1 {
            return Err(EvalError::Unsupported("multi-value results").into());
        }

        match func {
            FuncInstance::Wasm { body, .. } => {
                let depth = self.frames.len();
                if depth >= self.config.max_call_depth {
                    return Err(Trap::CallStackExhausted { depth }.into());
                }
                let mut locals = self.pop_args(ty)?;
                locals.extend(body.local_types().map(Value::zero));
                let sp = self.stack.len();
                self.frames.push(Frame::new(body, sp, arity, locals));
            }
            FuncInstance::Host { f, .. } => {
                let args = self.pop_args(ty)?;
                trace!(func = idx, args = args.len(), "calling host function");
                let ret = f(&mut *self.store, &args)?;
                self.push_host_result(ty, ret)?;
            }
        }
        Ok(())
    }

    fn push_host_result(&mut self, ty: TypeIdx, ret: Option<Value>) -> Res {
        let results = &self.store.func_type(ty)?.results;
        match (results.as_slice(), ret) {
            ([], None) => {}
            ([expected], Some(v)) if v.ty() == *expected => self.stack.push(v),
            ([expected], Some(v)) => {
                return Err(EvalError::TypeMismatch { expected: *expected, found: v.ty() }.into())
            }
            (expected, ret) => {
                return Err(EvalError::HostResultArity {
                    expected: expected.len(),
                    found: usize::from(ret.is_some()),
                }
                .into())
            }
        }
        Ok(())
    }

    fn call_indirect(&mut self, ty: TypeIdx, table_idx: TableIdx) -> Res {
        let index = self.stack.pop_i32()?;
        let table = self.store.table(table_idx)?;
        if table.kind() != RefType::FuncRef {
            return Err(EvalError::ElementKind { table: table_idx, found: table.kind() }.into());
        }
        let func = table.get(index)?.ok_or(Trap::UninitializedElement { index })?;
        self.call(func, Some(ty))
    }

    fn effective_addr(&mut self, op: &Op) -> Result<u64, RuntimeError> {
        let base = self.stack.pop_i32()?;
        Ok(u64::from(base) + u64::from(op.mem_offset()?))
    }

    fn load(&mut self, op: &Op, ty: ValType, width: usize, signed: bool) -> Res {
        let addr = self.effective_addr(op)?;
        let v = self.store.memory(0)?.load(addr, ty, width, signed)?;
        self.stack.push(v);
        Ok(())
    }

    fn store_mem(&mut self, op: &Op, ty: ValType, width: usize) -> Res {
        let v = self.stack.pop_typed(ty)?;
        let addr = self.effective_addr(op)?;
        self.store.memory_mut(0)?.store(addr, v, width)?;
        Ok(())
    }

    fn check_reserved(&self, op: &Op, at: usize) -> Res {
        let byte = op.u8_at(at)?;
        if byte != 0 {
            let opcode = op.opcode.mnemonic();
            if self.config.strict_reserved_bytes {
                return Err(EvalError::ReservedByte { opcode, byte }.into());
            }
            warn!(opcode, byte, "ignoring non-zero reserved byte");
        }
        Ok(())
    }
}

fn scope_at(body: &FuncBody, pc: usize) -> Result<Scope, RuntimeError> {
    body.scope(pc).ok_or(RuntimeError::Internal("missing scope for structured instruction"))
}
