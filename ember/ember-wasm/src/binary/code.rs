//! Function bodies: locals declarations, instruction decoding and the scope
//! map that pairs every structured instruction with its `else`/`end`.

use tracing::warn;

use super::{cursor::Cursor, leb128, reader::read_vec, BinaryReadError};
use crate::error::DecodeError;
use crate::model::{BlockType, FuncBody, LocalDecl, ValType};
use crate::vm::instructions::{Namespace, Op, Opcode, Operand, Scope, Shape};

/// Upper bound on declared locals per function, parameters excluded.
pub const MAX_LOCALS: u64 = 50_000;

const EXT_PREFIX: u8 = 0xFC;

/// `0x40`, a value type byte, or a non-negative s33 type index.
pub fn read_block_type(cur: &mut Cursor) -> Result<BlockType, BinaryReadError> {
    let b = cur.peek_u8()?;
    if b == 0x40 {
        cur.read_u8()?;
        return Ok(BlockType::Empty);
    }
    if let Some(ty) = ValType::from_byte(b) {
        cur.read_u8()?;
        return Ok(BlockType::Value(ty));
    }
    let offset = cur.offset();
    let idx = leb128::read_sleb_s33(cur)?;
    u32::try_from(idx)
        .map(BlockType::TypeIndex)
        .map_err(|_| BinaryReadError::Malformed { offset, msg: "invalid block type" })
}

fn read_operands(cur: &mut Cursor, shape: Shape) -> Result<Vec<Operand>, BinaryReadError> {
    let uleb = |c: &mut Cursor| leb128::read_uleb_u32(c).map(Operand::U32);
    Ok(match shape {
        Shape::None => Vec::new(),
        Shape::BlockType => vec![Operand::Block(read_block_type(cur)?)],
        Shape::Label | Shape::Index => vec![uleb(cur)?],
        Shape::LabelTable => {
            let targets = read_vec(cur, |c| leb128::read_uleb_u32(c))?;
            let default = uleb(cur)?;
            vec![Operand::U32Vec(targets), default]
        }
        Shape::CallIndirect | Shape::MemArg => vec![uleb(cur)?, uleb(cur)?],
        Shape::Reserved1 => vec![Operand::U8(cur.read_u8()?)],
        Shape::Reserved2 => vec![Operand::U8(cur.read_u8()?), Operand::U8(cur.read_u8()?)],
        Shape::I32 => vec![Operand::I32(leb128::read_sleb_i32(cur)?)],
        Shape::I64 => vec![Operand::I64(leb128::read_sleb_i64(cur)?)],
        Shape::F32 => vec![Operand::F32(cur.read_u32_le()?)],
        Shape::F64 => vec![Operand::F64(cur.read_u64_le()?)],
        Shape::MemInit => vec![uleb(cur)?, Operand::U8(cur.read_u8()?)],
    })
}

/// Decode one instruction and its immediates.
pub fn decode_op(cur: &mut Cursor) -> Result<Op, DecodeError> {
    let offset = cur.offset();
    let byte = cur.read_u8()?;
    let opcode = if byte == EXT_PREFIX {
        let sub = leb128::read_uleb_u32(cur)?;
        Opcode::lookup(Namespace::Ext, sub).ok_or(DecodeError::UnknownExtended { sub, offset })?
    } else {
        Opcode::lookup(Namespace::Core, u32::from(byte))
            .ok_or(DecodeError::UnknownOpcode { byte, offset })?
    };
    let operands = read_operands(cur, opcode.shape()).map_err(|source| DecodeError::Operand {
        opcode: opcode.mnemonic(),
        source,
    })?;
    Ok(Op { opcode, operands })
}

/// Decode instructions until the cursor is exhausted.
pub fn decode_ops_from(cur: &mut Cursor) -> Result<Vec<Op>, DecodeError> {
    let mut ops = Vec::new();
    while !cur.is_eof() {
        ops.push(decode_op(cur)?);
    }
    Ok(ops)
}

pub fn decode_ops(bytes: &[u8]) -> Result<Vec<Op>, DecodeError> {
    decode_ops_from(&mut Cursor::new(bytes))
}

/// Pair each `block`/`loop`/`if` with its `else` and `end`. The body must be
/// closed by a final `end` with nothing after it.
pub fn build_scopes(ops: &[Op]) -> Result<Vec<Option<Scope>>, DecodeError> {
    let mut scopes = vec![None; ops.len()];
    // (opening pc, else pc)
    let mut open: Vec<(usize, Option<usize>)> = Vec::new();
    let mut closed = false;

    for (pc, op) in ops.iter().enumerate() {
        if closed {
            return Err(DecodeError::Unbalanced { pc });
        }
        match op.opcode {
            Opcode::Block | Opcode::Loop | Opcode::If => open.push((pc, None)),
            Opcode::Else => match open.last_mut() {
                Some((start, else_pc @ None)) if ops[*start].opcode == Opcode::If => {
                    *else_pc = Some(pc);
                }
                _ => return Err(DecodeError::StrayElse { pc }),
            },
            Opcode::End => match open.pop() {
                Some((start, else_pc)) => {
                    scopes[start] = Some(Scope { else_pc, end_pc: pc });
                }
                None => closed = true,
            },
            _ => {}
        }
    }

    match open.last() {
        Some(&(pc, _)) => Err(DecodeError::Unbalanced { pc }),
        None if !closed => Err(DecodeError::MissingEnd),
        None => Ok(scopes),
    }
}

/// Decode a function body from a cursor bounded to exactly that body.
pub fn read_func_body(cur: &mut Cursor) -> Result<FuncBody, DecodeError> {
    let groups = leb128::read_uleb_u32(cur)?;
    let mut locals = Vec::with_capacity((groups as usize).min(cur.remaining()));
    let mut total: u64 = 0;
    for _ in 0..groups {
        let count = leb128::read_uleb_u32(cur)?;
        total += u64::from(count);
        if total > MAX_LOCALS {
            return Err(DecodeError::TooManyLocals { count: total });
        }
        let offset = cur.offset();
        let byte = cur.read_u8()?;
        let val_type = ValType::from_byte(byte).unwrap_or_else(|| {
            warn!(byte, offset, "unknown local type, treating as i32");
            ValType::I32
        });
        locals.push(LocalDecl { count, val_type });
    }

    let ops = decode_ops_from(cur)?;
    let scopes = build_scopes(&ops)?;
    Ok(FuncBody { locals, ops, scopes })
}
