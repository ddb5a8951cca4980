//! Decoded instruction set: the closed opcode table, operand shapes and the
//! `Op` records the interpreter dispatches on.

use crate::error::EvalError;
use crate::model::BlockType;

/// Opcode space. `Ext` holds the 0xFC-prefixed family addressed by a ULEB
/// sub-opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Core,
    Ext,
}

/// Which immediates follow an opcode in the binary encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    None,
    BlockType,
    Label,
    LabelTable,
    Index,
    /// Type index then table index.
    CallIndirect,
    /// Alignment hint then offset.
    MemArg,
    Reserved1,
    Reserved2,
    I32,
    I64,
    F32,
    F64,
    /// Data index then one reserved byte.
    MemInit,
}

macro_rules! opcodes {
    ($( $ns:ident $code:literal $name:ident $mnemonic:literal $shape:ident; )*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Opcode {
            $( $name, )*
        }

        impl Opcode {
            pub fn lookup(ns: Namespace, code: u32) -> Option<Self> {
                match (ns, code) {
                    $( (Namespace::$ns, $code) => Some(Opcode::$name), )*
                    _ => None,
                }
            }

            pub const fn namespace(self) -> Namespace {
                match self {
                    $( Opcode::$name => Namespace::$ns, )*
                }
            }

            pub const fn code(self) -> u32 {
                match self {
                    $( Opcode::$name => $code, )*
                }
            }

            pub const fn mnemonic(self) -> &'static str {
                match self {
                    $( Opcode::$name => $mnemonic, )*
                }
            }

            pub const fn shape(self) -> Shape {
                match self {
                    $( Opcode::$name => Shape::$shape, )*
                }
            }
        }
    };
}

opcodes! {
    Core 0x00 Unreachable "unreachable" None;
    Core 0x01 Nop "nop" None;
    Core 0x02 Block "block" BlockType;
    Core 0x03 Loop "loop" BlockType;
    Core 0x04 If "if" BlockType;
    Core 0x05 Else "else" None;
    Core 0x0B End "end" None;
    Core 0x0C Br "br" Label;
    Core 0x0D BrIf "br_if" Label;
    Core 0x0E BrTable "br_table" LabelTable;
    Core 0x0F Return "return" None;
    Core 0x10 Call "call" Index;
    Core 0x11 CallIndirect "call_indirect" CallIndirect;

    Core 0x1A Drop "drop" None;
    Core 0x1B Select "select" None;

    Core 0x20 LocalGet "local.get" Index;
    Core 0x21 LocalSet "local.set" Index;
    Core 0x22 LocalTee "local.tee" Index;
    Core 0x23 GlobalGet "global.get" Index;
    Core 0x24 GlobalSet "global.set" Index;

    Core 0x28 I32Load "i32.load" MemArg;
    Core 0x29 I64Load "i64.load" MemArg;
    Core 0x2A F32Load "f32.load" MemArg;
    Core 0x2B F64Load "f64.load" MemArg;
    Core 0x2C I32Load8S "i32.load8_s" MemArg;
    Core 0x2D I32Load8U "i32.load8_u" MemArg;
    Core 0x2E I32Load16S "i32.load16_s" MemArg;
    Core 0x2F I32Load16U "i32.load16_u" MemArg;
    Core 0x30 I64Load8S "i64.load8_s" MemArg;
    Core 0x31 I64Load8U "i64.load8_u" MemArg;
    Core 0x32 I64Load16S "i64.load16_s" MemArg;
    Core 0x33 I64Load16U "i64.load16_u" MemArg;
    Core 0x34 I64Load32S "i64.load32_s" MemArg;
    Core 0x35 I64Load32U "i64.load32_u" MemArg;
    Core 0x36 I32Store "i32.store" MemArg;
    Core 0x37 I64Store "i64.store" MemArg;
    Core 0x38 F32Store "f32.store" MemArg;
    Core 0x39 F64Store "f64.store" MemArg;
    Core 0x3A I32Store8 "i32.store8" MemArg;
    Core 0x3B I32Store16 "i32.store16" MemArg;
    Core 0x3C I64Store8 "i64.store8" MemArg;
    Core 0x3D I64Store16 "i64.store16" MemArg;
    Core 0x3E I64Store32 "i64.store32" MemArg;
    Core 0x3F MemorySize "memory.size" Reserved1;
    Core 0x40 MemoryGrow "memory.grow" Reserved1;

    Core 0x41 I32Const "i32.const" I32;
    Core 0x42 I64Const "i64.const" I64;
    Core 0x43 F32Const "f32.const" F32;
    Core 0x44 F64Const "f64.const" F64;

    Core 0x45 I32Eqz "i32.eqz" None;
    Core 0x46 I32Eq "i32.eq" None;
    Core 0x47 I32Ne "i32.ne" None;
    Core 0x48 I32LtS "i32.lt_s" None;
    Core 0x49 I32LtU "i32.lt_u" None;
    Core 0x4A I32GtS "i32.gt_s" None;
    Core 0x4B I32GtU "i32.gt_u" None;
    Core 0x4C I32LeS "i32.le_s" None;
    Core 0x4D I32LeU "i32.le_u" None;
    Core 0x4E I32GeS "i32.ge_s" None;
    Core 0x4F I32GeU "i32.ge_u" None;

    Core 0x50 I64Eqz "i64.eqz" None;
    Core 0x51 I64Eq "i64.eq" None;
    Core 0x52 I64Ne "i64.ne" None;
    Core 0x53 I64LtS "i64.lt_s" None;
    Core 0x54 I64LtU "i64.lt_u" None;
    Core 0x55 I64GtS "i64.gt_s" None;
    Core 0x56 I64GtU "i64.gt_u" None;
    Core 0x57 I64LeS "i64.le_s" None;
    Core 0x58 I64LeU "i64.le_u" None;
    Core 0x59 I64GeS "i64.ge_s" None;
    Core 0x5A I64GeU "i64.ge_u" None;

    Core 0x5B F32Eq "f32.eq" None;
    Core 0x5C F32Ne "f32.ne" None;
    Core 0x5D F32Lt "f32.lt" None;
    Core 0x5E F32Gt "f32.gt" None;
    Core 0x5F F32Le "f32.le" None;
    Core 0x60 F32Ge "f32.ge" None;

    Core 0x61 F64Eq "f64.eq" None;
    Core 0x62 F64Ne "f64.ne" None;
    Core 0x63 F64Lt "f64.lt" None;
    Core 0x64 F64Gt "f64.gt" None;
    Core 0x65 F64Le "f64.le" None;
    Core 0x66 F64Ge "f64.ge" None;

    Core 0x67 I32Clz "i32.clz" None;
    Core 0x68 I32Ctz "i32.ctz" None;
    Core 0x69 I32Popcnt "i32.popcnt" None;
    Core 0x6A I32Add "i32.add" None;
    Core 0x6B I32Sub "i32.sub" None;
    Core 0x6C I32Mul "i32.mul" None;
    Core 0x6D I32DivS "i32.div_s" None;
    Core 0x6E I32DivU "i32.div_u" None;
    Core 0x6F I32RemS "i32.rem_s" None;
    Core 0x70 I32RemU "i32.rem_u" None;
    Core 0x71 I32And "i32.and" None;
    Core 0x72 I32Or "i32.or" None;
    Core 0x73 I32Xor "i32.xor" None;
    Core 0x74 I32Shl "i32.shl" None;
    Core 0x75 I32ShrS "i32.shr_s" None;
    Core 0x76 I32ShrU "i32.shr_u" None;
    Core 0x77 I32Rotl "i32.rotl" None;
    Core 0x78 I32Rotr "i32.rotr" None;

    Core 0x79 I64Clz "i64.clz" None;
    Core 0x7A I64Ctz "i64.ctz" None;
    Core 0x7B I64Popcnt "i64.popcnt" None;
    Core 0x7C I64Add "i64.add" None;
    Core 0x7D I64Sub "i64.sub" None;
    Core 0x7E I64Mul "i64.mul" None;
    Core 0x7F I64DivS "i64.div_s" None;
    Core 0x80 I64DivU "i64.div_u" None;
    Core 0x81 I64RemS "i64.rem_s" None;
    Core 0x82 I64RemU "i64.rem_u" None;
    Core 0x83 I64And "i64.and" None;
    Core 0x84 I64Or "i64.or" None;
    Core 0x85 I64Xor "i64.xor" None;
    Core 0x86 I64Shl "i64.shl" None;
    Core 0x87 I64ShrS "i64.shr_s" None;
    Core 0x88 I64ShrU "i64.shr_u" None;
    Core 0x89 I64Rotl "i64.rotl" None;
    Core 0x8A I64Rotr "i64.rotr" None;

    Core 0x8B F32Abs "f32.abs" None;
    Core 0x8C F32Neg "f32.neg" None;
    Core 0x8D F32Ceil "f32.ceil" None;
    Core 0x8E F32Floor "f32.floor" None;
    Core 0x8F F32Trunc "f32.trunc" None;
    Core 0x90 F32Nearest "f32.nearest" None;
    Core 0x91 F32Sqrt "f32.sqrt" None;
    Core 0x92 F32Add "f32.add" None;
    Core 0x93 F32Sub "f32.sub" None;
    Core 0x94 F32Mul "f32.mul" None;
    Core 0x95 F32Div "f32.div" None;
    Core 0x96 F32Min "f32.min" None;
    Core 0x97 F32Max "f32.max" None;
    Core 0x98 F32Copysign "f32.copysign" None;

    Core 0x99 F64Abs "f64.abs" None;
    Core 0x9A F64Neg "f64.neg" None;
    Core 0x9B F64Ceil "f64.ceil" None;
    Core 0x9C F64Floor "f64.floor" None;
    Core 0x9D F64Trunc "f64.trunc" None;
    Core 0x9E F64Nearest "f64.nearest" None;
    Core 0x9F F64Sqrt "f64.sqrt" None;
    Core 0xA0 F64Add "f64.add" None;
    Core 0xA1 F64Sub "f64.sub" None;
    Core 0xA2 F64Mul "f64.mul" None;
    Core 0xA3 F64Div "f64.div" None;
    Core 0xA4 F64Min "f64.min" None;
    Core 0xA5 F64Max "f64.max" None;
    Core 0xA6 F64Copysign "f64.copysign" None;

    Core 0xA7 I32WrapI64 "i32.wrap_i64" None;
    Core 0xA8 I32TruncF32S "i32.trunc_f32_s" None;
    Core 0xA9 I32TruncF32U "i32.trunc_f32_u" None;
    Core 0xAA I32TruncF64S "i32.trunc_f64_s" None;
    Core 0xAB I32TruncF64U "i32.trunc_f64_u" None;
    Core 0xAC I64ExtendI32S "i64.extend_i32_s" None;
    Core 0xAD I64ExtendI32U "i64.extend_i32_u" None;
    Core 0xAE I64TruncF32S "i64.trunc_f32_s" None;
    Core 0xAF I64TruncF32U "i64.trunc_f32_u" None;
    Core 0xB0 I64TruncF64S "i64.trunc_f64_s" None;
    Core 0xB1 I64TruncF64U "i64.trunc_f64_u" None;
    Core 0xB2 F32ConvertI32S "f32.convert_i32_s" None;
    Core 0xB3 F32ConvertI32U "f32.convert_i32_u" None;
    Core 0xB4 F32ConvertI64S "f32.convert_i64_s" None;
    Core 0xB5 F32ConvertI64U "f32.convert_i64_u" None;
    Core 0xB6 F32DemoteF64 "f32.demote_f64" None;
    Core 0xB7 F64ConvertI32S "f64.convert_i32_s" None;
    Core 0xB8 F64ConvertI32U "f64.convert_i32_u" None;
    Core 0xB9 F64ConvertI64S "f64.convert_i64_s" None;
    Core 0xBA F64ConvertI64U "f64.convert_i64_u" None;
    Core 0xBB F64PromoteF32 "f64.promote_f32" None;
    Core 0xBC I32ReinterpretF32 "i32.reinterpret_f32" None;
    Core 0xBD I64ReinterpretF64 "i64.reinterpret_f64" None;
    Core 0xBE F32ReinterpretI32 "f32.reinterpret_i32" None;
    Core 0xBF F64ReinterpretI64 "f64.reinterpret_i64" None;

    Core 0xC0 I32Extend8S "i32.extend8_s" None;
    Core 0xC1 I32Extend16S "i32.extend16_s" None;
    Core 0xC2 I64Extend8S "i64.extend8_s" None;
    Core 0xC3 I64Extend16S "i64.extend16_s" None;
    Core 0xC4 I64Extend32S "i64.extend32_s" None;

    Ext 0 I32TruncSatF32S "i32.trunc_sat_f32_s" None;
    Ext 1 I32TruncSatF32U "i32.trunc_sat_f32_u" None;
    Ext 2 I32TruncSatF64S "i32.trunc_sat_f64_s" None;
    Ext 3 I32TruncSatF64U "i32.trunc_sat_f64_u" None;
    Ext 4 I64TruncSatF32S "i64.trunc_sat_f32_s" None;
    Ext 5 I64TruncSatF32U "i64.trunc_sat_f32_u" None;
    Ext 6 I64TruncSatF64S "i64.trunc_sat_f64_s" None;
    Ext 7 I64TruncSatF64U "i64.trunc_sat_f64_u" None;
    Ext 8 MemoryInit "memory.init" MemInit;
    Ext 9 DataDrop "data.drop" Index;
    Ext 10 MemoryCopy "memory.copy" Reserved2;
    Ext 11 MemoryFill "memory.fill" Reserved1;
}

/// Immediate operand carried by an `Op`. Float constants keep their raw bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    U8(u8),
    U32(u32),
    U32Vec(Vec<u32>),
    I32(i32),
    I64(i64),
    F32(u32),
    F64(u64),
    Block(BlockType),
}

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Op {
    pub opcode: Opcode,
    pub operands: Vec<Operand>,
}

/// Matching `else` and `end` positions of a block, loop or if.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope {
    pub else_pc: Option<usize>,
    pub end_pc: usize,
}

impl Op {
    pub fn new(opcode: Opcode, operands: Vec<Operand>) -> Self {
        Self { opcode, operands }
    }

    fn malformed(&self) -> EvalError {
        EvalError::MalformedOperands { opcode: self.opcode.mnemonic() }
    }

    pub fn u32_at(&self, i: usize) -> Result<u32, EvalError> {
        match self.operands.get(i) {
            Some(Operand::U32(v)) => Ok(*v),
            _ => Err(self.malformed()),
        }
    }

    pub fn u8_at(&self, i: usize) -> Result<u8, EvalError> {
        match self.operands.get(i) {
            Some(Operand::U8(v)) => Ok(*v),
            _ => Err(self.malformed()),
        }
    }

    pub fn block_type(&self) -> Result<BlockType, EvalError> {
        match self.operands.first() {
            Some(Operand::Block(bt)) => Ok(*bt),
            _ => Err(self.malformed()),
        }
    }

    /// `br_table` targets and the default label.
    pub fn label_table(&self) -> Result<(&[u32], u32), EvalError> {
        match self.operands.as_slice() {
            [Operand::U32Vec(targets), Operand::U32(default)] => Ok((targets, *default)),
            _ => Err(self.malformed()),
        }
    }

    /// Static offset of a memory access; the alignment hint is ignored.
    pub fn mem_offset(&self) -> Result<u32, EvalError> {
        self.u32_at(1)
    }

    pub fn i32_imm(&self) -> Result<i32, EvalError> {
        match self.operands.first() {
            Some(Operand::I32(v)) => Ok(*v),
            _ => Err(self.malformed()),
        }
    }

    pub fn i64_imm(&self) -> Result<i64, EvalError> {
        match self.operands.first() {
            Some(Operand::I64(v)) => Ok(*v),
            _ => Err(self.malformed()),
        }
    }

    pub fn f32_bits(&self) -> Result<u32, EvalError> {
        match self.operands.first() {
            Some(Operand::F32(v)) => Ok(*v),
            _ => Err(self.malformed()),
        }
    }

    pub fn f64_bits(&self) -> Result<u64, EvalError> {
        match self.operands.first() {
            Some(Operand::F64(v)) => Ok(*v),
            _ => Err(self.malformed()),
        }
    }
}
