//! Crate-level error types.
//!
//! Loading, linking and running each have their own enum; `Error` unifies
//! them for the `Instance` constructors.

use thiserror::Error;

use crate::binary::BinaryReadError;
use crate::model::{RefType, ValType};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Binary(#[from] BinaryReadError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to read module bytes")]
    Io(#[from] std::io::Error),

    #[error("bad magic header (expected \\0asm)")]
    BadMagic,

    #[error("unsupported binary version {0}")]
    UnsupportedVersion(u32),

    #[error("section {id} at offset {offset} is out of order")]
    SectionOrder { id: u8, offset: usize },

    #[error("duplicate section {id} at offset {offset}")]
    DuplicateSection { id: u8, offset: usize },

    #[error("data count section declares {declared} segments but the data section has {actual}")]
    DataCountMismatch { declared: u32, actual: usize },

    #[error("{functions} functions declared but {bodies} code bodies present")]
    FunctionCodeMismatch { functions: usize, bodies: usize },

    #[error("unsupported constant expression: {0}")]
    ConstExpr(&'static str),

    #[error("unsupported element segment mode {0}")]
    ElementMode(u32),

    #[error("unsupported data segment mode {0}")]
    DataMode(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Binary(#[from] BinaryReadError),

    #[error("unknown opcode {byte:#04x} at offset {offset}")]
    UnknownOpcode { byte: u8, offset: usize },

    #[error("unknown 0xfc sub-opcode {sub} at offset {offset}")]
    UnknownExtended { sub: u32, offset: usize },

    #[error("malformed operand for {opcode}")]
    Operand {
        opcode: &'static str,
        #[source]
        source: BinaryReadError,
    },

    #[error("unbalanced control structure at instruction {pc}")]
    Unbalanced { pc: usize },

    #[error("else without a matching if at instruction {pc}")]
    StrayElse { pc: usize },

    #[error("function body is not terminated by end")]
    MissingEnd,

    #[error("too many locals ({count})")]
    TooManyLocals { count: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("type index {index} out of range ({context})")]
    TypeIndex { context: &'static str, index: u32 },

    #[error("{space} index {index} out of range ({context})")]
    IndexOutOfRange { context: &'static str, space: &'static str, index: u32 },

    #[error("at most one memory is supported, found {0}")]
    MultipleMemories(u32),

    #[error("{context} limits have max {max} below min {min}")]
    Limits { context: &'static str, min: u32, max: u32 },

    #[error("duplicate export name {0:?}")]
    DuplicateExport(String),

    #[error("start function must have type [] -> [], found {0}")]
    StartSignature(String),
}

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("unresolved import: {module}.{name}")]
    UnresolvedImport { module: String, name: String },

    #[error("unsupported {kind} import: {module}.{name}")]
    UnsupportedImport { module: String, name: String, kind: &'static str },

    #[error("type mismatch ({context}): expected {expected}, found {found}")]
    TypeMismatch {
        context: &'static str,
        expected: String,
        found: String,
    },

    #[error("limits exceeded ({context})")]
    LimitsExceeded { context: &'static str },

    #[error("element segment {segment} initialization out of bounds")]
    ElemOutOfBounds { segment: usize },

    #[error("data segment {segment} initialization out of bounds")]
    DataOutOfBounds { segment: usize },

    #[error("table {table} holds {found}, element segments require funcref")]
    ElementKind { table: u32, found: RefType },

    #[error("{space} index {index} does not exist")]
    MissingIndex { space: &'static str, index: u32 },

    #[error("start function failed")]
    StartTrap(#[source] RuntimeError),
}

/// Conditions defined by the WebAssembly semantics as traps.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Trap {
    #[error("unreachable executed")]
    Unreachable,

    #[error("integer divide by zero")]
    IntegerDivideByZero,

    #[error("integer overflow")]
    IntegerOverflow,

    #[error("invalid conversion to integer")]
    InvalidConversionToInteger,

    #[error("out of bounds memory access at {addr} (+{len})")]
    MemoryOutOfBounds { addr: u64, len: u64 },

    #[error("out of bounds table access at {index}")]
    TableOutOfBounds { index: u32 },

    #[error("uninitialized element {index}")]
    UninitializedElement { index: u32 },

    #[error("indirect call type mismatch")]
    IndirectCallTypeMismatch,

    #[error("call stack exhausted at depth {depth}")]
    CallStackExhausted { depth: usize },

    #[error("host function failed: {0}")]
    Host(String),
}

/// Faults that a validating engine would have rejected before execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: ValType, found: ValType },

    #[error("value stack underflow")]
    StackUnderflow,

    #[error("local {0} does not exist")]
    MissingLocal(u32),

    #[error("global {0} does not exist")]
    MissingGlobal(u32),

    #[error("memory {0} does not exist")]
    MissingMemory(u32),

    #[error("table {0} does not exist")]
    MissingTable(u32),

    #[error("function {0} does not exist")]
    MissingFunction(u32),

    #[error("type {0} does not exist")]
    MissingType(u32),

    #[error("data segment {0} does not exist")]
    MissingData(u32),

    #[error("branch depth {level} exceeds {depth} enclosing labels")]
    InvalidBranch { level: u32, depth: usize },

    #[error("global {0} is immutable")]
    ImmutableGlobal(u32),

    #[error("table {table} holds {found}, expected funcref")]
    ElementKind { table: u32, found: RefType },

    #[error("malformed operands for {opcode}")]
    MalformedOperands { opcode: &'static str },

    #[error("host function returned {found} values, expected {expected}")]
    HostResultArity { expected: usize, found: usize },

    #[error("non-zero reserved byte {byte:#04x} in {opcode}")]
    ReservedByte { opcode: &'static str, byte: u8 },

    #[error("unsupported: {0}")]
    Unsupported(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error("no export named {0:?}")]
    UnknownExport(String),

    #[error("export {0:?} is not a function")]
    NotAFunction(String),

    #[error("expected {expected} arguments, got {got}")]
    Arity { expected: usize, got: usize },

    #[error("argument {index}: expected {expected}, found {found}")]
    Type { index: usize, expected: ValType, found: ValType },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("trap: {0}")]
    Trap(#[from] Trap),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Argument(#[from] ArgumentError),

    #[error("internal error: {0}")]
    Internal(&'static str),
}

impl RuntimeError {
    pub fn as_trap(&self) -> Option<&Trap> {
        match self {
            RuntimeError::Trap(t) => Some(t),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}
