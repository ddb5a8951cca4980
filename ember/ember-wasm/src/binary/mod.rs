//! Binary decoding for the WebAssembly 1.0 container: byte cursor, LEB128 varints,
//! vector/name helpers, the instruction decoder and the section loader.
//!
//! Everything below `sections` reports low-level failures as [`BinaryReadError`];
//! the loader lifts them into [`crate::error::LoadError`].

pub mod code;
pub mod cursor;
pub mod leb128;
pub mod reader;
pub mod sections;

use thiserror::Error;

/// Result alias for binary reading operations.
pub type Result<T> = core::result::Result<T, BinaryReadError>;

/// Errors that can occur while reading a WASM binary stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BinaryReadError {
    #[error("unexpected EOF at offset {offset}")]
    UnexpectedEof { offset: usize },

    #[error("LEB128 value does not fit in {target_bits} bits (offset {offset})")]
    Leb128Overflow { target_bits: u32, offset: usize },

    #[error("too many bytes in LEB128 (limit={limit}) at offset {offset}")]
    Leb128TooManyBytes { limit: u32, offset: usize },

    #[error("invalid UTF-8 string at offset {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("malformed binary at offset {offset}: {msg}")]
    Malformed { offset: usize, msg: &'static str },
}
