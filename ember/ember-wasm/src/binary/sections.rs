//! Module header, section framing and the per-section payload grammars.
//!
//! Every payload is carved into a bounded sub-cursor so a section parser can
//! never read past its declared length, and must consume all of it.

use std::io::Read;

use tracing::debug;

use super::{
    code::{decode_op, read_func_body},
    cursor::Cursor,
    leb128,
    reader::{read_len_prefixed_bytes, read_name, read_vec},
    BinaryReadError,
};
use crate::error::LoadError;
use crate::model::{
    DataMode, DataSegment, ElementSegment, Export, ExportDesc, FuncType, Global, GlobalType,
    Import, ImportDesc, Limits, MemoryType, Module, RefType, Section, SectionContent, TableType,
    ValType,
};
use crate::value::Value;
use crate::vm::instructions::{Opcode, Operand};

type Result<T> = core::result::Result<T, LoadError>;

pub const MAGIC: [u8; 4] = *b"\0asm";
pub const VERSION: u32 = 1;

/// Standard section identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionId {
    Custom = 0,
    Type = 1,
    Import = 2,
    Function = 3,
    Table = 4,
    Memory = 5,
    Global = 6,
    Export = 7,
    Start = 8,
    Element = 9,
    Code = 10,
    Data = 11,
    DataCount = 12,
}

impl SectionId {
    pub fn from_byte(b: u8) -> Option<Self> {
        Some(match b {
            0 => SectionId::Custom,
            1 => SectionId::Type,
            2 => SectionId::Import,
            3 => SectionId::Function,
            4 => SectionId::Table,
            5 => SectionId::Memory,
            6 => SectionId::Global,
            7 => SectionId::Export,
            8 => SectionId::Start,
            9 => SectionId::Element,
            10 => SectionId::Code,
            11 => SectionId::Data,
            12 => SectionId::DataCount,
            _ => return None,
        })
    }

    /// Position in the canonical order. DataCount sits between Element and
    /// Code even though its id is the largest.
    fn ordering_key(self) -> u8 {
        match self {
            SectionId::DataCount => 10,
            SectionId::Code => 11,
            SectionId::Data => 12,
            other => other as u8,
        }
    }
}

/// A section's raw id byte, payload length and payload start offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionHeader {
    pub id: u8,
    pub payload_len: u32,
    pub payload_offset: usize,
}

pub fn read_section_header(
    cur: &mut Cursor,
) -> core::result::Result<SectionHeader, BinaryReadError> {
    let id = cur.read_u8()?;
    let payload_len = leb128::read_uleb_u32(cur)?;
    Ok(SectionHeader { id, payload_len, payload_offset: cur.offset() })
}

fn malformed(cur: &Cursor, msg: &'static str) -> LoadError {
    LoadError::Binary(BinaryReadError::Malformed { offset: cur.offset(), msg })
}

fn read_val_type(cur: &mut Cursor) -> Result<ValType> {
    let b = cur.read_u8()?;
    ValType::from_byte(b).ok_or_else(|| malformed(cur, "invalid value type"))
}

fn read_ref_type(cur: &mut Cursor) -> Result<RefType> {
    match cur.read_u8()? {
        0x70 => Ok(RefType::FuncRef),
        0x6F => Ok(RefType::ExternRef),
        _ => Err(malformed(cur, "invalid reference type")),
    }
}

fn read_limits(cur: &mut Cursor) -> Result<Limits> {
    match cur.read_u8()? {
        0x00 => Ok(Limits::new(leb128::read_uleb_u32(cur)?, None)),
        0x01 => {
            let min = leb128::read_uleb_u32(cur)?;
            let max = leb128::read_uleb_u32(cur)?;
            Ok(Limits::new(min, Some(max)))
        }
        _ => Err(malformed(cur, "invalid limits flag")),
    }
}

fn read_func_type(cur: &mut Cursor) -> Result<FuncType> {
    if cur.read_u8()? != 0x60 {
        return Err(malformed(cur, "expected function type form 0x60"));
    }
    let params = read_vec(cur, read_val_type)?;
    let results = read_vec(cur, read_val_type)?;
    Ok(FuncType { params, results })
}

fn read_table_type(cur: &mut Cursor) -> Result<TableType> {
    let elem = read_ref_type(cur)?;
    let limits = read_limits(cur)?;
    Ok(TableType { elem, limits })
}

fn read_memory_type(cur: &mut Cursor) -> Result<MemoryType> {
    Ok(MemoryType { limits: read_limits(cur)? })
}

fn read_global_type(cur: &mut Cursor) -> Result<GlobalType> {
    let val_type = read_val_type(cur)?;
    let mutable = match cur.read_u8()? {
        0x00 => false,
        0x01 => true,
        _ => return Err(malformed(cur, "invalid global mutability")),
    };
    Ok(GlobalType { val_type, mutable })
}

/// A constant initializer: one `t.const` of type `ty`, then `end`.
pub fn read_const_expr(cur: &mut Cursor, ty: ValType) -> Result<Value> {
    let op = decode_op(cur)?;
    let value = match (ty, op.opcode, op.operands.as_slice()) {
        (ValType::I32, Opcode::I32Const, [Operand::I32(v)]) => Value::i32(*v),
        (ValType::I64, Opcode::I64Const, [Operand::I64(v)]) => Value::i64(*v),
        (ValType::F32, Opcode::F32Const, [Operand::F32(bits)]) => Value::F32(*bits),
        (ValType::F64, Opcode::F64Const, [Operand::F64(bits)]) => Value::F64(*bits),
        (_, Opcode::GlobalGet, _) => {
            return Err(LoadError::ConstExpr("global.get initializers are not supported"))
        }
        _ => return Err(LoadError::ConstExpr("expected a constant of the initialized type")),
    };
    if decode_op(cur)?.opcode != Opcode::End {
        return Err(LoadError::ConstExpr("initializer must end after a single constant"));
    }
    Ok(value)
}

fn read_import(cur: &mut Cursor) -> Result<Import> {
    let module = read_name(cur)?;
    let name = read_name(cur)?;
    let desc = match cur.read_u8()? {
        0x00 => ImportDesc::Func(leb128::read_uleb_u32(cur)?),
        0x01 => ImportDesc::Table(read_table_type(cur)?),
        0x02 => ImportDesc::Memory(read_memory_type(cur)?),
        0x03 => ImportDesc::Global(read_global_type(cur)?),
        _ => return Err(malformed(cur, "invalid import kind")),
    };
    Ok(Import { module, name, desc })
}

fn read_export(cur: &mut Cursor) -> Result<Export> {
    let name = read_name(cur)?;
    let kind = cur.read_u8()?;
    let index = leb128::read_uleb_u32(cur)?;
    let desc = match kind {
        0x00 => ExportDesc::Func(index),
        0x01 => ExportDesc::Table(index),
        0x02 => ExportDesc::Memory(index),
        0x03 => ExportDesc::Global(index),
        _ => return Err(malformed(cur, "invalid export kind")),
    };
    Ok(Export { name, desc })
}

fn read_global(cur: &mut Cursor) -> Result<Global> {
    let ty = read_global_type(cur)?;
    let init = read_const_expr(cur, ty.val_type)?;
    Ok(Global { ty, init })
}

fn read_func_indices(cur: &mut Cursor) -> Result<Vec<u32>> {
    read_vec(cur, |c| Ok(leb128::read_uleb_u32(c)?))
}

/// Only the active encodings (flags 0 and 2) are accepted.
fn read_element_segment(cur: &mut Cursor) -> Result<ElementSegment> {
    let flags = leb128::read_uleb_u32(cur)?;
    let table = match flags {
        0 => 0,
        2 => leb128::read_uleb_u32(cur)?,
        other => return Err(LoadError::ElementMode(other)),
    };
    let offset = read_const_expr(cur, ValType::I32)?;
    if flags == 2 && cur.read_u8()? != 0x00 {
        return Err(malformed(cur, "unsupported element kind"));
    }
    let init = read_func_indices(cur)?;
    Ok(ElementSegment { table, offset, init })
}

fn read_data_segment(cur: &mut Cursor) -> Result<DataSegment> {
    let flags = leb128::read_uleb_u32(cur)?;
    let mode = match flags {
        0 => DataMode::Active { memory: 0, offset: read_const_expr(cur, ValType::I32)? },
        1 => DataMode::Passive,
        2 => {
            let memory = leb128::read_uleb_u32(cur)?;
            DataMode::Active { memory, offset: read_const_expr(cur, ValType::I32)? }
        }
        other => return Err(LoadError::DataMode(other)),
    };
    let init = read_len_prefixed_bytes(cur)?.to_vec();
    Ok(DataSegment { mode, init })
}

fn read_code_entry(cur: &mut Cursor) -> Result<crate::model::FuncBody> {
    let size = leb128::read_uleb_u32(cur)? as usize;
    let mut body = cur.sub_cursor(size)?;
    Ok(read_func_body(&mut body)?)
}

fn read_section_content(id: SectionId, cur: &mut Cursor) -> Result<SectionContent> {
    Ok(match id {
        SectionId::Type => SectionContent::Type(read_vec(cur, read_func_type)?),
        SectionId::Import => SectionContent::Import(read_vec(cur, read_import)?),
        SectionId::Function => SectionContent::Function(read_func_indices(cur)?),
        SectionId::Table => SectionContent::Table(read_vec(cur, read_table_type)?),
        SectionId::Memory => SectionContent::Memory(read_vec(cur, read_memory_type)?),
        SectionId::Global => SectionContent::Global(read_vec(cur, read_global)?),
        SectionId::Export => SectionContent::Export(read_vec(cur, read_export)?),
        SectionId::Start => SectionContent::Start(leb128::read_uleb_u32(cur)?),
        SectionId::Element => SectionContent::Element(read_vec(cur, read_element_segment)?),
        SectionId::DataCount => SectionContent::DataCount(leb128::read_uleb_u32(cur)?),
        SectionId::Code => SectionContent::Code(read_vec(cur, read_code_entry)?),
        SectionId::Data => SectionContent::Data(read_vec(cur, read_data_segment)?),
        SectionId::Custom => return Err(malformed(cur, "custom sections carry no content")),
    })
}

fn read_preamble(cur: &mut Cursor) -> Result<()> {
    let magic = cur.read_array::<4>().map_err(|_| LoadError::BadMagic)?;
    if magic != MAGIC {
        return Err(LoadError::BadMagic);
    }
    let version = cur.read_u32_le()?;
    if version != VERSION {
        return Err(LoadError::UnsupportedVersion(version));
    }
    Ok(())
}

/// Decode the preamble and every standard section, in order.
pub fn parse_sections(bytes: &[u8]) -> Result<Vec<Section>> {
    let mut cur = Cursor::new(bytes);
    read_preamble(&mut cur)?;

    let mut sections = Vec::new();
    let mut last_key = 0u8;
    while !cur.is_eof() {
        let header = read_section_header(&mut cur)?;
        let mut payload = cur.sub_cursor(header.payload_len as usize)?;

        let id = match SectionId::from_byte(header.id) {
            Some(SectionId::Custom) | None => {
                debug!(
                    id = header.id,
                    offset = header.payload_offset,
                    len = header.payload_len,
                    "skipping custom or unknown section"
                );
                continue;
            }
            Some(id) => id,
        };

        let key = id.ordering_key();
        if key == last_key {
            return Err(LoadError::DuplicateSection {
                id: header.id,
                offset: header.payload_offset,
            });
        }
        if key < last_key {
            return Err(LoadError::SectionOrder { id: header.id, offset: header.payload_offset });
        }
        last_key = key;

        let content = read_section_content(id, &mut payload)?;
        if !payload.is_eof() {
            return Err(malformed(&payload, "section payload not fully consumed"));
        }
        debug!(
            section = content.name(),
            offset = header.payload_offset,
            len = header.payload_len,
            "parsed section"
        );
        sections.push(Section {
            payload_offset: header.payload_offset,
            payload_len: header.payload_len,
            content,
        });
    }
    Ok(sections)
}

/// Decode, assemble and structurally check a module.
pub fn parse(bytes: &[u8]) -> Result<Module> {
    let module = Module::from_sections(parse_sections(bytes)?)?;
    crate::validate::validate_module(&module)?;
    Ok(module)
}

pub fn load(mut reader: impl Read) -> Result<Module> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    parse(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(id: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = vec![id, payload.len() as u8];
        out.extend_from_slice(payload);
        out
    }

    fn module(sections: &[Vec<u8>]) -> Vec<u8> {
        let mut out = b"\0asm\x01\0\0\0".to_vec();
        for s in sections {
            out.extend_from_slice(s);
        }
        out
    }

    #[test]
    fn header_ok() {
        let data = [1u8, 0x03, 0xAA, 0xBB, 0xCC];
        let mut c = Cursor::new(&data);
        let h = read_section_header(&mut c).unwrap();
        assert_eq!(h.id, 1);
        assert_eq!(h.payload_len, 3);
        assert_eq!(h.payload_offset, 2);
    }

    #[test]
    fn preamble_errors() {
        assert!(matches!(parse_sections(b"\0asn\x01\0\0\0"), Err(LoadError::BadMagic)));
        assert!(matches!(parse_sections(b"\0as"), Err(LoadError::BadMagic)));
        assert!(matches!(
            parse_sections(b"\0asm\x02\0\0\0"),
            Err(LoadError::UnsupportedVersion(2))
        ));
        assert!(parse_sections(b"\0asm\x01\0\0\0").unwrap().is_empty());
    }

    #[test]
    fn custom_and_unknown_sections_are_skipped() {
        let bytes = module(&[
            section(0, b"\x04name\x01\x02"),
            section(1, b"\x01\x60\x00\x00"),
            section(42, b"zz"),
        ]);
        let sections = parse_sections(&bytes).unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].content, SectionContent::Type(vec![FuncType::default()]));
        assert_eq!(sections[0].payload_offset, 19);
    }

    #[test]
    fn ordering_and_duplicates() {
        let dup = module(&[section(1, b"\x00"), section(1, b"\x00")]);
        assert!(matches!(parse_sections(&dup), Err(LoadError::DuplicateSection { id: 1, .. })));

        let out_of_order = module(&[section(3, b"\x00"), section(1, b"\x00")]);
        assert!(matches!(
            parse_sections(&out_of_order),
            Err(LoadError::SectionOrder { id: 1, .. })
        ));

        // datacount (12) belongs before code (10) and after element (9)
        let ok = module(&[section(9, b"\x00"), section(12, b"\x00"), section(10, b"\x00")]);
        assert_eq!(parse_sections(&ok).unwrap().len(), 3);
        let late = module(&[section(10, b"\x00"), section(12, b"\x00")]);
        assert!(matches!(parse_sections(&late), Err(LoadError::SectionOrder { id: 12, .. })));
    }

    #[test]
    fn trailing_payload_bytes_fail() {
        let bytes = module(&[section(8, b"\x00\x00")]);
        assert!(matches!(
            parse_sections(&bytes),
            Err(LoadError::Binary(BinaryReadError::Malformed { .. }))
        ));
    }

    #[test]
    fn const_exprs() {
        let mut c = Cursor::new(&[0x41, 0x2A, 0x0B]);
        assert_eq!(read_const_expr(&mut c, ValType::I32).unwrap(), Value::i32(42));

        let mut c = Cursor::new(&[0x42, 0x01, 0x0B]);
        assert!(matches!(read_const_expr(&mut c, ValType::I32), Err(LoadError::ConstExpr(_))));

        let mut c = Cursor::new(&[0x41, 0x01, 0x41, 0x02, 0x0B]);
        assert!(matches!(read_const_expr(&mut c, ValType::I32), Err(LoadError::ConstExpr(_))));

        let mut c = Cursor::new(&[0x23, 0x00, 0x0B]);
        assert!(matches!(read_const_expr(&mut c, ValType::I32), Err(LoadError::ConstExpr(_))));
    }

    #[test]
    fn segment_modes() {
        // passive element segment (flags 1) is rejected
        let bytes = module(&[section(9, b"\x01\x01\x00\x00")]);
        assert!(matches!(parse_sections(&bytes), Err(LoadError::ElementMode(1))));

        // active, passive, and active with explicit memory
        let data = b"\x03\x00\x41\x04\x0B\x01\xAA\x01\x02\xBB\xCC\x02\x00\x41\x00\x0B\x00";
        let bytes = module(&[section(11, data)]);
        let sections = parse_sections(&bytes).unwrap();
        let SectionContent::Data(segs) = &sections[0].content else {
            panic!("expected data section");
        };
        assert_eq!(segs.len(), 3);
        assert_eq!(segs[0].mode, DataMode::Active { memory: 0, offset: Value::i32(4) });
        assert_eq!(segs[1].mode, DataMode::Passive);
        assert_eq!(segs[1].init, vec![0xBB, 0xCC]);
        assert!(segs[2].init.is_empty());

        let bytes = module(&[section(11, b"\x01\x03")]);
        assert!(matches!(parse_sections(&bytes), Err(LoadError::DataMode(3))));
    }
}
