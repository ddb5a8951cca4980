mod common;

use std::sync::Arc;

use common::{module_bytes, section, wasm};
use ember_wasm::binary::BinaryReadError;
use ember_wasm::vm::Opcode;
use ember_wasm::{
    parse, Config, DecodeError, Error, Imports, Instance, LoadError, Module, ValidationError,
    Value,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const TYPE_VOID: &[u8] = b"\x01\x60\x00\x00";
const ONE_FUNC: &[u8] = b"\x01\x00";

#[test]
fn rejects_bad_preamble() {
    assert!(matches!(parse(b"\0wasm\x01\0\0"), Err(LoadError::BadMagic)));
    assert!(matches!(parse(b"\0asm\x0d\0\0\0"), Err(LoadError::UnsupportedVersion(13))));
    assert!(matches!(
        parse(b"\0asm\x01\0"),
        Err(LoadError::Binary(BinaryReadError::UnexpectedEof { .. }))
    ));
}

#[test]
fn empty_module_is_valid() {
    let module = parse(&module_bytes(&[])).unwrap();
    assert!(module.types.is_empty());
    assert_eq!(module.total_funcs(), 0);
}

#[test]
fn data_count_must_match() {
    let bytes = module_bytes(&[
        section(5, b"\x01\x00\x01"),
        section(12, b"\x02"),
        section(11, b"\x01\x00\x41\x00\x0B\x01\xAA"),
    ]);
    assert!(matches!(
        parse(&bytes),
        Err(LoadError::DataCountMismatch { declared: 2, actual: 1 })
    ));
}

#[test]
fn function_and_code_counts_must_match() {
    let bytes = module_bytes(&[section(1, TYPE_VOID), section(3, ONE_FUNC)]);
    assert!(matches!(
        parse(&bytes),
        Err(LoadError::FunctionCodeMismatch { functions: 1, bodies: 0 })
    ));
}

#[test]
fn unknown_opcode_names_the_byte() {
    let bytes = module_bytes(&[
        section(1, TYPE_VOID),
        section(3, ONE_FUNC),
        section(10, b"\x01\x03\x00\xFF\x0B"),
    ]);
    match parse(&bytes) {
        Err(LoadError::Decode(DecodeError::UnknownOpcode { byte, .. })) => assert_eq!(byte, 0xFF),
        other => panic!("expected unknown opcode, got {other:?}"),
    }
}

#[test]
fn unterminated_body_is_a_decode_error() {
    let bytes = module_bytes(&[
        section(1, TYPE_VOID),
        section(3, ONE_FUNC),
        section(10, b"\x01\x03\x00\x41\x01"),
    ]);
    assert!(matches!(parse(&bytes), Err(LoadError::Decode(_))));
}

#[test]
fn oversized_leb_is_rejected() {
    let bytes = module_bytes(&[section(1, b"\x80\x80\x80\x80\x80\x00")]);
    assert!(matches!(
        parse(&bytes),
        Err(LoadError::Binary(BinaryReadError::Leb128TooManyBytes { limit: 5, .. }))
    ));
}

#[test]
fn structural_checks_run_on_load() {
    let bytes = module_bytes(&[
        section(1, TYPE_VOID),
        section(3, ONE_FUNC),
        section(8, b"\x05"),
        section(10, b"\x01\x02\x00\x0B"),
    ]);
    assert!(matches!(
        parse(&bytes),
        Err(LoadError::Validation(ValidationError::IndexOutOfRange { space: "function", .. }))
    ));
}

#[test]
fn custom_sections_are_ignored() -> anyhow::Result<()> {
    let bytes = module_bytes(&[
        section(0, b"\x04meta\x01\x02\x03"),
        section(1, b"\x01\x60\x00\x01\x7F"),
        section(3, ONE_FUNC),
        section(7, b"\x01\x01f\x00\x00"),
        section(0, b"\x04tail"),
        section(10, b"\x01\x04\x00\x41\x2A\x0B"),
    ]);
    let mut inst = Instance::new(&bytes, &Imports::new())?;
    assert_eq!(inst.invoke("f", &[])?, Some(Value::i32(42)));
    Ok(())
}

#[test]
fn instance_from_reader() -> anyhow::Result<()> {
    let bytes = wasm(r#"(module (func (export "seven") (result i64) (i64.const 7)))"#);
    let reader = std::io::Cursor::new(bytes);
    let mut inst = Instance::from_reader(reader, &Imports::new(), Config::new())?;
    assert_eq!(inst.invoke("seven", &[])?, Some(Value::i64(7)));
    assert_eq!(inst.exports().count(), 1);
    Ok(())
}

#[test]
fn load_errors_surface_through_instance() {
    let err = Instance::new(b"not wasm", &Imports::new()).unwrap_err();
    assert!(matches!(err, Error::Load(LoadError::BadMagic)));
}

/// Random corruption of a valid module must produce `Ok` or `Err`, never a
/// panic, through decoding, linking and execution alike.
#[test]
fn mutated_modules_never_panic() {
    let original = wasm(
        r#"(module
            (memory 1)
            (data (i32.const 0) "seed")
            (table 2 funcref)
            (elem (i32.const 0) $f $f)
            (func $f (export "f") (param i32) (result i32)
                (i32.store8 (i32.const 3) (local.get 0))
                (block (result i32)
                    (br_table 0 0 (local.get 0)
                        (i32.add (local.get 0) (i32.load (i32.const 0)))))))"#,
    );
    let config = Config::new().max_call_depth(64);
    let mut rng = StdRng::seed_from_u64(0xE4BE2);
    let mut ran = 0;
    for _ in 0..2_000 {
        let mut bytes = original.clone();
        for _ in 0..rng.gen_range(1..4) {
            let at = rng.gen_range(8..bytes.len());
            bytes[at] = rng.gen();
        }
        if rng.gen_bool(0.2) {
            let len = rng.gen_range(0..bytes.len());
            bytes.truncate(len);
        }
        let Ok(module) = parse(&bytes) else { continue };
        if !terminates_quickly(&module) {
            continue;
        }
        let linked = Instance::from_module(Arc::new(module), &Imports::new(), config);
        let Ok(mut inst) = linked else { continue };
        let names: Vec<String> = inst.exports().map(|(name, _)| name.to_owned()).collect();
        for name in names {
            let _ = inst.invoke(&name, &[Value::i32(rng.gen())]);
        }
        ran += 1;
    }
    assert!(ran > 0, "no mutated module reached execution");

    for len in 0..8 {
        assert!(parse(&original[..len]).is_err());
    }
}

/// Mutations can introduce loops, fan-out recursion or huge allocations;
/// skip those so the run stays bounded.
fn terminates_quickly(module: &Module) -> bool {
    let small = module.memories.iter().all(|m| m.limits.min <= 16)
        && module.tables.iter().all(|t| t.limits.min <= 1024);
    let ops = module.codes.iter().flat_map(|body| body.ops.iter());
    let mut calls = 0;
    for op in ops {
        match op.opcode {
            Opcode::Loop | Opcode::MemoryGrow => return false,
            Opcode::Call | Opcode::CallIndirect => calls += 1,
            _ => {}
        }
    }
    small && calls <= 1
}
