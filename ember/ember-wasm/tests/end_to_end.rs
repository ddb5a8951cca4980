mod common;

use std::sync::{Arc, Mutex};

use common::instantiate;
use ember_wasm::{
    ArgumentError, Config, Error, EvalError, Imports, Instance, LinkError, RuntimeError, Store,
    Trap, ValType, Value,
};

#[test]
fn add_two_numbers() -> anyhow::Result<()> {
    let mut inst = instantiate(
        r#"(module
            (func (export "add") (param i32 i32) (result i32)
                local.get 0
                local.get 1
                i32.add))"#,
        &Imports::new(),
    )?;
    assert_eq!(inst.invoke("add", &[Value::i32(100), Value::i32(200)])?, Some(Value::i32(300)));
    Ok(())
}

#[test]
fn mutable_globals() -> anyhow::Result<()> {
    let mut inst = instantiate(
        r#"(module
            (global $a (export "a") (mut i32) (i32.const 0))
            (global $b (mut i32) (i32.const 40))
            (func (export "run") (result i32)
                (global.set $a (i32.const 10))
                (i32.add (global.get $a) (global.get $b))))"#,
        &Imports::new(),
    )?;
    assert_eq!(inst.global("a"), Some(Value::i32(0)));
    assert_eq!(inst.invoke("run", &[])?, Some(Value::i32(50)));
    assert_eq!(inst.global("a"), Some(Value::i32(10)));
    Ok(())
}

const FIB: &str = r#"(module
    (func $fib (export "fib") (param i32) (result i32)
        (if (result i32) (i32.lt_s (local.get 0) (i32.const 2))
            (then (i32.const 1))
            (else
                (i32.add
                    (call $fib (i32.sub (local.get 0) (i32.const 1)))
                    (call $fib (i32.sub (local.get 0) (i32.const 2))))))))"#;

#[test]
fn recursive_fib() -> anyhow::Result<()> {
    let mut inst = instantiate(FIB, &Imports::new())?;
    assert_eq!(inst.invoke("fib", &[Value::i32(10)])?, Some(Value::i32(89)));
    Ok(())
}

const TABLE: &str = r#"(module
    (type $ret (func (result i32)))
    (type $unary (func (param i32) (result i32)))
    (table 3 funcref)
    (elem (i32.const 0) $a $b $c)
    (func $a (result i32) (i32.const 111))
    (func $b (result i32) (i32.const 222))
    (func $c (result i32) (i32.const 333))
    (func (export "call") (param i32) (result i32)
        (call_indirect (type $ret) (local.get 0)))
    (func (export "call_wrong") (param i32) (result i32)
        (call_indirect (type $unary) (i32.const 0) (local.get 0))))"#;

#[test]
fn indirect_calls_through_table() -> anyhow::Result<()> {
    let mut inst = instantiate(TABLE, &Imports::new())?;
    for (slot, expected) in [(0, 111), (1, 222), (2, 333)] {
        assert_eq!(inst.invoke("call", &[Value::i32(slot)])?, Some(Value::i32(expected)));
    }
    let err = inst.invoke("call", &[Value::i32(3)]).unwrap_err();
    assert_eq!(err.as_trap(), Some(&Trap::TableOutOfBounds { index: 3 }));
    Ok(())
}

#[test]
fn indirect_call_signature_mismatch_traps() -> anyhow::Result<()> {
    let mut inst = instantiate(TABLE, &Imports::new())?;
    let err = inst.invoke("call_wrong", &[Value::i32(1)]).unwrap_err();
    assert_eq!(err, RuntimeError::Trap(Trap::IndirectCallTypeMismatch));
    Ok(())
}

#[test]
fn conditional_memory_init() -> anyhow::Result<()> {
    let mut inst = instantiate(
        r#"(module
            (memory (export "memory") 1)
            (data $greeting "abcdefg")
            (func (export "init") (param i32)
                (if (local.get 0)
                    (then (memory.init $greeting (i32.const 16) (i32.const 0) (i32.const 7)))))
            (func (export "forget") (data.drop $greeting)))"#,
        &Imports::new(),
    )?;

    inst.invoke("init", &[Value::i32(0)])?;
    assert_eq!(inst.memory("memory").unwrap().read(16, 7)?, &[0u8; 7]);

    inst.invoke("init", &[Value::i32(1)])?;
    assert_eq!(inst.memory("memory").unwrap().read(16, 7)?, b"abcdefg");

    inst.invoke("forget", &[])?;
    let err = inst.invoke("init", &[Value::i32(1)]).unwrap_err();
    assert!(matches!(err.as_trap(), Some(Trap::MemoryOutOfBounds { .. })));
    Ok(())
}

#[test]
fn select_picks_by_condition() -> anyhow::Result<()> {
    let mut inst = instantiate(
        r#"(module
            (func (export "pick") (param i32) (result i32)
                (select (i32.const 10) (i32.const 20) (local.get 0)))
            (func (export "mixed") (result i32)
                (select (i32.const 1) (i64.const 2) (i32.const 1))))"#,
        &Imports::new(),
    )?;
    assert_eq!(inst.invoke("pick", &[Value::i32(1)])?, Some(Value::i32(10)));
    assert_eq!(inst.invoke("pick", &[Value::i32(0)])?, Some(Value::i32(20)));
    assert_eq!(inst.invoke("pick", &[Value::i32(-7)])?, Some(Value::i32(10)));
    assert_eq!(
        inst.invoke("mixed", &[]),
        Err(RuntimeError::Eval(EvalError::TypeMismatch {
            expected: ValType::I32,
            found: ValType::I64,
        }))
    );
    Ok(())
}

#[test]
fn memory_copy_handles_overlap_and_bounds() -> anyhow::Result<()> {
    let mut inst = instantiate(
        r#"(module
            (memory (export "memory") 1)
            (data (i32.const 0) "abcdef")
            (func (export "copy") (param $dst i32) (param $src i32) (param $len i32)
                (memory.copy (local.get $dst) (local.get $src) (local.get $len))))"#,
        &Imports::new(),
    )?;
    let copy = |inst: &mut Instance, dst: i32, src: i32, len: i32| {
        inst.invoke("copy", &[Value::i32(dst), Value::i32(src), Value::i32(len)])
    };

    copy(&mut inst, 100, 0, 4)?;
    assert_eq!(inst.memory("memory").unwrap().read(100, 4)?, b"abcd");

    copy(&mut inst, 2, 0, 4)?;
    assert_eq!(inst.memory("memory").unwrap().read(0, 6)?, b"ababcd");

    let err = copy(&mut inst, 65_534, 0, 4).unwrap_err();
    assert_eq!(err.as_trap(), Some(&Trap::MemoryOutOfBounds { addr: 65_534, len: 4 }));
    assert_eq!(inst.memory("memory").unwrap().read(65_534, 2)?, &[0, 0]);
    Ok(())
}

#[test]
fn huge_table_fails_instantiation() {
    let bytes = common::wasm("(module (table 4294967295 funcref))");
    let err = Instance::new(&bytes, &Imports::new()).unwrap_err();
    assert!(matches!(err, Error::Link(LinkError::LimitsExceeded { .. })));

    let bytes = common::wasm("(module (table 8 funcref))");
    let config = Config::new().max_table_elems(4);
    let err = Instance::with_config(&bytes, &Imports::new(), config).unwrap_err();
    assert!(matches!(err, Error::Link(LinkError::LimitsExceeded { .. })));
}

fn arg(args: &[Value], i: usize) -> Result<u32, Trap> {
    args.get(i)
        .and_then(Value::as_u32)
        .ok_or_else(|| Trap::Host(format!("fd_write: argument {i} is not an i32")))
}

#[test]
fn wasi_style_fd_write() -> anyhow::Result<()> {
    let out = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&out);

    let mut imports = Imports::new();
    imports.define("wasi_snapshot_preview1", "fd_write", move |store: &mut Store, args: &[Value]| {
        let (iovs, count, nwritten) = (arg(args, 1)?, arg(args, 2)?, arg(args, 3)?);
        let mem = store.memory_mut(0).map_err(|e| Trap::Host(e.to_string()))?;
        let mut written = 0u32;
        for i in 0..count {
            let iov = u64::from(iovs) + u64::from(i) * 8;
            let ptr = mem.read_u32(iov)?;
            let len = mem.read_u32(iov + 4)?;
            let bytes = mem.read(u64::from(ptr), len as usize)?;
            sink.lock().unwrap().extend_from_slice(bytes);
            written += len;
        }
        mem.write_u32(u64::from(nwritten), written)?;
        Ok(Some(Value::i32(0)))
    });

    let mut inst = instantiate(
        r#"(module
            (import "wasi_snapshot_preview1" "fd_write"
                (func $fd_write (param i32 i32 i32 i32) (result i32)))
            (memory (export "memory") 1)
            (data (i32.const 8) "Hello, ")
            (data (i32.const 16) "world!\n")
            (func (export "main") (result i32)
                (i32.store (i32.const 32) (i32.const 8))
                (i32.store (i32.const 36) (i32.const 7))
                (i32.store (i32.const 40) (i32.const 16))
                (i32.store (i32.const 44) (i32.const 7))
                (drop (call $fd_write (i32.const 1) (i32.const 32) (i32.const 2) (i32.const 48)))
                (i32.load (i32.const 48))))"#,
        &imports,
    )?;

    assert_eq!(inst.invoke("main", &[])?, Some(Value::i32(14)));
    assert_eq!(inst.memory("memory").unwrap().read(48, 4)?, &14u32.to_le_bytes());
    assert_eq!(out.lock().unwrap().as_slice(), b"Hello, world!\n");
    Ok(())
}

#[test]
fn branch_out_of_block_skips_rest() -> anyhow::Result<()> {
    let mut inst = instantiate(
        r#"(module
            (func (export "f") (result i32)
                (block (result i32)
                    (i32.const 1)
                    (br 0)
                    (drop)
                    (i32.const 2))))"#,
        &Imports::new(),
    )?;
    assert_eq!(inst.invoke("f", &[])?, Some(Value::i32(1)));
    Ok(())
}

#[test]
fn loop_runs_n_times() -> anyhow::Result<()> {
    let mut inst = instantiate(
        r#"(module
            (func (export "count") (param $n i32) (result i32)
                (local $iterations i32)
                (loop $again
                    (local.set $iterations (i32.add (local.get $iterations) (i32.const 1)))
                    (local.tee $n (i32.sub (local.get $n) (i32.const 1)))
                    (br_if $again))
                (local.get $iterations)))"#,
        &Imports::new(),
    )?;
    for n in [1, 2, 7, 100] {
        assert_eq!(inst.invoke("count", &[Value::i32(n)])?, Some(Value::i32(n)));
    }
    Ok(())
}

const MEMORY: &str = r#"(module
    (memory (export "memory") 1 2)
    (func (export "grow") (param i32) (result i32)
        (memory.grow (local.get 0)))
    (func (export "size") (result i32)
        (memory.size))
    (func (export "poke") (param i32 i32)
        (i32.store (local.get 0) (local.get 1)))
    (func (export "peek") (param i32) (result i32)
        (i32.load (local.get 0))))"#;

#[test]
fn memory_grow_past_max_fails_cleanly() -> anyhow::Result<()> {
    let mut inst = instantiate(MEMORY, &Imports::new())?;
    assert_eq!(inst.invoke("grow", &[Value::i32(2)])?, Some(Value::i32(-1)));
    assert_eq!(inst.invoke("size", &[])?, Some(Value::i32(1)));
    assert_eq!(inst.invoke("grow", &[Value::i32(1)])?, Some(Value::i32(1)));
    assert_eq!(inst.invoke("size", &[])?, Some(Value::i32(2)));
    assert_eq!(inst.grow_memory("memory", 1), None);
    Ok(())
}

#[test]
fn out_of_bounds_store_traps() -> anyhow::Result<()> {
    let mut inst = instantiate(MEMORY, &Imports::new())?;
    inst.invoke("poke", &[Value::i32(65_532), Value::i32(-7)])?;
    assert_eq!(inst.invoke("peek", &[Value::i32(65_532)])?, Some(Value::i32(-7)));

    let err = inst.invoke("poke", &[Value::i32(65_533), Value::i32(1)]).unwrap_err();
    assert_eq!(err.as_trap(), Some(&Trap::MemoryOutOfBounds { addr: 65_533, len: 4 }));
    Ok(())
}

#[test]
fn integer_edge_cases() -> anyhow::Result<()> {
    let mut inst = instantiate(
        r#"(module
            (func (export "add") (param i32 i32) (result i32)
                (i32.add (local.get 0) (local.get 1)))
            (func (export "div_s") (param i32 i32) (result i32)
                (i32.div_s (local.get 0) (local.get 1)))
            (func (export "div_u") (param i32 i32) (result i32)
                (i32.div_u (local.get 0) (local.get 1))))"#,
        &Imports::new(),
    )?;
    let sum = inst.invoke("add", &[Value::i32(i32::MAX), Value::i32(1)])?;
    assert_eq!(sum, Some(Value::I32(0x8000_0000)));
    assert_eq!(sum.and_then(|v| v.as_i32()), Some(i32::MIN));

    let err = inst.invoke("div_s", &[Value::i32(i32::MIN), Value::i32(-1)]).unwrap_err();
    assert_eq!(err.as_trap(), Some(&Trap::IntegerOverflow));
    let err = inst.invoke("div_u", &[Value::i32(5), Value::i32(0)]).unwrap_err();
    assert_eq!(err.as_trap(), Some(&Trap::IntegerDivideByZero));
    Ok(())
}

#[test]
fn invoke_rejects_bad_calls() -> anyhow::Result<()> {
    let mut inst = instantiate(MEMORY, &Imports::new())?;
    assert_eq!(
        inst.invoke("missing", &[]),
        Err(RuntimeError::Argument(ArgumentError::UnknownExport("missing".into())))
    );
    assert_eq!(
        inst.invoke("memory", &[]),
        Err(RuntimeError::Argument(ArgumentError::NotAFunction("memory".into())))
    );
    assert!(matches!(
        inst.invoke("peek", &[Value::f32(1.0)]),
        Err(RuntimeError::Argument(ArgumentError::Type { index: 0, .. }))
    ));
    Ok(())
}

#[test]
fn unresolved_import_fails_instantiation() {
    let err = instantiate(
        r#"(module (import "env" "log" (func (param i32))))"#,
        &Imports::new(),
    )
    .unwrap_err();
    let err = err.downcast::<Error>().unwrap();
    assert!(matches!(
        err,
        Error::Link(LinkError::UnresolvedImport { ref name, .. }) if name == "log"
    ));
}

#[test]
fn start_function_runs_and_can_fail() -> anyhow::Result<()> {
    let inst = instantiate(
        r#"(module
            (global (export "ready") (mut i32) (i32.const 0))
            (func $init (global.set 0 (i32.const 1)))
            (start $init))"#,
        &Imports::new(),
    )?;
    assert_eq!(inst.global("ready"), Some(Value::i32(1)));

    let err = instantiate(r#"(module (func $boom unreachable) (start $boom))"#, &Imports::new())
        .unwrap_err()
        .downcast::<Error>()
        .unwrap();
    assert!(matches!(
        err,
        Error::Link(LinkError::StartTrap(RuntimeError::Trap(Trap::Unreachable)))
    ));
    Ok(())
}
