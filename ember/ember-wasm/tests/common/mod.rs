#![allow(dead_code)]

use std::sync::Once;

use ember_wasm::{Imports, Instance};

static TRACING: Once = Once::new();

/// Route library events to the test harness output. Set `RUST_LOG`-style
/// levels with `EMBER_TEST_LOG=debug`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let level = std::env::var("EMBER_TEST_LOG")
            .ok()
            .and_then(|l| l.parse::<tracing::Level>().ok())
            .unwrap_or(tracing::Level::WARN);
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_test_writer()
            .try_init();
    });
}

/// Assemble WAT text into a binary module.
pub fn wasm(text: &str) -> Vec<u8> {
    wat::parse_str(text).expect("valid wat")
}

pub fn instantiate(text: &str, imports: &Imports) -> anyhow::Result<Instance> {
    init_tracing();
    Ok(Instance::new(&wasm(text), imports)?)
}

/// Section with its id and ULEB length prefix. Payloads stay under 128 bytes.
pub fn section(id: u8, payload: &[u8]) -> Vec<u8> {
    assert!(payload.len() < 0x80);
    let mut out = vec![id, payload.len() as u8];
    out.extend_from_slice(payload);
    out
}

pub fn module_bytes(sections: &[Vec<u8>]) -> Vec<u8> {
    let mut out = b"\0asm\x01\0\0\0".to_vec();
    for s in sections {
        out.extend_from_slice(s);
    }
    out
}
