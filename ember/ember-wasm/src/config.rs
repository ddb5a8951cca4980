//! Runtime configuration.

/// Default cap on nested calls.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 16_384;

/// Default cap on the initial size of a table, in elements.
pub const DEFAULT_MAX_TABLE_ELEMS: u32 = 10_000_000;

/// Knobs read by the interpreter on every invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Frames allowed on the call stack before `Trap::CallStackExhausted`.
    pub max_call_depth: usize,
    /// Reject non-zero reserved bytes in bulk-memory instructions instead of
    /// logging a warning.
    pub strict_reserved_bytes: bool,
    /// Largest table minimum accepted at link time.
    pub max_table_elems: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            strict_reserved_bytes: false,
            max_table_elems: DEFAULT_MAX_TABLE_ELEMS,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn strict_reserved_bytes(mut self, strict: bool) -> Self {
        self.strict_reserved_bytes = strict;
        self
    }

    pub fn max_table_elems(mut self, elems: u32) -> Self {
        self.max_table_elems = elems;
        self
    }
}
