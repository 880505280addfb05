//! Source-level identity of instruction addresses.
//!
//! The monitor asks a [`DebugInfo`] resolver about every return address it
//! finds on the stack. Resolvers live outside this crate (stabs, DWARF,
//! kallsyms, ...); [`crate::symbols::KallsymsResolver`] is the one shipped
//! behind the `symbols` feature.

use alloc::string::String;

/// Name reported when nothing is known about an address.
pub const UNKNOWN: &str = "<unknown>";

/// What a resolver knows about one instruction address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolInfo {
    /// Source file name.
    pub file: String,
    /// Source line number.
    pub line: u32,
    /// Name of the enclosing function. Only the first `fn_name_len` bytes
    /// belong to the name.
    pub fn_name: String,
    /// Length of the function name inside `fn_name`.
    pub fn_name_len: usize,
    /// Entry address of the enclosing function.
    pub fn_addr: usize,
}

impl SymbolInfo {
    /// Placeholder for an address the resolver knows nothing about.
    pub fn unknown(pc: usize) -> Self {
        Self {
            file: String::from(UNKNOWN),
            line: 0,
            fn_name: String::from(UNKNOWN),
            fn_name_len: UNKNOWN.len(),
            fn_addr: pc,
        }
    }

    /// Function name, cut at `fn_name_len`.
    ///
    /// Never reads past the reported length, even when the stored string is
    /// longer (stabs names carry a `:F...` type suffix).
    pub fn name(&self) -> &str {
        let mut len = self.fn_name_len.min(self.fn_name.len());
        while !self.fn_name.is_char_boundary(len) {
            len -= 1;
        }
        &self.fn_name[..len]
    }

    /// Byte offset of `pc` from the function entry.
    pub fn offset(&self, pc: usize) -> usize {
        pc.wrapping_sub(self.fn_addr)
    }
}

/// Debug-info resolver provided by the symbol subsystem.
pub trait DebugInfo {
    /// Resolve an instruction address, or `None` when it is unknown.
    fn resolve(&self, pc: usize) -> Option<SymbolInfo>;
}

/// Resolver that knows nothing; every address prints as `<unknown>`.
pub struct NoDebugInfo;

impl DebugInfo for NoDebugInfo {
    fn resolve(&self, _pc: usize) -> Option<SymbolInfo> {
        None
    }
}
