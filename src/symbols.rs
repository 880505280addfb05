//! Kernel symbol table management.
//!
//! Provides symbol lookup by address and a [`DebugInfo`] resolver
//! for backtrace symbolization. Kallsyms carries no line tables, so resolved
//! frames report `<unknown>:0` for the source location.

use alloc::string::String;
use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, Ordering};
use ksym::KallsymsMapped;

use crate::debuginfo::{DebugInfo, SymbolInfo, UNKNOWN};

static INITIALIZED: AtomicBool = AtomicBool::new(false);

struct GlobalSymbolTable(UnsafeCell<Option<KallsymsMapped<'static>>>);
unsafe impl Sync for GlobalSymbolTable {}
static SYMBOL_TABLE: GlobalSymbolTable = GlobalSymbolTable(UnsafeCell::new(None));

const KSYM_NAME_LEN: usize = 1024;

/// Error types for symbol operations.
#[derive(Debug)]
pub enum Error {
    /// Symbol table has already been initialized.
    AlreadyInitialized,
    /// Failed to parse the symbol table blob.
    ParseError(&'static str),
    /// Symbol table has not been initialized yet.
    NotInitialized,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AlreadyInitialized => write!(f, "Symbol table already initialized"),
            Self::ParseError(e) => write!(f, "Failed to parse symbol table: {}", e),
            Self::NotInitialized => write!(f, "Symbol table not initialized"),
        }
    }
}

impl core::error::Error for Error {}

/// Initialize the kernel symbol table from a binary blob.
///
/// # Arguments
/// * `data` - The binary blob containing compressed symbol data
/// * `stext` - Start address of kernel text section
/// * `etext` - End address of kernel text section
///
/// # Safety
/// The `data` slice must remain valid for the lifetime of the program (static).
/// This function is not thread-safe if called concurrently with other init calls.
pub fn init(data: &'static [u8], stext: u64, etext: u64) -> Result<(), Error> {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return Err(Error::AlreadyInitialized);
    }

    let table = match KallsymsMapped::from_blob(data, stext, etext) {
        Ok(table) => table,
        Err(e) => {
            INITIALIZED.store(false, Ordering::SeqCst);
            return Err(Error::ParseError(e));
        }
    };

    unsafe {
        *SYMBOL_TABLE.0.get() = Some(table);
    }

    Ok(())
}

/// Check if the symbol table has been initialized.
pub fn is_initialized() -> bool {
    INITIALIZED.load(Ordering::SeqCst)
}

/// Lookup a symbol by address.
///
/// Returns (name, size, offset, type) if found.
/// - `name`: The symbol name
/// - `size`: Size of the symbol
/// - `offset`: Offset from the symbol start address
/// - `type`: Symbol type character (T, t, D, d, etc.)
pub fn lookup_symbol(addr: u64) -> Option<(String, u64, u64, char)> {
    if !is_initialized() {
        return None;
    }
    let table_ptr = SYMBOL_TABLE.0.get();
    let table = unsafe { (*table_ptr).as_ref() }?;

    let mut name_buf = [0u8; KSYM_NAME_LEN];

    table
        .lookup_address(addr, &mut name_buf)
        .map(|(name, size, offset, ty)| (String::from(name), size, offset, ty))
}

/// [`DebugInfo`] resolver backed by the global kallsyms table.
pub struct KallsymsResolver;

impl DebugInfo for KallsymsResolver {
    fn resolve(&self, pc: usize) -> Option<SymbolInfo> {
        let (name, _size, offset, _ty) = lookup_symbol(pc as u64)?;
        trace!("symbols: {:#x} -> {}+{:#x}", pc, name, offset);
        Some(SymbolInfo {
            file: String::from(UNKNOWN),
            line: 0,
            fn_name_len: name.len(),
            fn_name: name,
            fn_addr: pc.wrapping_sub(offset as usize),
        })
    }
}
