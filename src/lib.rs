//! Interactive kernel monitor.
//!
//! This crate provides a small command interpreter that a kernel drops into
//! from a trap or on operator request, plus the memory introspection
//! commands behind it:
//!
//! - `backtrace` - frame-pointer stack unwinding with symbolization
//! - `showmappings` / `setPerm` - page table inspection and permission edits
//! - `vvm` / `vpm` - raw word dumps of virtual or physical memory
//! - `kerninfo`, `help`, `continue`
//!
//! The monitor implements none of the kernel services it uses. Page tables,
//! memory access, symbol resolution, the console and the trap frame are all
//! reached through traits, so the whole crate runs against mocks in user
//! space tests.
//!
//! # Features
//!
//! - `symbols` - kallsyms backed backtrace symbolization (default)
//! - `axhal` - real platform operations (address translation, frame pointer)
//! - `test-utils` - keep the mock platform available alongside `axhal`
//!
//! # Quick Start
//!
//! ```ignore
//! use axmon::monitor::{self, Context};
//!
//! // Configure once during boot
//! axmon::init(axmon::MonitorConfig::default());
//!
//! // Drop into the monitor from a trap handler
//! let mut ctx = Context {
//!     page_table: &mut kernel_page_table,
//!     memory: &axmon::platform::RealPlatform,
//!     debug_info: &axmon::symbols::KallsymsResolver,
//!     layout,
//!     trap: Some(tf),
//! };
//! monitor::monitor(&mut console, &mut ctx);
//! ```

#![no_std]

extern crate alloc;

#[macro_use]
extern crate log;

// =============================================================================
// Platform Abstraction (for testing support)
// =============================================================================

pub mod platform;

pub mod page_table;

pub mod debuginfo;

#[cfg(feature = "symbols")]
pub mod symbols;

// =============================================================================
// Interpreter
// =============================================================================

pub mod args;

pub mod parse;

pub mod config;

pub mod command;

pub mod monitor;

// =============================================================================
// Commands
// =============================================================================

pub mod backtrace;

pub mod mapping;

pub mod dump;

pub mod kerninfo;

// Re-export key types for convenience
pub use command::{Command, Flow};
pub use config::MonitorConfig;
pub use debuginfo::{DebugInfo, SymbolInfo};
pub use kerninfo::KernelLayout;
pub use monitor::{Console, Context, Monitor, TrapFrame};
pub use page_table::{PageTableEntry, PageWalker, Permissions};
pub use parse::ParsePolicy;
pub use platform::KernelMemory;

// =============================================================================
// Initialization
// =============================================================================

/// Initialize the monitor subsystem.
///
/// Installs `config` on the global monitor and reports the enabled features.
/// Call once during boot; the symbol table is loaded separately with
/// `init_with_symbols()`.
pub fn init(config: MonitorConfig) {
    info!("Initializing axmon...");
    info!(
        "  - {} commands, max {} args, {:?} number parsing",
        command::COMMANDS.len(),
        config.max_args,
        config.parse_policy
    );
    info!("  - backtrace limited to {} frames", config.max_frames);

    #[cfg(feature = "symbols")]
    info!("  - symbols module enabled (call init_with_symbols for backtrace names)");

    #[cfg(feature = "axhal")]
    info!("  - axhal platform enabled");

    monitor::configure(config);
    info!("axmon initialization complete");
}

/// Initialize the monitor subsystem with symbol table support.
///
/// # Arguments
/// * `config` - Monitor configuration
/// * `kallsyms_data` - The kallsyms.bin binary blob (static lifetime required)
/// * `stext` - Start address of kernel text section (_stext)
/// * `etext` - End address of kernel text section (_etext)
///
/// # Example
/// ```ignore
/// extern "C" {
///     static _stext: u8;
///     static _etext: u8;
/// }
/// let stext = unsafe { &_stext as *const u8 as u64 };
/// let etext = unsafe { &_etext as *const u8 as u64 };
/// axmon::init_with_symbols(config, include_bytes!("../../kallsyms.bin"), stext, etext);
/// ```
#[cfg(feature = "symbols")]
pub fn init_with_symbols(config: MonitorConfig, kallsyms_data: &'static [u8], stext: u64, etext: u64) {
    info!("  - kallsyms data at {:p}, len={}", kallsyms_data.as_ptr(), kallsyms_data.len());

    // The ksym library expects the blob to be page-aligned in memory.
    let ptr = kallsyms_data.as_ptr() as usize;
    if ptr % 4096 != 0 {
        warn!("    - kallsyms data is not page-aligned (ptr % 4096 = {})", ptr % 4096);
        warn!("    - this may cause parsing issues with ksym library");
    }

    match symbols::init(kallsyms_data, stext, etext) {
        Ok(()) => {
            info!("    - symbol table loaded ({} bytes)", kallsyms_data.len());
            info!("    - text range: {:#x} - {:#x}", stext, etext);
        }
        Err(e) => {
            error!("    - failed to load symbol table: {}", e);
        }
    }

    init(config);
}
