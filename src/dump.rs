//! Raw memory dumps.
//!
//! - `vvm`: dump words at a virtual address
//! - `vpm`: dump words at a physical address, through its kernel alias
//!
//! Nothing checks that the range is mapped. A read of unmapped memory
//! faults and is handled (or not) by the host kernel.

use core::fmt::Write;
use core::mem::size_of;

use crate::args::Args;
use crate::command::{CmdResult, Flow, parse_arg};
use crate::config::MonitorConfig;
use crate::platform::KernelMemory;

const WORD: usize = size_of::<usize>();

/// Address space the base address of a dump belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrKind {
    Virtual,
    Physical,
}

/// Dump `count` words starting at `base`.
///
/// Each line is annotated with the word's address in the space `base` was
/// given in. The dump stops early if the address arithmetic would overflow.
///
/// # Returns
/// Number of words printed.
pub fn dump_words(
    out: &mut dyn Write,
    memory: &dyn KernelMemory,
    kind: AddrKind,
    base: usize,
    count: usize,
) -> Result<usize, core::fmt::Error> {
    let start = match kind {
        AddrKind::Virtual => base,
        AddrKind::Physical => memory.phys_to_virt(base),
    };

    for i in 0..count {
        let Some(vaddr) = i.checked_mul(WORD).and_then(|off| start.checked_add(off)) else {
            warn!("dump: stopping at word {}, address overflows", i);
            return Ok(i);
        };
        // SAFETY: operator supplied address; faults belong to the host.
        let value = unsafe { memory.read_word(vaddr) };
        let shown = match kind {
            AddrKind::Virtual => vaddr,
            AddrKind::Physical => memory.virt_to_phys(vaddr),
        };
        writeln!(out, "Value of {:#010x} is {:#010x}", shown, value)?;
    }
    Ok(count)
}

fn cmd_dump(
    out: &mut dyn Write,
    args: &Args<'_>,
    memory: &dyn KernelMemory,
    config: &MonitorConfig,
    kind: AddrKind,
) -> CmdResult {
    if args.len() != 3 {
        let usage = match kind {
            AddrKind::Virtual => "Usage: vvm <virtual-address> <num>",
            AddrKind::Physical => "Usage: vpm <physical-address> <num>",
        };
        writeln!(out, "{}", usage)?;
        return Ok(Flow::Continue);
    }
    let Some(base) = parse_arg(out, args[1], config.parse_policy)? else {
        return Ok(Flow::Continue);
    };
    let Some(count) = parse_arg(out, args[2], config.parse_policy)? else {
        return Ok(Flow::Continue);
    };

    debug!("{}: {} words at {:#x}", args[0], count, base);
    dump_words(out, memory, kind, base, count)?;
    Ok(Flow::Continue)
}

/// `vvm <virtual-address> <num>`
pub fn cmd_vvm(
    out: &mut dyn Write,
    args: &Args<'_>,
    memory: &dyn KernelMemory,
    config: &MonitorConfig,
) -> CmdResult {
    cmd_dump(out, args, memory, config, AddrKind::Virtual)
}

/// `vpm <physical-address> <num>`
pub fn cmd_vpm(
    out: &mut dyn Write,
    args: &Args<'_>,
    memory: &dyn KernelMemory,
    config: &MonitorConfig,
) -> CmdResult {
    cmd_dump(out, args, memory, config, AddrKind::Physical)
}
