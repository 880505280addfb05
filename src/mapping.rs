//! Page mapping inspection and permission editing.
//!
//! - `showmappings`: report translation and permission bits for every page
//!   of a virtual range
//! - `setPerm`: rewrite the permission bits of one entry

use core::fmt::Write;

use axerrno::AxResult;

use crate::args::Args;
use crate::command::{CmdResult, Flow, parse_arg};
use crate::config::MonitorConfig;
use crate::page_table::{PAGE_SIZE, PERM_MASK, PageTableEntry, PageWalker, Permissions};

/// Print one inspected page.
fn print_entry(out: &mut dyn Write, vaddr: usize, pte: PageTableEntry) -> core::fmt::Result {
    write!(out, "Virtual address : {:#010x} ", vaddr)?;
    if pte.is_present() {
        let perms = pte.permissions();
        writeln!(
            out,
            "Physical page : {:#010x} PTE_P {} PTE_U {} PTE_W {}",
            pte.addr(),
            perms.contains(Permissions::PRESENT) as u8,
            perms.contains(Permissions::USER) as u8,
            perms.contains(Permissions::WRITABLE) as u8
        )
    } else {
        writeln!(out, "is not mapped!")
    }
}

/// Report every page of the inclusive range `[begin, end]`.
///
/// Starts at the page containing `begin`, so an unaligned range reports
/// every page it touches: `0x1800..=0x2100` covers the pages at 0x1000 and
/// 0x2000 (the classic monitor stepped from 0x1800 and reported one entry).
/// Entries are looked up with creation enabled; the first lookup failure
/// aborts the rest of the range.
///
/// # Returns
/// Number of pages reported.
pub fn show_mappings(
    out: &mut dyn Write,
    walker: &mut dyn PageWalker,
    begin: usize,
    end: usize,
) -> Result<usize, core::fmt::Error> {
    let mut vaddr = begin & !(PAGE_SIZE - 1);
    let mut pages = 0;

    while vaddr <= end {
        let pte = match walker.walk(vaddr, true) {
            Ok(entry) => *entry,
            Err(err) => {
                warn!("showmappings: walk {:#x} failed: {:?}", vaddr, err);
                writeln!(out, "Page walk error!")?;
                return Ok(pages);
            }
        };
        print_entry(out, vaddr, pte)?;
        pages += 1;

        match vaddr.checked_add(PAGE_SIZE) {
            Some(next) => vaddr = next,
            None => break,
        }
    }

    Ok(pages)
}

/// Replace the permission bits of the entry mapping `vaddr`.
///
/// Frame bits are left untouched and nothing checks that `perms` is a
/// coherent combination.
///
/// # Returns
/// The permissions before and after the edit.
pub fn set_permissions(
    walker: &mut dyn PageWalker,
    vaddr: usize,
    perms: Permissions,
) -> AxResult<(Permissions, Permissions)> {
    let entry = walker.walk(vaddr, true)?;
    let old = *entry;
    entry.replace_permissions(perms);
    trace!("setPerm: {:#x}: {:#x} -> {:#x}", vaddr, old.bits(), entry.bits());
    Ok((old.permissions(), entry.permissions()))
}

/// `showmappings <begin-address> <end-address>`
pub fn cmd_showmappings(
    out: &mut dyn Write,
    args: &Args<'_>,
    walker: &mut dyn PageWalker,
    config: &MonitorConfig,
) -> CmdResult {
    if args.len() != 3 {
        writeln!(out, "Usage: showmappings <begin-address> <end-address>")?;
        return Ok(Flow::Continue);
    }
    let Some(begin) = parse_arg(out, args[1], config.parse_policy)? else {
        return Ok(Flow::Continue);
    };
    let Some(end) = parse_arg(out, args[2], config.parse_policy)? else {
        return Ok(Flow::Continue);
    };

    writeln!(out, "Got args: {:#010x} {:#010x}", begin, end)?;
    let pages = show_mappings(out, walker, begin, end)?;
    debug!("showmappings: {} pages in {:#x}..={:#x}", pages, begin, end);
    Ok(Flow::Continue)
}

/// `setPerm <virtual-address> <permission>`
pub fn cmd_set_perm(
    out: &mut dyn Write,
    args: &Args<'_>,
    walker: &mut dyn PageWalker,
    config: &MonitorConfig,
) -> CmdResult {
    if args.len() != 3 {
        writeln!(out, "Usage: setPerm <virtual-address> <permission>")?;
        return Ok(Flow::Continue);
    }
    let Some(vaddr) = parse_arg(out, args[1], config.parse_policy)? else {
        return Ok(Flow::Continue);
    };
    let Some(raw) = parse_arg(out, args[2], config.parse_policy)? else {
        return Ok(Flow::Continue);
    };
    if raw & !PERM_MASK != 0 {
        warn!("setPerm: ignoring bits {:#x} above the permission field", raw & !PERM_MASK);
    }

    match set_permissions(walker, vaddr, Permissions::from_raw(raw)) {
        Ok((old, new)) => writeln!(
            out,
            "{:#010x}: perm {:#05x} -> {:#05x}",
            vaddr,
            old.bits(),
            new.bits()
        )?,
        Err(err) => {
            warn!("setPerm: walk {:#x} failed: {:?}", vaddr, err);
            writeln!(out, "Page walk error!")?;
        }
    }
    Ok(Flow::Continue)
}
