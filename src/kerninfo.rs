//! Kernel image layout report (`kerninfo`).

use core::fmt::Write;

use crate::command::{CmdResult, Flow};

/// Link-time addresses of the kernel image.
///
/// `start` is the physical load address; the others are virtual addresses
/// linked above `kernbase`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KernelLayout {
    pub start: usize,
    pub entry: usize,
    pub etext: usize,
    pub edata: usize,
    pub end: usize,
    pub kernbase: usize,
}

impl KernelLayout {
    /// Physical address of a kernel virtual address.
    #[inline]
    pub fn phys(&self, vaddr: usize) -> usize {
        vaddr.wrapping_sub(self.kernbase)
    }

    /// Size of the loaded image in KiB, rounded up.
    pub fn footprint_kb(&self) -> usize {
        self.end.wrapping_sub(self.entry).div_ceil(1024)
    }
}

/// `kerninfo`: display information about the kernel.
pub fn cmd_kerninfo(out: &mut dyn Write, layout: &KernelLayout) -> CmdResult {
    writeln!(out, "Special kernel symbols:")?;
    writeln!(out, "  _start                  {:08x} (phys)", layout.start)?;
    for (name, vaddr) in [
        ("entry", layout.entry),
        ("etext", layout.etext),
        ("edata", layout.edata),
        ("end", layout.end),
    ] {
        writeln!(
            out,
            "  {:<6} {:08x} (virt)  {:08x} (phys)",
            name,
            vaddr,
            layout.phys(vaddr)
        )?;
    }
    writeln!(
        out,
        "Kernel executable memory footprint: {}KB",
        layout.footprint_kb()
    )?;
    Ok(Flow::Continue)
}
