//! Page table entries, permission bits and the walker collaborator.
//!
//! The monitor never owns page tables. It reaches them through a
//! [`PageWalker`], which carries its own root, so nothing here reads a global
//! page directory.
//!
//! Entry layout: the low 12 bits hold permission/flag bits and bits [51:12]
//! hold the page frame address. Attribute bits above the frame (NX,
//! protection keys) are not part of the address and are never rewritten.

use axerrno::AxResult;
use bitflags::bitflags;

/// Page size (4KB)
pub const PAGE_SIZE: usize = 0x1000;

/// Low bits of an entry that carry permissions.
pub const PERM_MASK: usize = 0xfff;

/// Frame address bits of an entry (bits [51:12]).
#[cfg(target_pointer_width = "64")]
pub const FRAME_MASK: usize = 0x000F_FFFF_FFFF_F000;
#[cfg(not(target_pointer_width = "64"))]
pub const FRAME_MASK: usize = !PERM_MASK;

bitflags! {
    /// Permission and status bits stored in the low 12 bits of an entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Permissions: usize {
        const PRESENT = 1 << 0;
        const WRITABLE = 1 << 1;
        const USER = 1 << 2;
        const WRITE_THROUGH = 1 << 3;
        const CACHE_DISABLE = 1 << 4;
        const ACCESSED = 1 << 5;
        const DIRTY = 1 << 6;
        /// Entry maps a large page instead of pointing to a table.
        const HUGE = 1 << 7;
        const GLOBAL = 1 << 8;
        /// Bits left to the OS.
        const AVAIL = 0b111 << 9;
    }
}

impl Permissions {
    /// Set the bits in `set` and clear the bits in `clear`.
    ///
    /// Bits present in both end up set.
    #[inline]
    pub fn merge(self, set: Self, clear: Self) -> Self {
        self.difference(clear).union(set)
    }

    /// Build a permission set from an operator supplied value.
    ///
    /// Only the low 12 bits are kept.
    #[inline]
    pub const fn from_raw(raw: usize) -> Self {
        Self::from_bits_retain(raw & PERM_MASK)
    }
}

/// A single leaf page table entry.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
#[repr(transparent)]
pub struct PageTableEntry(usize);

impl PageTableEntry {
    /// Create an entry from its raw value.
    #[inline]
    pub const fn from_bits(bits: usize) -> Self {
        Self(bits)
    }

    /// Create an entry mapping `frame` with `perms`.
    #[inline]
    pub const fn page(frame: usize, perms: Permissions) -> Self {
        Self((frame & FRAME_MASK) | (perms.bits() & PERM_MASK))
    }

    /// Get the raw value.
    #[inline]
    pub const fn bits(self) -> usize {
        self.0
    }

    /// Physical frame address, without the attribute bits above it.
    #[inline]
    pub const fn addr(self) -> usize {
        self.0 & FRAME_MASK
    }

    #[inline]
    pub const fn permissions(self) -> Permissions {
        Permissions::from_bits_retain(self.0 & PERM_MASK)
    }

    #[inline]
    pub const fn is_present(self) -> bool {
        self.0 & Permissions::PRESENT.bits() != 0
    }

    /// Replace the low 12 bits with `perms`, keeping the frame bits.
    ///
    /// This is the only operation that rewrites an entry in place.
    #[inline]
    pub fn replace_permissions(&mut self, perms: Permissions) {
        self.0 = (self.0 & !PERM_MASK) | (perms.bits() & PERM_MASK);
    }
}

impl core::fmt::Debug for PageTableEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_present() {
            write!(f, "PTE(addr={:#x}, perms={:?})", self.addr(), self.permissions())
        } else {
            write!(f, "PTE(not present, raw={:#x})", self.0)
        }
    }
}

/// Page table walker provided by the memory subsystem.
pub trait PageWalker {
    /// Locate the leaf entry for `vaddr`.
    ///
    /// When `create` is set, missing intermediate tables are allocated; an
    /// allocation failure is reported as `NoMemory`. The returned entry may be
    /// non-present.
    fn walk(&mut self, vaddr: usize, create: bool) -> AxResult<&mut PageTableEntry>;
}

// =============================================================================
// x86_64 4-level walker
// =============================================================================

/// Entries per table level.
#[cfg(target_pointer_width = "64")]
const ENTRIES_PER_TABLE: usize = 512;

/// Permissions given to freshly allocated intermediate tables.
#[cfg(target_pointer_width = "64")]
const TABLE_PERMS: Permissions = Permissions::PRESENT
    .union(Permissions::WRITABLE)
    .union(Permissions::USER);

/// 4-level x86_64 page table rooted at a physical address.
///
/// Table memory is reached through a linear physical mapping
/// (`virt = phys + phys_offset`). New tables come from `alloc_frame`, which
/// returns the physical address of a free frame or `None` when memory is
/// exhausted.
#[cfg(target_pointer_width = "64")]
pub struct X86PageTable<F> {
    root: usize,
    phys_offset: usize,
    alloc_frame: F,
}

#[cfg(target_pointer_width = "64")]
impl<F: FnMut() -> Option<usize>> X86PageTable<F> {
    /// Create a walker over the table rooted at physical address `root`.
    pub fn new(root: usize, phys_offset: usize, alloc_frame: F) -> Self {
        Self {
            root: root & FRAME_MASK,
            phys_offset,
            alloc_frame,
        }
    }

    /// Physical address of the root table.
    pub fn root(&self) -> usize {
        self.root
    }

    fn table_entry(&self, table_phys: usize, index: usize) -> *mut PageTableEntry {
        debug_assert!(index < ENTRIES_PER_TABLE);
        let table = table_phys.wrapping_add(self.phys_offset) as *mut PageTableEntry;
        table.wrapping_add(index)
    }

    /// Descend one level, allocating the next table when allowed.
    ///
    /// # Safety
    /// `entry` must point to a live entry of a table owned by this walker.
    unsafe fn next_table(&mut self, entry: *mut PageTableEntry, create: bool) -> AxResult<usize> {
        // SAFETY: guaranteed by the caller.
        let current = unsafe { entry.read_volatile() };
        if current.is_present() {
            return Ok(current.bits() & FRAME_MASK);
        }
        if !create {
            return axerrno::ax_err!(NotFound, "intermediate table missing");
        }

        let Some(frame) = (self.alloc_frame)() else {
            return axerrno::ax_err!(NoMemory, "no frame for page table");
        };
        let frame = frame & FRAME_MASK;
        let table = frame.wrapping_add(self.phys_offset) as *mut u8;
        // SAFETY: the allocator handed us an unused frame, reachable through
        // the linear mapping.
        unsafe {
            core::ptr::write_bytes(table, 0, PAGE_SIZE);
            entry.write_volatile(PageTableEntry::page(frame, TABLE_PERMS));
        }
        trace!("page_table: allocated table {:#x}", frame);
        Ok(frame)
    }
}

#[cfg(target_pointer_width = "64")]
impl<F: FnMut() -> Option<usize>> PageWalker for X86PageTable<F> {
    fn walk(&mut self, vaddr: usize, create: bool) -> AxResult<&mut PageTableEntry> {
        let indices = [
            (vaddr >> 39) & 0x1ff,
            (vaddr >> 30) & 0x1ff,
            (vaddr >> 21) & 0x1ff,
        ];

        let mut table = self.root;
        for (level, index) in indices.into_iter().enumerate() {
            let entry = self.table_entry(table, index);
            // SAFETY: `table` is the root or a table reached through a present
            // descriptor, so `entry` lies inside a live table.
            let current = unsafe { entry.read_volatile() };
            if level > 0 && current.is_present() && current.permissions().contains(Permissions::HUGE) {
                trace!("page_table: large page at level {} for {:#x}", level, vaddr);
                // SAFETY: as above; the borrow is tied to `&mut self`.
                return Ok(unsafe { &mut *entry });
            }
            table = unsafe { self.next_table(entry, create)? };
        }

        let leaf = self.table_entry(table, (vaddr >> 12) & 0x1ff);
        // SAFETY: `table` was reached through present descriptors.
        Ok(unsafe { &mut *leaf })
    }
}
