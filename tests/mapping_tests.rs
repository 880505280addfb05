//! Integration tests for `showmappings`, `setPerm` and the x86_64 walker.

mod common;

use axmon::mapping::{set_permissions, show_mappings};
use axmon::page_table::{PAGE_SIZE, PageTableEntry, PageWalker, Permissions};
use axmon::Flow;
use common::{Harness, MockPageTable, lines_starting};

fn mapped_harness() -> Harness {
    let mut h = Harness::new();
    h.page_table.map(0x1000, 0x0020_0000 | 0x7);
    h.page_table.map(0x3000, 0x0030_0000 | 0x1);
    h
}

// =============================================================================
// showmappings
// =============================================================================

#[test]
fn test_showmappings_reports_each_page() {
    let mut h = mapped_harness();
    let (flow, out) = h.run("showmappings 0x0 0x3000");
    assert_eq!(flow, Flow::Continue);

    let expected = "\
Got args: 0x00000000 0x00003000
Virtual address : 0x00000000 is not mapped!
Virtual address : 0x00001000 Physical page : 0x00200000 PTE_P 1 PTE_U 1 PTE_W 1
Virtual address : 0x00002000 is not mapped!
Virtual address : 0x00003000 Physical page : 0x00300000 PTE_P 1 PTE_U 0 PTE_W 0
";
    assert_eq!(out, expected);
    assert!(h.page_table.walks.iter().all(|&(_, create)| create));
}

#[test]
fn test_showmappings_single_page() {
    let mut h = mapped_harness();
    let (_, out) = h.run("showmappings 0x1000 0x1000");
    assert_eq!(lines_starting(&out, "Virtual address").len(), 1);
    assert_eq!(h.page_table.walks, [(0x1000, true)]);
}

#[test]
fn test_showmappings_aligns_begin_down() {
    let mut h = mapped_harness();
    let (_, out) = h.run("showmappings 0x1234 0x1fff");
    assert_eq!(
        lines_starting(&out, "Virtual address"),
        ["Virtual address : 0x00001000 Physical page : 0x00200000 PTE_P 1 PTE_U 1 PTE_W 1"]
    );
}

#[test]
fn test_showmappings_unaligned_range_covers_both_pages() {
    let mut h = mapped_harness();
    h.page_table.map(0x2000, 0x0025_0000 | 0x1);
    let (_, out) = h.run("showmappings 0x1800 0x2100");
    assert_eq!(
        lines_starting(&out, "Virtual address"),
        [
            "Virtual address : 0x00001000 Physical page : 0x00200000 PTE_P 1 PTE_U 1 PTE_W 1",
            "Virtual address : 0x00002000 Physical page : 0x00250000 PTE_P 1 PTE_U 0 PTE_W 0",
        ]
    );
}

#[cfg(target_pointer_width = "64")]
#[test]
fn test_showmappings_reports_frame_of_nx_page() {
    let mut h = Harness::new();
    h.page_table.map(0x1000, (1 << 63) | 0x0020_0000 | 0x3);
    let (_, out) = h.run("showmappings 0x1000 0x1000");
    assert_eq!(
        lines_starting(&out, "Virtual address"),
        ["Virtual address : 0x00001000 Physical page : 0x00200000 PTE_P 1 PTE_U 0 PTE_W 1"]
    );

    // setPerm leaves the NX bit alone
    h.run("setPerm 0x1000 0x1");
    assert_eq!(h.page_table.entry(0x1000).unwrap().bits(), (1 << 63) | 0x0020_0001);
}

#[test]
fn test_showmappings_empty_when_begin_after_end() {
    let mut h = mapped_harness();
    let (flow, out) = h.run("showmappings 0x3000 0x1000");
    assert_eq!(flow, Flow::Continue);
    assert_eq!(out, "Got args: 0x00003000 0x00001000\n");
    assert!(h.page_table.walks.is_empty());
}

#[test]
fn test_showmappings_aborts_on_walk_failure() {
    let mut h = mapped_harness();
    h.page_table.fail_from = Some(0x2000);
    let (flow, out) = h.run("showmappings 0x0 0x5000");
    assert_eq!(flow, Flow::Continue);

    assert_eq!(lines_starting(&out, "Virtual address").len(), 2);
    assert!(out.ends_with("Page walk error!\n"));
    assert_eq!(h.page_table.walks.len(), 3);
}

#[test]
fn test_showmappings_stops_at_end_of_address_space() {
    let mut table = MockPageTable::new();
    let mut out = String::new();
    let top = usize::MAX & !(PAGE_SIZE - 1);
    let pages = show_mappings(&mut out, &mut table, top - PAGE_SIZE, usize::MAX).unwrap();
    assert_eq!(pages, 2);
}

#[test]
fn test_showmappings_usage() {
    let mut h = Harness::new();
    for line in ["showmappings", "showmappings 0x1000", "showmappings 1 2 3"] {
        let (flow, out) = h.run(line);
        assert_eq!(flow, Flow::Continue);
        assert_eq!(out, "Usage: showmappings <begin-address> <end-address>\n");
    }
    assert!(h.page_table.walks.is_empty());
}

// =============================================================================
// setPerm
// =============================================================================

#[test]
fn test_set_perm_keeps_frame() {
    let mut h = Harness::new();
    h.page_table.map(0x1000, 0x0020_0000 | 0x1);
    let (flow, out) = h.run("setPerm 0x1000 0x7");
    assert_eq!(flow, Flow::Continue);
    assert_eq!(out, "0x00001000: perm 0x001 -> 0x007\n");

    let pte = h.page_table.entry(0x1000).unwrap();
    assert_eq!(pte.addr(), 0x0020_0000);
    assert_eq!(pte.permissions(), Permissions::PRESENT | Permissions::WRITABLE | Permissions::USER);
}

#[test]
fn test_set_perm_ignores_high_bits() {
    let mut h = Harness::new();
    h.page_table.map(0x1000, 0x0020_0000 | 0x7);
    let (_, out) = h.run("setPerm 0x1000 0x12003");
    assert_eq!(out, "0x00001000: perm 0x007 -> 0x003\n");
    assert_eq!(h.page_table.entry(0x1000).unwrap().bits(), 0x0020_0003);
}

#[test]
fn test_set_perm_walk_failure_writes_nothing() {
    let mut h = Harness::new();
    h.page_table.fail_from = Some(0);
    let (flow, out) = h.run("setPerm 0x1000 0x7");
    assert_eq!(flow, Flow::Continue);
    assert_eq!(out, "Page walk error!\n");
    assert!(h.page_table.entry(0x1000).is_none());
}

#[test]
fn test_set_perm_rejects_bad_numbers() {
    let mut h = Harness::new();
    let (_, out) = h.run("setPerm 0x1000 rw");
    assert_eq!(out, "Invalid number 'rw': invalid digit 'r' at offset 0\n");
    assert!(h.page_table.walks.is_empty());
}

#[test]
fn test_set_perm_usage() {
    let mut h = Harness::new();
    for line in ["setPerm", "setPerm 0x1000", "setPerm 0x1000 0x7 0x1"] {
        let (_, out) = h.run(line);
        assert_eq!(out, "Usage: setPerm <virtual-address> <permission>\n");
    }
    assert!(h.page_table.walks.is_empty());
}

#[test]
fn test_set_permissions_reports_old_and_new() {
    let mut table = MockPageTable::new();
    table.map(0x5000, 0x0040_0000 | 0x3);
    let (old, new) = set_permissions(&mut table, 0x5abc, Permissions::PRESENT).unwrap();
    assert_eq!(old, Permissions::PRESENT | Permissions::WRITABLE);
    assert_eq!(new, Permissions::PRESENT);
    assert_eq!(table.entry(0x5000), Some(PageTableEntry::from_bits(0x0040_0001)));
}

// =============================================================================
// x86_64 walker
// =============================================================================

#[cfg(target_pointer_width = "64")]
mod x86 {
    use super::*;
    use axmon::page_table::X86PageTable;

    #[repr(C, align(4096))]
    struct Table([usize; 512]);

    /// A zeroed table that lives for the rest of the test binary.
    fn leak_table() -> usize {
        Box::leak(Box::new(Table([0; 512]))) as *mut Table as usize
    }

    #[test]
    fn test_walk_allocates_intermediate_tables() {
        let root = leak_table();
        let mut allocated = 0;
        let mut pt = X86PageTable::new(root, 0, || {
            allocated += 1;
            Some(leak_table())
        });
        assert_eq!(pt.root(), root);

        let vaddr = 0x0000_7f12_3456_7000;
        let entry = pt.walk(vaddr, true).unwrap();
        assert!(!entry.is_present());
        *entry = PageTableEntry::page(0x0080_0000, Permissions::PRESENT | Permissions::WRITABLE);

        // Reaching the same entry again needs no new tables
        let entry = pt.walk(vaddr, false).unwrap();
        assert_eq!(entry.addr(), 0x0080_0000);
        drop(pt);
        assert_eq!(allocated, 3);
    }

    #[test]
    fn test_walk_without_create_reports_missing_table() {
        let root = leak_table();
        let mut pt = X86PageTable::new(root, 0, || Some(leak_table()));
        let err = pt.walk(0x4000_0000, false).unwrap_err();
        assert!(matches!(err, axerrno::AxError::NotFound));
    }

    #[test]
    fn test_walk_reports_allocation_failure() {
        let root = leak_table();
        let mut pt = X86PageTable::new(root, 0, || None);
        assert!(pt.walk(0x1000, true).is_err());

        let mut out = String::new();
        show_mappings(&mut out, &mut pt, 0x1000, 0x1000).unwrap();
        assert_eq!(out, "Page walk error!\n");
    }

    #[test]
    fn test_set_perm_through_x86_walker() {
        let root = leak_table();
        let mut pt = X86PageTable::new(root, 0, || Some(leak_table()));
        *pt.walk(0x2000, true).unwrap() = PageTableEntry::page(0x0090_0000, Permissions::PRESENT);

        set_permissions(&mut pt, 0x2000, Permissions::from_raw(0x7)).unwrap();
        let entry = pt.walk(0x2000, false).unwrap();
        assert_eq!(entry.addr(), 0x0090_0000);
        assert_eq!(entry.permissions().bits(), 0x7);
    }
}
