//! Shared mocks for the integration tests.
//!
//! Each mock stands in for one kernel collaborator of the monitor.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::fmt::Write;

use axerrno::AxResult;
use axmon::debuginfo::{DebugInfo, SymbolInfo};
use axmon::kerninfo::KernelLayout;
use axmon::monitor::{Console, Context, Monitor, TrapFrame};
use axmon::page_table::{PageTableEntry, PageWalker};
use axmon::platform::MockPlatform;
use axmon::Flow;

pub const WORD: usize = std::mem::size_of::<usize>();

// =============================================================================
// Page table
// =============================================================================

/// Sparse page table keyed by page address.
///
/// Walks at or above `fail_from` fail as if no table frame could be
/// allocated.
#[derive(Default)]
pub struct MockPageTable {
    entries: BTreeMap<usize, PageTableEntry>,
    pub fail_from: Option<usize>,
    pub walks: Vec<(usize, bool)>,
}

impl MockPageTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(&mut self, vaddr: usize, raw: usize) {
        self.entries.insert(vaddr & !0xfff, PageTableEntry::from_bits(raw));
    }

    pub fn entry(&self, vaddr: usize) -> Option<PageTableEntry> {
        self.entries.get(&(vaddr & !0xfff)).copied()
    }
}

impl PageWalker for MockPageTable {
    fn walk(&mut self, vaddr: usize, create: bool) -> AxResult<&mut PageTableEntry> {
        self.walks.push((vaddr, create));
        let page = vaddr & !0xfff;
        if self.fail_from.is_some_and(|limit| page >= limit) {
            return axerrno::ax_err!(NoMemory, "mock page table exhausted");
        }
        if !create && !self.entries.contains_key(&page) {
            return axerrno::ax_err!(NotFound, "mock pte missing");
        }
        Ok(self.entries.entry(page).or_default())
    }
}

// =============================================================================
// Debug info
// =============================================================================

/// Resolver over a fixed list of functions.
#[derive(Default)]
pub struct MockDebugInfo {
    functions: Vec<(usize, usize, SymbolInfo)>,
}

impl MockDebugInfo {
    pub fn add(&mut self, fn_addr: usize, size: usize, file: &str, line: u32, name: &str, name_len: usize) {
        self.functions.push((
            fn_addr,
            size,
            SymbolInfo {
                file: file.to_string(),
                line,
                fn_name: name.to_string(),
                fn_name_len: name_len,
                fn_addr,
            },
        ));
    }
}

impl DebugInfo for MockDebugInfo {
    fn resolve(&self, pc: usize) -> Option<SymbolInfo> {
        self.functions
            .iter()
            .find(|(start, size, _)| pc >= *start && pc < start + size)
            .map(|(_, _, info)| info.clone())
    }
}

// =============================================================================
// Console and trap frame
// =============================================================================

/// Console fed from a queue of lines; everything written is captured.
#[derive(Default)]
pub struct MockConsole {
    input: VecDeque<String>,
    pub output: String,
    pub reads: usize,
}

impl MockConsole {
    pub fn with_lines(lines: &[&str]) -> Self {
        Self {
            input: lines.iter().map(|l| l.to_string()).collect(),
            ..Self::default()
        }
    }
}

impl Write for MockConsole {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        self.output.push_str(s);
        Ok(())
    }
}

impl Console for MockConsole {
    fn read_line(&mut self, prompt: &str) -> Option<String> {
        self.output.push_str(prompt);
        self.reads += 1;
        self.input.pop_front()
    }
}

pub struct MockTrap {
    pub trapno: usize,
}

impl TrapFrame for MockTrap {
    fn print(&self, out: &mut dyn Write) -> std::fmt::Result {
        writeln!(out, "TRAP frame: trapno {:#x}", self.trapno)
    }
}

// =============================================================================
// Harness
// =============================================================================

/// Owns one of every collaborator and hands out monitor contexts.
pub struct Harness {
    pub page_table: MockPageTable,
    pub memory: MockPlatform,
    pub debug_info: MockDebugInfo,
    pub layout: KernelLayout,
    pub trap: Option<MockTrap>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            page_table: MockPageTable::new(),
            memory: MockPlatform::new(),
            debug_info: MockDebugInfo::default(),
            layout: KernelLayout::default(),
            trap: None,
        }
    }

    pub fn ctx(&mut self) -> Context<'_> {
        Context {
            page_table: &mut self.page_table,
            memory: &self.memory,
            debug_info: &self.debug_info,
            layout: self.layout,
            trap: self.trap.as_ref().map(|t| t as &dyn TrapFrame),
        }
    }

    /// Run one line on a default monitor.
    pub fn run(&mut self, line: &str) -> (Flow, String) {
        self.run_with(&Monitor::default(), line)
    }

    pub fn run_with(&mut self, monitor: &Monitor, line: &str) -> (Flow, String) {
        let mut out = String::new();
        let flow = monitor.runcmd(line, &mut out, &mut self.ctx());
        (flow, out)
    }
}

/// Lines of `output` that start with `prefix`.
pub fn lines_starting<'a>(output: &'a str, prefix: &str) -> Vec<&'a str> {
    output.lines().filter(|l| l.starts_with(prefix)).collect()
}
