//! Frame-pointer stack unwinding.
//!
//! Each frame starts at its frame pointer `fp`:
//!
//! ```text
//! fp + 0      saved frame pointer of the caller (0 in the root frame)
//! fp + W      return address
//! fp + 2W..   five argument words
//! ```
//!
//! where `W` is the machine word size. [`FrameChain`] walks this list. Every
//! frame pointer is checked before it is dereferenced, saved frame pointers
//! must move strictly up the stack, and the walk is bounded, so a corrupted
//! chain ends the walk with an [`UnwindError`] instead of looping.

use core::fmt::Write;
use core::mem::size_of;
use core::ops::Range;

use crate::command::{CmdResult, Flow};
use crate::config::{DEFAULT_MAX_FRAMES, MonitorConfig};
use crate::debuginfo::{DebugInfo, SymbolInfo};
use crate::platform::KernelMemory;

/// Argument words printed per frame.
pub const ARG_WORDS: usize = 5;

const WORD: usize = size_of::<usize>();

/// Bytes of one frame read by the unwinder.
const FRAME_SPAN: usize = (2 + ARG_WORDS) * WORD;

/// One reconstructed stack frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Frame pointer of this frame.
    pub fp: usize,
    /// Return address saved in this frame.
    pub ret: usize,
    /// Words following the return address.
    pub args: [usize; ARG_WORDS],
}

/// Why a walk stopped before reaching the root frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnwindError {
    /// Frame pointer is not word aligned.
    Misaligned(usize),
    /// Frame lies outside the stack bounds or the address space.
    OutOfBounds(usize),
    /// Saved frame pointer does not move up the stack.
    NotAscending { fp: usize, saved: usize },
    /// More frames than the configured limit.
    TooDeep(usize),
}

impl core::fmt::Display for UnwindError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Misaligned(fp) => write!(f, "misaligned frame pointer {:#x}", fp),
            Self::OutOfBounds(fp) => write!(f, "frame pointer {:#x} outside the stack", fp),
            Self::NotAscending { fp, saved } => {
                write!(f, "saved frame pointer {:#x} below frame {:#x}", saved, fp)
            }
            Self::TooDeep(max) => write!(f, "more than {} frames", max),
        }
    }
}

impl core::error::Error for UnwindError {}

/// Bounded iterator over a frame-pointer chain.
///
/// Yields frames until the frame pointer becomes zero. After an error the
/// iterator is exhausted.
pub struct FrameChain<'a> {
    memory: &'a dyn KernelMemory,
    fp: usize,
    prev: Option<usize>,
    depth: usize,
    max_depth: usize,
    bounds: Option<Range<usize>>,
    done: bool,
}

impl<'a> FrameChain<'a> {
    /// Walk the chain starting at frame pointer `fp`.
    pub fn new(memory: &'a dyn KernelMemory, fp: usize) -> Self {
        Self {
            memory,
            fp,
            prev: None,
            depth: 0,
            max_depth: DEFAULT_MAX_FRAMES,
            bounds: None,
            done: false,
        }
    }

    /// Walk from the current frame pointer of `memory`.
    pub fn current(memory: &'a dyn KernelMemory) -> Self {
        Self::new(memory, memory.frame_pointer())
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_bounds(mut self, bounds: Option<Range<usize>>) -> Self {
        self.bounds = bounds;
        self
    }

    fn check(&self, fp: usize) -> Result<(), UnwindError> {
        if fp % WORD != 0 {
            return Err(UnwindError::Misaligned(fp));
        }
        let end = fp.checked_add(FRAME_SPAN).ok_or(UnwindError::OutOfBounds(fp))?;
        if let Some(bounds) = &self.bounds {
            if fp < bounds.start || end > bounds.end {
                return Err(UnwindError::OutOfBounds(fp));
            }
        }
        if let Some(prev) = self.prev {
            if fp <= prev {
                return Err(UnwindError::NotAscending { fp: prev, saved: fp });
            }
        }
        Ok(())
    }

    fn fail(&mut self, err: UnwindError) -> Option<Result<Frame, UnwindError>> {
        self.done = true;
        Some(Err(err))
    }
}

impl Iterator for FrameChain<'_> {
    type Item = Result<Frame, UnwindError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.fp == 0 {
            return None;
        }
        if self.depth == self.max_depth {
            return self.fail(UnwindError::TooDeep(self.max_depth));
        }
        if let Err(err) = self.check(self.fp) {
            return self.fail(err);
        }

        let fp = self.fp;
        let read = |i: usize| {
            // SAFETY: `fp` passed the alignment/bounds checks and the whole
            // frame span fits in the address space. Mapping faults are left
            // to the host kernel.
            unsafe { self.memory.read_word(fp + i * WORD) }
        };
        let saved = read(0);
        let ret = read(1);
        let mut args = [0usize; ARG_WORDS];
        for (i, arg) in args.iter_mut().enumerate() {
            *arg = read(2 + i);
        }

        self.prev = Some(fp);
        self.fp = saved;
        self.depth += 1;
        Some(Ok(Frame { fp, ret, args }))
    }
}

/// Print one frame and its resolved source location.
pub fn print_frame(out: &mut dyn Write, frame: &Frame, debug_info: &dyn DebugInfo) -> core::fmt::Result {
    let [a0, a1, a2, a3, a4] = frame.args;
    writeln!(
        out,
        "ebp {:08x} eip {:08x} args {:08x} {:08x} {:08x} {:08x} {:08x}",
        frame.fp, frame.ret, a0, a1, a2, a3, a4
    )?;

    let info = debug_info
        .resolve(frame.ret)
        .unwrap_or_else(|| SymbolInfo::unknown(frame.ret));
    writeln!(
        out,
        "\t{}:{}: {}+{}",
        info.file,
        info.line,
        info.name(),
        info.offset(frame.ret)
    )
}

/// Print the whole chain starting at `fp`.
///
/// # Returns
/// Number of frames printed.
pub fn print_backtrace(
    out: &mut dyn Write,
    memory: &dyn KernelMemory,
    debug_info: &dyn DebugInfo,
    fp: usize,
    config: &MonitorConfig,
) -> Result<usize, core::fmt::Error> {
    writeln!(out, "Stack backtrace:")?;

    let chain = FrameChain::new(memory, fp)
        .with_max_depth(config.max_frames)
        .with_bounds(config.stack_bounds.clone());

    let mut printed = 0;
    for frame in chain {
        match frame {
            Ok(frame) => {
                print_frame(out, &frame, debug_info)?;
                printed += 1;
            }
            Err(err) => {
                warn!("backtrace: stopped after {} frames: {}", printed, err);
                writeln!(out, "Backtrace stopped: {}", err)?;
            }
        }
    }
    Ok(printed)
}

/// `backtrace`: display all the outstanding stack frames.
pub fn cmd_backtrace(
    out: &mut dyn Write,
    memory: &dyn KernelMemory,
    debug_info: &dyn DebugInfo,
    config: &MonitorConfig,
) -> CmdResult {
    let fp = memory.frame_pointer();
    debug!("backtrace: starting at fp {:#x}", fp);
    print_backtrace(out, memory, debug_info, fp, config)?;
    Ok(Flow::Continue)
}
