//! Monitor configuration.

use core::ops::Range;

use crate::args::MAX_ARGS;
use crate::parse::ParsePolicy;

/// Default bound on the number of frames a backtrace walks.
pub const DEFAULT_MAX_FRAMES: usize = 64;

/// Runtime configuration of a [`Monitor`](crate::monitor::Monitor).
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Argument limit per line (see [`crate::args::tokenize`]).
    pub max_args: usize,
    /// Maximum number of frames printed by `backtrace`.
    pub max_frames: usize,
    /// How malformed numeric arguments are treated.
    pub parse_policy: ParsePolicy,
    /// Prompt printed before each line.
    pub prompt: &'static str,
    /// Address range every frame pointer must fall into, when known.
    pub stack_bounds: Option<Range<usize>>,
}

impl MonitorConfig {
    pub const DEFAULT: Self = Self {
        max_args: MAX_ARGS,
        max_frames: DEFAULT_MAX_FRAMES,
        parse_policy: ParsePolicy::Strict,
        prompt: "K> ",
        stack_bounds: None,
    };

    pub fn with_max_args(mut self, max_args: usize) -> Self {
        self.max_args = max_args;
        self
    }

    pub fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = max_frames;
        self
    }

    pub fn with_parse_policy(mut self, policy: ParsePolicy) -> Self {
        self.parse_policy = policy;
        self
    }

    pub fn with_prompt(mut self, prompt: &'static str) -> Self {
        self.prompt = prompt;
        self
    }

    /// Restrict frame pointers to `bounds` (typically the current kernel stack).
    pub fn with_stack_bounds(mut self, bounds: Range<usize>) -> Self {
        self.stack_bounds = Some(bounds);
        self
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
