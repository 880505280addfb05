//! Command line tokenizer.
//!
//! Splits one input line into whitespace separated tokens without copying
//! or mutating it. Tokens are `&str` views into the line, kept in a
//! fixed-capacity vector so tokenizing never allocates.

use core::ops::Index;

/// Hard capacity of an argument vector.
///
/// As with the classic monitor, one slot is reserved, so a line may carry at
/// most `MAX_ARGS - 1` tokens.
pub const MAX_ARGS: usize = 16;

/// Bytes that separate tokens.
const WHITESPACE: [char; 4] = ['\t', '\r', '\n', ' '];

/// The line held more tokens than the configured limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TooManyArgs {
    /// The configured argument limit.
    pub max: usize,
}

impl core::fmt::Display for TooManyArgs {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Too many arguments (max {})", self.max)
    }
}

impl core::error::Error for TooManyArgs {}

/// Tokens of one command line; `args[0]` is the command name.
#[derive(Clone, Copy)]
pub struct Args<'a> {
    argv: [&'a str; MAX_ARGS],
    argc: usize,
}

impl<'a> Args<'a> {
    /// Number of tokens, command name included.
    #[inline]
    pub fn len(&self) -> usize {
        self.argc
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.argc == 0
    }

    /// The command name, if the line had any token.
    #[inline]
    pub fn name(&self) -> Option<&'a str> {
        self.get(0)
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&'a str> {
        self.as_slice().get(index).copied()
    }

    #[inline]
    pub fn as_slice(&self) -> &[&'a str] {
        &self.argv[..self.argc]
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.as_slice().iter().copied()
    }
}

impl<'a> Index<usize> for Args<'a> {
    type Output = &'a str;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.as_slice()[index]
    }
}

impl core::fmt::Debug for Args<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

/// Split `line` into tokens.
///
/// # Arguments
/// * `line` - Raw input line
/// * `max_args` - Argument limit, clamped to `1..=MAX_ARGS`; at most
///   `max_args - 1` tokens are accepted
///
/// # Returns
/// The tokens, or [`TooManyArgs`] when the line holds more than the limit.
pub fn tokenize(line: &str, max_args: usize) -> Result<Args<'_>, TooManyArgs> {
    let max_args = max_args.clamp(1, MAX_ARGS);
    let limit = max_args - 1;

    let mut args = Args {
        argv: [""; MAX_ARGS],
        argc: 0,
    };

    for token in line.split(WHITESPACE).filter(|t| !t.is_empty()) {
        if args.argc == limit {
            return Err(TooManyArgs { max: max_args });
        }
        args.argv[args.argc] = token;
        args.argc += 1;
    }

    Ok(args)
}
