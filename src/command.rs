//! Command registry.
//!
//! The set of commands is closed: [`Command`] names every one of them and
//! [`Command::run`] dispatches with a single exhaustive match. [`COMMANDS`]
//! is the registration-ordered table used by both `help` and lookup.

use core::fmt::Write;

use crate::args::Args;
use crate::backtrace::cmd_backtrace;
use crate::config::MonitorConfig;
use crate::dump::{cmd_vpm, cmd_vvm};
use crate::kerninfo::cmd_kerninfo;
use crate::mapping::{cmd_set_perm, cmd_showmappings};
use crate::monitor::Context;
use crate::parse::{ParsePolicy, parse_number};

/// What the REPL does after a command returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next line.
    Continue,
    /// Leave the monitor.
    Exit,
}

impl Flow {
    /// Integer status: negative means exit.
    pub const fn code(self) -> i32 {
        match self {
            Self::Continue => 0,
            Self::Exit => -1,
        }
    }

    pub const fn from_code(code: i32) -> Self {
        if code < 0 { Self::Exit } else { Self::Continue }
    }
}

/// Result of a command handler. The error only reports a failed console write.
pub type CmdResult = Result<Flow, core::fmt::Error>;

/// Every command the monitor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    KernInfo,
    Backtrace,
    ShowMappings,
    SetPerm,
    Vvm,
    Vpm,
    Continue,
}

/// Registry entry.
#[derive(Debug)]
pub struct CommandDesc {
    pub name: &'static str,
    pub desc: &'static str,
    pub command: Command,
}

/// All commands in registration order.
pub static COMMANDS: &[CommandDesc] = &[
    CommandDesc {
        name: "help",
        desc: "Display this list of commands",
        command: Command::Help,
    },
    CommandDesc {
        name: "kerninfo",
        desc: "Display information about the kernel",
        command: Command::KernInfo,
    },
    CommandDesc {
        name: "backtrace",
        desc: "Display all the outstanding stack frames",
        command: Command::Backtrace,
    },
    CommandDesc {
        name: "showmappings",
        desc: "Display memory mappings",
        command: Command::ShowMappings,
    },
    CommandDesc {
        name: "setPerm",
        desc: "Set permission of a virtual page",
        command: Command::SetPerm,
    },
    CommandDesc {
        name: "vvm",
        desc: "Dump contents of certain virtual memory",
        command: Command::Vvm,
    },
    CommandDesc {
        name: "vpm",
        desc: "Dump contents of certain physical memory",
        command: Command::Vpm,
    },
    CommandDesc {
        name: "continue",
        desc: "Leave the monitor and resume the trapped context",
        command: Command::Continue,
    },
];

impl Command {
    /// Find a command by exact, case-sensitive name.
    pub fn lookup(name: &str) -> Option<Self> {
        COMMANDS.iter().find(|c| c.name == name).map(|c| c.command)
    }

    pub fn name(self) -> &'static str {
        COMMANDS
            .iter()
            .find(|c| c.command == self)
            .map_or("?", |c| c.name)
    }

    /// Run the command with the tokens of its line.
    pub fn run(
        self,
        args: &Args<'_>,
        ctx: &mut Context<'_>,
        config: &MonitorConfig,
        out: &mut dyn Write,
    ) -> CmdResult {
        match self {
            Self::Help => cmd_help(out),
            Self::KernInfo => cmd_kerninfo(out, &ctx.layout),
            Self::Backtrace => cmd_backtrace(out, ctx.memory, ctx.debug_info, config),
            Self::ShowMappings => cmd_showmappings(out, args, ctx.page_table, config),
            Self::SetPerm => cmd_set_perm(out, args, ctx.page_table, config),
            Self::Vvm => cmd_vvm(out, args, ctx.memory, config),
            Self::Vpm => cmd_vpm(out, args, ctx.memory, config),
            Self::Continue => cmd_continue(out, ctx),
        }
    }
}

/// Parse a numeric argument, reporting failures on the console.
///
/// Returns `Ok(None)` when the token was rejected and the command should stop.
pub(crate) fn parse_arg(
    out: &mut dyn Write,
    token: &str,
    policy: ParsePolicy,
) -> Result<Option<usize>, core::fmt::Error> {
    match parse_number(token, policy) {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            writeln!(out, "Invalid number '{}': {}", token, err)?;
            Ok(None)
        }
    }
}

/// `help`: list every command in registration order.
pub fn cmd_help(out: &mut dyn Write) -> CmdResult {
    for c in COMMANDS {
        writeln!(out, "{} - {}", c.name, c.desc)?;
    }
    Ok(Flow::Continue)
}

/// `continue`: leave the monitor when it was entered from a trap.
pub fn cmd_continue(out: &mut dyn Write, ctx: &Context<'_>) -> CmdResult {
    if ctx.trap.is_none() {
        writeln!(out, "No trapped context to resume")?;
        return Ok(Flow::Continue);
    }
    info!("monitor: resuming trapped context");
    Ok(Flow::Exit)
}
