//! Kernel monitor: dispatcher and read-eval-print loop.
//!
//! ```ignore
//! use axmon::monitor::{Context, Monitor};
//!
//! let mut ctx = Context {
//!     page_table: &mut kernel_page_table,
//!     memory: &platform,
//!     debug_info: &axmon::symbols::KallsymsResolver,
//!     layout,
//!     trap: Some(&trap_frame),
//! };
//! axmon::monitor::monitor(&mut console, &mut ctx);
//! ```

use alloc::string::String;
use core::fmt::Write;
use core::sync::atomic::{AtomicBool, Ordering};
use spin::Mutex;

use crate::args::tokenize;
use crate::command::{Command, Flow};
use crate::config::MonitorConfig;
use crate::debuginfo::DebugInfo;
use crate::kerninfo::KernelLayout;
use crate::page_table::PageWalker;
use crate::platform::KernelMemory;

/// Machine state captured by the kernel's trap dispatch.
pub trait TrapFrame {
    /// Print the captured state (`print_trapframe`).
    fn print(&self, out: &mut dyn Write) -> core::fmt::Result;
}

/// Line oriented console provided by the kernel.
pub trait Console: Write {
    /// Print `prompt` and read one line; `None` at end of input.
    fn read_line(&mut self, prompt: &str) -> Option<String>;
}

/// Everything a command may touch.
pub struct Context<'a> {
    /// Page table under inspection, with its own root.
    pub page_table: &'a mut dyn PageWalker,
    /// Memory access and address translation.
    pub memory: &'a dyn KernelMemory,
    /// Resolver for return addresses.
    pub debug_info: &'a dyn DebugInfo,
    /// Kernel image layout for `kerninfo`.
    pub layout: KernelLayout,
    /// Trap that entered the monitor, if any.
    pub trap: Option<&'a dyn TrapFrame>,
}

/// Log every dispatched line
static ECHO_COMMANDS: AtomicBool = AtomicBool::new(false);

/// Enable or disable logging of every dispatched command line.
pub fn set_echo_commands(enabled: bool) {
    ECHO_COMMANDS.store(enabled, Ordering::SeqCst);
    info!(
        "monitor command echo: {}",
        if enabled { "enabled" } else { "disabled" }
    );
}

/// Check if command echo is enabled
pub fn is_echo_commands() -> bool {
    ECHO_COMMANDS.load(Ordering::SeqCst)
}

/// A monitor session.
pub struct Monitor {
    config: MonitorConfig,
}

impl Monitor {
    pub const fn new(config: MonitorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: MonitorConfig) {
        self.config = config;
    }

    /// Tokenize and execute one line.
    ///
    /// Empty lines, over-long lines and unknown commands print (at most) a
    /// message and return [`Flow::Continue`]. Otherwise the handler's flow is
    /// returned.
    pub fn runcmd(&self, line: &str, out: &mut dyn Write, ctx: &mut Context<'_>) -> Flow {
        let args = match tokenize(line, self.config.max_args) {
            Ok(args) => args,
            Err(err) => {
                let _ = writeln!(out, "{}", err);
                return Flow::Continue;
            }
        };

        let Some(name) = args.name() else {
            return Flow::Continue;
        };

        if is_echo_commands() {
            info!("monitor: {:?}", args);
        }

        let Some(command) = Command::lookup(name) else {
            let _ = writeln!(out, "Unknown command '{}'", name);
            return Flow::Continue;
        };

        debug!("monitor: dispatch {:?} argc={}", command, args.len());
        command
            .run(&args, ctx, &self.config, out)
            .unwrap_or(Flow::Continue)
    }

    /// Run the read-eval-print loop until end of input or a command exits.
    pub fn run<C: Console>(&self, console: &mut C, ctx: &mut Context<'_>) {
        let _ = writeln!(console, "Welcome to the kernel monitor!");
        let _ = writeln!(console, "Type 'help' for a list of commands.");

        if let Some(trap) = ctx.trap {
            let _ = trap.print(console);
        }

        while let Some(line) = console.read_line(self.config.prompt) {
            if self.runcmd(&line, console, ctx) == Flow::Exit {
                break;
            }
        }
        debug!("monitor: leaving");
    }
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new(MonitorConfig::DEFAULT)
    }
}

// =============================================================================
// Global Monitor
// =============================================================================

static MONITOR: Mutex<Monitor> = Mutex::new(Monitor::new(MonitorConfig::DEFAULT));

/// Replace the configuration of the global monitor.
pub fn configure(config: MonitorConfig) {
    MONITOR.lock().set_config(config);
}

/// Current configuration of the global monitor.
pub fn config() -> MonitorConfig {
    MONITOR.lock().config().clone()
}

/// Enter the global monitor.
///
/// The lock is only held while the configuration is copied out. The session
/// itself runs unlocked, so a fault taken inside a command may enter the
/// monitor again on the same CPU.
pub fn monitor<C: Console>(console: &mut C, ctx: &mut Context<'_>) {
    let session = Monitor::new(config());
    session.run(console, ctx);
}
