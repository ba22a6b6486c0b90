// Foreground command runner used as the daemon's entry point

use crate::daemon::{KillSender, SignalSender};
use anyhow::{Context, Result};
use std::process::{Command, ExitStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A command line to run inside the daemon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Split `argv` into program and arguments; `None` when empty
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

/// Run `spec` until it exits or this process is asked to terminate.
///
/// A SIGTERM (or SIGINT/SIGHUP) received by the daemon is forwarded to the
/// child as SIGTERM, and the child is waited for, so that the caller can
/// return normally and let the PID file cleanup run.
pub fn run_foreground(spec: &CommandSpec) -> Result<ExitStatus> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .context("Failed to install termination handler")?;

    let mut child = Command::new(&spec.program)
        .args(&spec.args)
        .spawn()
        .with_context(|| format!("Failed to spawn '{}'", spec.program))?;
    let pid = child.id() as i32;
    info!("Running '{}' as pid {}", spec.program, pid);

    loop {
        if let Some(status) = child.try_wait().context("Failed to poll child")? {
            info!("'{}' exited with {}", spec.program, status);
            return Ok(status);
        }

        if shutdown.load(Ordering::SeqCst) {
            info!("Termination requested, forwarding SIGTERM to {}", pid);
            if let Err(e) = KillSender.terminate(pid) {
                warn!("Failed to forward SIGTERM to {}: {}", pid, e);
            }
            let status = child.wait().context("Failed to wait for child")?;
            info!("'{}' exited with {}", spec.program, status);
            return Ok(status);
        }

        std::thread::sleep(POLL_INTERVAL);
    }
}

/// Map a child's exit status onto our own exit code
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            // A child we asked to stop counts as a clean shutdown
            if signal == nix::libc::SIGTERM {
                return 0;
            }
            return 128 + signal;
        }
    }
    1
}
