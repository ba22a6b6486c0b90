// Termination signal delivery and liveness probing

use crate::error::Result;

/// Outcome of a single termination request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The signal was queued for a live process
    Delivered,
    /// The target no longer exists
    NoSuchProcess,
}

/// Sends signals to other processes by PID
pub trait SignalSender {
    /// Ask `pid` to shut down gracefully (SIGTERM)
    fn terminate(&self, pid: i32) -> Result<Delivery>;

    /// Whether `pid` still exists
    fn is_alive(&self, pid: i32) -> bool;
}

/// `kill(2)` based sender
#[derive(Debug, Default, Clone, Copy)]
pub struct KillSender;

#[cfg(unix)]
impl SignalSender for KillSender {
    fn terminate(&self, pid: i32) -> Result<Delivery> {
        use crate::error::DaemonError;
        use nix::errno::Errno;
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        match kill(Pid::from_raw(pid), Signal::SIGTERM) {
            Ok(()) if is_zombie(pid) => Ok(Delivery::NoSuchProcess),
            Ok(()) => Ok(Delivery::Delivered),
            Err(Errno::ESRCH) => Ok(Delivery::NoSuchProcess),
            Err(source) => Err(DaemonError::SignalDelivery { pid, source }),
        }
    }

    fn is_alive(&self, pid: i32) -> bool {
        use nix::errno::Errno;
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        // Signal 0 only checks for existence
        match kill(Pid::from_raw(pid), None) {
            Ok(()) => !is_zombie(pid),
            Err(Errno::EPERM) => true, // exists, owned by someone else
            Err(_) => false,
        }
    }
}

/// An exited process nobody has reaped yet still accepts signals.
/// Orphaned daemons end up like this under an init that never waits.
#[cfg(target_os = "linux")]
fn is_zombie(pid: i32) -> bool {
    // The state field follows the parenthesised command name
    std::fs::read_to_string(format!("/proc/{}/stat", pid))
        .ok()
        .and_then(|stat| {
            let (_, rest) = stat.rsplit_once(')')?;
            rest.trim_start().chars().next()
        })
        == Some('Z')
}

#[cfg(all(unix, not(target_os = "linux")))]
fn is_zombie(_pid: i32) -> bool {
    false
}

#[cfg(not(unix))]
impl SignalSender for KillSender {
    fn terminate(&self, _pid: i32) -> Result<Delivery> {
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "Signal delivery is only supported on Unix systems",
        )
        .into())
    }

    fn is_alive(&self, _pid: i32) -> bool {
        // Without a probe, trust the PID file
        true
    }
}
