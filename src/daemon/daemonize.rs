// Daemonization support for Unix systems

use super::pid::{parse_pid, InstanceGuard};
use crate::error::{DaemonError, Result};
use std::fs::{File, OpenOptions};
use std::path::Path;

/// Turns the calling process into a background daemon.
///
/// Only the final background process returns `Ok(())`; every intermediate
/// process exits inside `detach`. An error can surface in any generation of
/// the process tree and must end that process with a non-zero status.
pub trait Detacher {
    fn detach(&self, stdout: &Path, stderr: &Path, guard: &dyn InstanceGuard) -> Result<()>;
}

/// Classic double-fork detacher
#[derive(Debug, Default, Clone, Copy)]
pub struct ForkDetacher;

/// Open a redirection target for appending, creating it if needed
pub(crate) fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            DaemonError::DetachmentFailure(format!("Failed to open {}: {}", path.display(), e))
        })
}

/// Remove `path` only while it still names `pid`, so a daemon never deletes
/// a record written by its successor.
pub(crate) fn remove_if_owned(path: &Path, pid: i32) -> bool {
    let owned = std::fs::read_to_string(path)
        .ok()
        .and_then(|content| parse_pid(&content))
        == Some(pid);
    owned && std::fs::remove_file(path).is_ok()
}

#[cfg(unix)]
mod unix {
    use super::*;
    use nix::errno::Errno;
    use nix::libc;
    use nix::sys::stat::{umask, Mode};
    use nix::unistd::{fork, setsid, ForkResult};
    use std::io::Write;
    use std::os::unix::io::{AsRawFd, RawFd};
    use std::path::PathBuf;
    use std::sync::OnceLock;

    static CLEANUP_PATH: OnceLock<PathBuf> = OnceLock::new();

    extern "C" fn remove_pid_file() {
        if let Some(path) = CLEANUP_PATH.get() {
            remove_if_owned(path, std::process::id() as i32);
        }
    }

    fn fork_and_exit_parent(which: &str) -> Result<()> {
        match unsafe { fork() } {
            Ok(ForkResult::Parent { .. }) => std::process::exit(0),
            Ok(ForkResult::Child) => Ok(()),
            Err(e) => Err(DaemonError::DetachmentFailure(format!(
                "{} fork failed: {}",
                which, e
            ))),
        }
    }

    fn redirect(file: &File, target: RawFd, name: &str) -> Result<()> {
        if unsafe { libc::dup2(file.as_raw_fd(), target) } == -1 {
            return Err(DaemonError::DetachmentFailure(format!(
                "Failed to redirect {}: {}",
                name,
                Errno::last()
            )));
        }
        Ok(())
    }

    impl Detacher for ForkDetacher {
        fn detach(&self, stdout: &Path, stderr: &Path, guard: &dyn InstanceGuard) -> Result<()> {
            fork_and_exit_parent("First")?;

            // New session drops the controlling terminal
            setsid()
                .map_err(|e| DaemonError::DetachmentFailure(format!("setsid failed: {}", e)))?;
            umask(Mode::empty());

            // The session leader exits so the daemon can never reacquire a terminal
            fork_and_exit_parent("Second")?;

            let devnull = File::open("/dev/null").map_err(|e| {
                DaemonError::DetachmentFailure(format!("Failed to open /dev/null: {}", e))
            })?;
            redirect(&devnull, libc::STDIN_FILENO, "stdin")?;

            let _ = std::io::stderr().flush();
            let err_log = open_append(stderr)?;
            redirect(&err_log, libc::STDERR_FILENO, "stderr")?;

            let _ = std::io::stdout().flush();
            let out_log = open_append(stdout)?;
            redirect(&out_log, libc::STDOUT_FILENO, "stdout")?;

            let _ = CLEANUP_PATH.set(guard.path().to_path_buf());
            if unsafe { libc::atexit(remove_pid_file) } != 0 {
                return Err(DaemonError::DetachmentFailure(
                    "Failed to register PID file cleanup".to_string(),
                ));
            }

            let pid = std::process::id() as i32;
            guard.write(pid).map_err(|e| {
                DaemonError::DetachmentFailure(format!(
                    "Failed to write PID file {}: {}",
                    guard.path().display(),
                    e
                ))
            })?;

            tracing::info!("Detached as pid {}", pid);
            Ok(())
        }
    }
}

#[cfg(not(unix))]
impl Detacher for ForkDetacher {
    fn detach(&self, _stdout: &Path, _stderr: &Path, _guard: &dyn InstanceGuard) -> Result<()> {
        Err(DaemonError::DetachmentFailure(
            "Daemonization is only supported on Unix systems".to_string(),
        ))
    }
}
