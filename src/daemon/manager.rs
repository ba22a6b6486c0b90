// Daemon lifecycle management

use super::daemonize::{Detacher, ForkDetacher};
use super::pid::{InstanceGuard, PidFile};
use super::signal::{Delivery, KillSender, SignalSender};
use crate::config::DaemonConfig;
use crate::error::{DaemonError, Result};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Result of a `stop` call that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// There was no PID record, nothing was signalled
    NotRunning,
    /// The process is gone and its record removed
    Stopped { pid: i32, attempts: u32 },
}

/// Daemon status information
#[derive(Debug, Clone)]
pub struct DaemonStatus {
    pub pid_file: PathBuf,
    pub pid: Option<i32>,
    pub alive: bool,
}

impl DaemonStatus {
    /// A record exists but its process does not
    pub fn is_stale(&self) -> bool {
        self.pid.is_some() && !self.alive
    }
}

/// Starts, stops and restarts a single daemon tracked by an instance guard.
///
/// The controller keeps no state of its own between calls; everything it
/// knows about the daemon comes from the guard.
pub struct DaemonController<G = PidFile, D = ForkDetacher, S = KillSender> {
    guard: G,
    detacher: D,
    signals: S,
    stdout: PathBuf,
    stderr: PathBuf,
    stop_interval: Duration,
    stop_timeout: Option<Duration>,
    reclaim_stale: bool,
}

impl DaemonController {
    /// Controller backed by the PID file, double fork and `kill(2)`
    pub fn new(config: &DaemonConfig) -> Self {
        Self::with_parts(
            config,
            PidFile::with_path(&config.pid_file),
            ForkDetacher,
            KillSender,
        )
    }
}

impl<G: InstanceGuard, D: Detacher, S: SignalSender> DaemonController<G, D, S> {
    /// Controller with custom backends; `config.pid_file` is ignored in favour of `guard`
    pub fn with_parts(config: &DaemonConfig, guard: G, detacher: D, signals: S) -> Self {
        Self {
            guard,
            detacher,
            signals,
            stdout: config.stdout.clone(),
            stderr: config.stderr.clone(),
            stop_interval: config.stop_interval(),
            stop_timeout: config.stop_timeout(),
            reclaim_stale: config.reclaim_stale,
        }
    }

    pub fn with_stop_interval(mut self, interval: Duration) -> Self {
        self.stop_interval = interval;
        self
    }

    pub fn with_stop_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn guard(&self) -> &G {
        &self.guard
    }

    /// Detach and run `entry` in the background process.
    ///
    /// Refused with `AlreadyRunning` while a PID record exists, live or not,
    /// unless stale reclaiming is enabled. On success this returns only in
    /// the detached process, after the PID record has been written and the
    /// standard streams redirected.
    pub fn start<F, T>(&self, entry: F) -> Result<T>
    where
        F: FnOnce() -> T,
    {
        if let Some(pid) = self.guard.read() {
            if self.reclaim_stale && !self.signals.is_alive(pid) {
                warn!(
                    "Removing stale PID file {} (process {} no longer running)",
                    self.guard.path().display(),
                    pid
                );
                self.guard.remove()?;
            } else {
                return Err(DaemonError::AlreadyRunning {
                    pid,
                    path: self.guard.path().to_path_buf(),
                });
            }
        }

        info!(
            "Starting daemon (stdout: {}, stderr: {})",
            self.stdout.display(),
            self.stderr.display()
        );
        self.detacher
            .detach(&self.stdout, &self.stderr, &self.guard)?;

        Ok(entry())
    }

    /// Send SIGTERM until the recorded process is gone, then drop the record.
    ///
    /// Blocks without limit unless a stop timeout is configured. Any signal
    /// error other than "no such process" aborts and leaves the record in
    /// place.
    pub fn stop(&self) -> Result<StopOutcome> {
        let Some(pid) = self.guard.read() else {
            info!(
                "PID file {} doesn't exist. Is the daemon not running?",
                self.guard.path().display()
            );
            return Ok(StopOutcome::NotRunning);
        };

        info!("Stopping daemon (PID: {})...", pid);

        let started = Instant::now();
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.signals.terminate(pid)? {
                Delivery::NoSuchProcess => {
                    self.guard.remove()?;
                    info!("Daemon {} stopped after {} signal(s)", pid, attempts);
                    return Ok(StopOutcome::Stopped { pid, attempts });
                }
                Delivery::Delivered => debug!("SIGTERM delivered to {}", pid),
            }

            if let Some(timeout) = self.stop_timeout {
                let waited = started.elapsed();
                if waited >= timeout {
                    return Err(DaemonError::StopTimeout { pid, waited });
                }
            }

            std::thread::sleep(self.stop_interval);
        }
    }

    /// `stop` followed by `start`; another caller may start in between
    pub fn restart<F, T>(&self, entry: F) -> Result<T>
    where
        F: FnOnce() -> T,
    {
        self.stop()?;
        self.start(entry)
    }

    /// Get daemon status information
    pub fn status(&self) -> DaemonStatus {
        let pid = self.guard.read();
        DaemonStatus {
            pid_file: self.guard.path().to_path_buf(),
            pid,
            alive: pid.is_some_and(|pid| self.signals.is_alive(pid)),
        }
    }
}
