use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for the daemon controller
#[derive(Debug, Error)]
pub enum DaemonError {
    // Lifecycle errors
    #[error("PID file {} exists (pid {pid}). Is the daemon already running?", path.display())]
    AlreadyRunning { pid: i32, path: PathBuf },

    #[error("Failed to detach process: {0}")]
    DetachmentFailure(String),

    #[cfg(unix)]
    #[error("Failed to signal process {pid}: {source}")]
    SignalDelivery {
        pid: i32,
        #[source]
        source: nix::errno::Errno,
    },

    #[error("Process {pid} still alive after {}s", waited.as_secs())]
    StopTimeout { pid: i32, waited: Duration },

    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid configuration file: {0}")]
    InvalidConfig(String),

    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // Entry point errors
    #[error("Command error: {0}")]
    CommandError(String),

    // IO errors (automatically converted from std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for daemon controller operations
pub type Result<T> = std::result::Result<T, DaemonError>;
