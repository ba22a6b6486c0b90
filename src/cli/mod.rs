// CLI module - User-facing command-line interface

pub mod output;

use crate::config::DaemonConfig;
use crate::daemon::{DaemonController, DaemonStatus, InstanceGuard};
use crate::error::{DaemonError, Result};
use crate::process::{exit_code, run_foreground, CommandSpec};
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use output::ProcessDetails;
use std::path::PathBuf;

/// daemonctl - run a command as a detached daemon tracked by a PID file
#[derive(Parser, Debug)]
#[command(name = "daemonctl")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (.toml or .json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// PID file path
    #[arg(long, global = true)]
    pid_file: Option<PathBuf>,

    /// Log file receiving the daemon's stdout
    #[arg(long, global = true)]
    stdout: Option<PathBuf>,

    /// Log file receiving the daemon's stderr
    #[arg(long, global = true)]
    stderr: Option<PathBuf>,

    /// Pause between termination signals while stopping
    #[arg(long, global = true)]
    stop_interval_ms: Option<u64>,

    /// Give up stopping after this many seconds
    #[arg(long, global = true)]
    stop_timeout_secs: Option<u64>,

    /// Start even if the PID file names a dead process
    #[arg(long, global = true)]
    reclaim_stale: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Detach and run a command in the background
    Start {
        /// Command and arguments to run
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Stop the running daemon
    Stop,

    /// Stop the daemon, then start a command
    Restart {
        /// Command and arguments to run
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Check daemon status
    Status,
}

impl Cli {
    /// Run the CLI application, returning the process exit code
    pub fn run() -> Result<i32> {
        let cli = Cli::parse();
        cli.execute()
    }

    /// Execute the parsed command
    fn execute(&self) -> Result<i32> {
        let config = self.resolve_config()?;
        let controller = DaemonController::new(&config);

        match &self.command {
            Commands::Start { command } => {
                let spec = command_spec(command)?;
                let status = controller.start(|| run_foreground(&spec))?;
                finish(status)
            }

            Commands::Stop => {
                let outcome = controller.stop()?;
                output::print_stop_outcome(&outcome, controller.guard().path());
                Ok(0)
            }

            Commands::Restart { command } => {
                let spec = command_spec(command)?;
                let status = controller.restart(|| run_foreground(&spec))?;
                finish(status)
            }

            Commands::Status => {
                let status = controller.status();
                output::print_status(&status, process_details(&status).as_ref());
                Ok(if status.alive { 0 } else { 3 })
            }
        }
    }

    /// Config file (or defaults) with command-line overrides applied
    fn resolve_config(&self) -> Result<DaemonConfig> {
        let mut config = match &self.config {
            Some(path) => DaemonConfig::from_file(path)?,
            None => DaemonConfig::default(),
        };

        if let Some(path) = &self.pid_file {
            config.pid_file = path.clone();
        }
        if let Some(path) = &self.stdout {
            config.stdout = path.clone();
        }
        if let Some(path) = &self.stderr {
            config.stderr = path.clone();
        }
        if let Some(ms) = self.stop_interval_ms {
            config.stop_interval_ms = ms;
        }
        if let Some(secs) = self.stop_timeout_secs {
            config.stop_timeout_secs = Some(secs);
        }
        if self.reclaim_stale {
            config.reclaim_stale = true;
        }

        config.validate()?;
        Ok(config)
    }
}

fn command_spec(argv: &[String]) -> Result<CommandSpec> {
    CommandSpec::from_argv(argv)
        .ok_or_else(|| DaemonError::CommandError("No command given".to_string()))
}

/// Runs in the detached process once the command has returned
fn finish(status: anyhow::Result<std::process::ExitStatus>) -> Result<i32> {
    status
        .map(exit_code)
        .map_err(|e| DaemonError::CommandError(format!("{:#}", e)))
}

/// Memory and start time of the daemon, when it is alive
fn process_details(status: &DaemonStatus) -> Option<ProcessDetails> {
    use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

    let pid = status.pid.filter(|_| status.alive)?;
    let sys_pid = Pid::from_u32(pid as u32);

    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[sys_pid]),
        true,
        ProcessRefreshKind::new().with_memory(),
    );
    let process = system.process(sys_pid)?;

    Some(ProcessDetails {
        memory: process.memory(),
        started: DateTime::from_timestamp(process.start_time() as i64, 0)
            .map(|utc| utc.with_timezone(&Local)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parse_start_with_trailing_command() {
        let cli = Cli::try_parse_from([
            "daemonctl",
            "--pid-file",
            "/tmp/x.pid",
            "start",
            "sleep",
            "30",
        ])
        .unwrap();

        match &cli.command {
            Commands::Start { command } => assert_eq!(command, &["sleep", "30"]),
            other => panic!("unexpected command: {:?}", other),
        }
        assert_eq!(cli.pid_file, Some(PathBuf::from("/tmp/x.pid")));
    }

    #[test]
    fn test_parse_start_passes_hyphen_args() {
        let cli = Cli::try_parse_from(["daemonctl", "start", "--", "ls", "-la"]).unwrap();
        match &cli.command {
            Commands::Start { command } => assert_eq!(command, &["ls", "-la"]),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_start_requires_command() {
        assert!(Cli::try_parse_from(["daemonctl", "start"]).is_err());
        assert!(Cli::try_parse_from(["daemonctl", "restart"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["daemonctl", "stop", "--stop-timeout-secs", "5"]).unwrap();
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.stop_timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_resolve_config_overrides() {
        let cli = Cli::try_parse_from([
            "daemonctl",
            "--stdout",
            "/tmp/o.log",
            "--stop-interval-ms",
            "200",
            "--reclaim-stale",
            "status",
        ])
        .unwrap();

        let config = cli.resolve_config().unwrap();
        assert_eq!(config.stdout, PathBuf::from("/tmp/o.log"));
        assert_eq!(config.stderr, PathBuf::from("./daemon_err.log"));
        assert_eq!(config.stop_interval(), Duration::from_millis(200));
        assert!(config.reclaim_stale);
    }

    #[test]
    fn test_resolve_config_rejects_invalid_override() {
        let cli = Cli::try_parse_from(["daemonctl", "--stop-interval-ms", "0", "stop"]).unwrap();
        assert!(matches!(
            cli.resolve_config(),
            Err(DaemonError::ConfigValidationError(_))
        ));
    }
}
