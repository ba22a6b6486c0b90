// Output formatting and display for CLI

use crate::daemon::{DaemonStatus, StopOutcome};
use chrono::{DateTime, Local};
use colored::*;
use std::time::Duration;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

/// Live process details gathered for `status`
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessDetails {
    pub memory: u64,
    pub started: Option<DateTime<Local>>,
}

/// Print an error message to stderr
pub fn print_error(error: &str) {
    eprintln!("{} {}", "✗ Error:".red().bold(), error);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print a success message
pub fn print_success_msg(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Report the outcome of `stop`
pub fn print_stop_outcome(outcome: &StopOutcome, pid_file: &std::path::Path) {
    match outcome {
        StopOutcome::NotRunning => print_info(&format!(
            "PID file {} doesn't exist. Is the daemon not running?",
            pid_file.display()
        )),
        StopOutcome::Stopped { pid, attempts } => print_success_msg(&format!(
            "Daemon {} stopped ({} signal{})",
            pid,
            attempts,
            if *attempts == 1 { "" } else { "s" }
        )),
    }
}

/// Print a status table for the daemon
pub fn print_status(status: &DaemonStatus, details: Option<&ProcessDetails>) {
    #[derive(Tabled)]
    struct StatusRow {
        #[tabled(rename = "PID")]
        pid: String,
        #[tabled(rename = "State")]
        state: String,
        #[tabled(rename = "Memory")]
        memory: String,
        #[tabled(rename = "Uptime")]
        uptime: String,
        #[tabled(rename = "PID File")]
        pid_file: String,
    }

    let Some(pid) = status.pid else {
        println!("{}", "✗ Daemon is not running".red().bold());
        return;
    };

    let row = StatusRow {
        pid: pid.to_string(),
        state: format_state_colored(status),
        memory: details
            .map(|d| format_memory(d.memory))
            .unwrap_or_else(|| "-".to_string()),
        uptime: details
            .and_then(|d| d.started)
            .map(|started| {
                let elapsed = (Local::now() - started).to_std().unwrap_or_default();
                format!("{} (since {})", format_duration(&elapsed), started.format("%Y-%m-%d %H:%M:%S"))
            })
            .unwrap_or_else(|| "-".to_string()),
        pid_file: status.pid_file.display().to_string(),
    };

    let mut table = Table::new([row]);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    println!("\n{}\n", table);

    if status.is_stale() {
        println!(
            "{}",
            "PID file is stale; remove it or start with --reclaim-stale"
                .yellow()
                .italic()
        );
    }
}

/// Format the daemon state with color coding
fn format_state_colored(status: &DaemonStatus) -> String {
    if status.alive {
        "running".green().to_string()
    } else if status.is_stale() {
        "stale".red().bold().to_string()
    } else {
        "stopped".bright_black().to_string()
    }
}

/// Format a duration in human-readable format
fn format_duration(duration: &Duration) -> String {
    let secs = duration.as_secs();

    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        let mins = secs / 60;
        let secs = secs % 60;
        if secs > 0 {
            format!("{}m {}s", mins, secs)
        } else {
            format!("{}m", mins)
        }
    } else if secs < 86400 {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        if mins > 0 {
            format!("{}h {}m", hours, mins)
        } else {
            format!("{}h", hours)
        }
    } else {
        let days = secs / 86400;
        let hours = (secs % 86400) / 3600;
        if hours > 0 {
            format!("{}d {}h", days, hours)
        } else {
            format!("{}d", days)
        }
    }
}

/// Format memory usage in human-readable format
fn format_memory(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes < KB {
        format!("{}B", bytes)
    } else if bytes < MB {
        format!("{:.1}KB", bytes as f64 / KB as f64)
    } else if bytes < GB {
        format!("{:.1}MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.2}GB", bytes as f64 / GB as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn status(pid: Option<i32>, alive: bool) -> DaemonStatus {
        DaemonStatus {
            pid_file: PathBuf::from("./daemon.pid"),
            pid,
            alive,
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(&Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(&Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(&Duration::from_secs(3700)), "1h 1m");
        assert_eq!(format_duration(&Duration::from_secs(90000)), "1d 1h");
    }

    #[test]
    fn test_format_memory() {
        assert_eq!(format_memory(512), "512B");
        assert_eq!(format_memory(2048), "2.0KB");
        assert_eq!(format_memory(2 * 1024 * 1024), "2.0MB");
        assert_eq!(format_memory(3 * 1024 * 1024 * 1024), "3.00GB");
    }

    #[test]
    fn test_format_state() {
        colored::control::set_override(false);
        assert_eq!(format_state_colored(&status(Some(1), true)), "running");
        assert_eq!(format_state_colored(&status(Some(1), false)), "stale");
        assert_eq!(format_state_colored(&status(None, false)), "stopped");
    }
}
