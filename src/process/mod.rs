// Process module - the command a daemon runs

pub mod runner;

pub use runner::{exit_code, run_foreground, CommandSpec};
