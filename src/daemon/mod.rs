// Daemon module - detachment, PID tracking and lifecycle control

pub mod daemonize;
pub mod manager;
pub mod pid;
pub mod signal;

pub use daemonize::{Detacher, ForkDetacher};
pub use manager::{DaemonController, DaemonStatus, StopOutcome};
pub use pid::{InstanceGuard, MemoryGuard, PidFile};
pub use signal::{Delivery, KillSender, SignalSender};
