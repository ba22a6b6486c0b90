// Logging setup

use tracing_subscriber::EnvFilter;

/// Install the global subscriber, writing to stderr.
///
/// Must run before detaching: the subscriber writes through the stderr file
/// descriptor, so once it is redirected the daemon's logs follow it into the
/// stderr log file.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
