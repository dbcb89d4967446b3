//! Logging setup for sigcalc.
//!
//! All diagnostics go to stderr so worker processes never pollute their
//! outbound result channel (stdout). The filter comes from `SIGCALC_LOG`
//! when set, otherwise from the `-v`/`-q` flags.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
pub fn init(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::try_from_env("SIGCALC_LOG")
        .unwrap_or_else(|_| EnvFilter::new(format!("sigcalc={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
