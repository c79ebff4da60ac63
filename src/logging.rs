//! Subscriber setup for the binary
//!
//! Logs go to stderr so graph output on stdout stays pipeable. `RUST_LOG`
//! wins over `-v` when it is set.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Default filter for a `-v` count: warn, then debug, then trace
pub(crate) fn default_filter(verbose: u8) -> String {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    format!("infraviz={level},warn")
}

pub(crate) fn init(verbose: u8) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    // A second init (e.g. from tests) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .with(filter)
        .try_init();
}
