//! Tracing initialisation for the `page-watch` binary.
//!
//! Library code only emits `tracing` events; installing a subscriber is
//! left to the binary (or to an embedding application).

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the global tracing subscriber.
///
/// * `json` - emit newline-delimited JSON instead of human-readable lines
/// * `level` - verbosity used when `RUST_LOG` is not set
///
/// Logs go to stderr so stdout stays free for verdict output. Only the
/// first call in a process takes effect.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr).json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init()
            .ok();
    }
}
