//! Log records of the `log` macros are forwarded to a `tracing` fmt subscriber.
use tracing::subscriber::set_global_default;
use tracing_log::LogTracer;
use tracing_subscriber::{fmt, EnvFilter};

use config::Logging;

pub const DEFAULT_LEVEL: &str = "info";

/// `RUST_LOG` wins over the configured level
pub fn init(logging: Option<&Logging>) {
    let level = logging.map_or(DEFAULT_LEVEL, |logging| logging.level.as_str());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if let Err(e) = LogTracer::init() {
        eprintln!("Log records are not forwarded: {}", e);
    }
    let subscriber = fmt().with_env_filter(filter).finish();
    if let Err(e) = set_global_default(subscriber) {
        eprintln!("Logging subscriber is already set: {}", e);
    }
}
