// 📝 Logging - tracing subscriber on stderr
//
// stdout carries the report (and the generated registration script),
// so every diagnostic goes to stderr.

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the filter: RUST_LOG wins, otherwise the configured default level
pub fn build_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Call once from main.
pub fn init_logging(default_level: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(build_filter(default_level))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init()?;

    Ok(())
}
