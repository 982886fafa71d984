//! Logging bootstrap shared by binaries and integration harnesses.

use crate::config::LogConfig;

/// Initialize the global tracing subscriber from a [`LogConfig`].
///
/// `VEIL_LOG` (standard `RUST_LOG` syntax) overrides the configured level.
/// Calling this twice is an error from tracing's side, so it returns the
/// init result instead of panicking.
pub fn init(config: &LogConfig) -> anyhow::Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_env("VEIL_LOG")
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    match config.format.as_str() {
        "json" => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("tracing init: {e}")),
        _ => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("tracing init: {e}")),
    }
}
