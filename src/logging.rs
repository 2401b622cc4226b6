use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info";

/// Installs the global stderr subscriber. An explicit filter wins over
/// `RUST_LOG`, which wins over `info`.
pub fn init_tracing(filter: Option<&str>) -> Result<()> {
    let env_filter = build_env_filter(filter)?;

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true),
        )
        .with(env_filter)
        .try_init()
        .context("failed to initialize tracing subscriber")?;

    tracing::debug!(target: "logging", "logging_initialized");
    Ok(())
}

fn build_env_filter(filter: Option<&str>) -> Result<EnvFilter> {
    match filter.map(str::trim).filter(|f| !f.is_empty()) {
        Some(filter) => EnvFilter::try_new(filter)
            .with_context(|| format!("failed to parse log filter '{filter}'")),
        None => Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))),
    }
}
