//! Logging initialization
//!
//! Structured `tracing` output configured from the `observability`
//! section of [`IntrigueConfig`](crate::config::IntrigueConfig). The
//! orchestrator and state machine emit spans and events; this module
//! only decides where and how they are rendered.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::ObservabilityConfig;
use crate::error::{ProtocolError, ProtocolResult};

/// Build the env filter for `config`. `RUST_LOG` overrides the
/// configured default level.
pub fn build_filter(config: &ObservabilityConfig) -> ProtocolResult<EnvFilter> {
    let level: Level = config
        .level
        .parse()
        .map_err(|_| ProtocolError::Configuration {
            message: format!("Unknown log level: {}", config.level),
            field: "observability.level".to_string(),
        })?;
    Ok(EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy())
}

/// Install the global subscriber. Call once at process startup.
pub fn init_logging(config: &ObservabilityConfig) -> ProtocolResult<()> {
    let filter = build_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    match (config.json, config.log_to_stderr) {
        (true, true) => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_span_events(fmt::format::FmtSpan::CLOSE)
                    .with_writer(std::io::stderr),
            )
            .init(),
        (true, false) => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_span_events(fmt::format::FmtSpan::CLOSE)
                    .with_writer(std::io::stdout),
            )
            .init(),
        (false, true) => registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init(),
        (false, false) => registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stdout))
            .init(),
    }

    Ok(())
}
