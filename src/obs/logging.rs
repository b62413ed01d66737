// crates.io
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
// self
use crate::{_prelude::*, error::ConfigError};

const DEFAULT_FILTER: &str = "info,tower_http=info";

/// Output format of the log subscriber.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
	/// Human-readable lines.
	#[default]
	Text,
	/// One JSON object per event.
	Json,
}

/// Installs the global `tracing` subscriber; `RUST_LOG` overrides the default filter.
pub fn init_logging(format: LogFormat) -> Result<()> {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
	let registry = tracing_subscriber::registry().with(filter);
	let installed = match format {
		LogFormat::Text => registry.with(fmt::layer().with_target(false)).try_init(),
		LogFormat::Json => registry.with(fmt::layer().json().with_current_span(true)).try_init(),
	};

	installed.map_err(|e| ConfigError::Logging { reason: e.to_string() }.into())
}
