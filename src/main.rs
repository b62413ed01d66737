//! Binary entry point of the Microsoft 365 monitoring proxy.

// crates.io
use m365_monitor::{api, config::Settings, error::Result, obs};

#[tokio::main]
async fn main() -> Result<()> {
	let settings = Settings::load();

	obs::init_logging(settings.log_format)?;
	settings.validate()?;

	tracing::info!(
		tenant = %settings.tenant_id,
		graph = %settings.graph_base_url,
		origins = %settings.allowed_origins,
		"starting m365-monitor"
	);

	api::serve(&settings).await
}
