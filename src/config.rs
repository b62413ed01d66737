//! Process configuration: command-line flags that fall back to environment variables.
//!
//! A `.env` file in the working directory is loaded first, so local development can keep the
//! app registration's credentials out of the shell history.

// crates.io
use clap::Parser;
// self
use crate::{
	_prelude::*,
	auth::{ClientId, TenantId},
	authority::{Authority, DEFAULT_GRAPH_SCOPE, DEFAULT_LOGIN_HOST},
	error::ConfigError,
	graph::{
		DEFAULT_GRAPH_BASE, DEFAULT_HEALTH_ISSUE_PAGE_SIZE, DEFAULT_SIGN_IN_PAGE_SIZE, GraphSettings,
	},
	http::ReqwestHttpClient,
	obs::LogFormat,
	shape::DEFAULT_USAGE_WARNING_THRESHOLD,
	token::TokenProvider,
};

/// Runtime settings of the monitoring proxy.
#[derive(Clone, Parser)]
#[command(version, about)]
pub struct Settings {
	/// Directory (tenant) ID of the app registration.
	#[arg(long, env = "TENANT_ID")]
	pub tenant_id: String,
	/// Application (client) ID of the app registration.
	#[arg(long, env = "CLIENT_ID")]
	pub client_id: String,
	/// Client secret of the app registration.
	#[arg(long, env = "CLIENT_SECRET", hide_env_values = true)]
	pub client_secret: String,
	/// Comma-separated CORS origins; `*` allows any origin.
	#[arg(long, env = "ALLOWED_ORIGINS", default_value = "*")]
	pub allowed_origins: String,
	/// Address to bind.
	#[arg(long, env = "HOST", default_value = "0.0.0.0")]
	pub host: String,
	/// Port to bind.
	#[arg(long, env = "PORT", default_value_t = 8000)]
	pub port: u16,
	/// Login host of the identity platform.
	#[arg(long, env = "AUTHORITY_HOST", default_value = DEFAULT_LOGIN_HOST)]
	pub authority_host: Url,
	/// Versioned Microsoft Graph root.
	#[arg(long, env = "GRAPH_BASE_URL", default_value = DEFAULT_GRAPH_BASE)]
	pub graph_base_url: Url,
	/// Scope requested for the Graph token.
	#[arg(long, env = "GRAPH_SCOPE", default_value = DEFAULT_GRAPH_SCOPE)]
	pub graph_scope: String,
	/// Consumed-to-enabled ratio at which a license SKU is flagged.
	#[arg(long, env = "LICENSE_WARNING_THRESHOLD", default_value_t = DEFAULT_USAGE_WARNING_THRESHOLD)]
	pub license_warning_threshold: f64,
	/// Timeout, in seconds, for every upstream request.
	#[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
	pub request_timeout_secs: u64,
	/// `$top` used for the sign-ins query.
	#[arg(long, env = "SIGNIN_PAGE_SIZE", default_value_t = DEFAULT_SIGN_IN_PAGE_SIZE)]
	pub signin_page_size: u32,
	/// `$top` used for the service issues query.
	#[arg(long, env = "HEALTH_ISSUE_PAGE_SIZE", default_value_t = DEFAULT_HEALTH_ISSUE_PAGE_SIZE)]
	pub health_issue_page_size: u32,
	/// Log output format.
	#[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
	pub log_format: LogFormat,
}
impl Settings {
	/// Loads `.env` (when present) and parses flags and environment variables.
	pub fn load() -> Self {
		dotenvy::dotenv().ok();

		Self::parse()
	}

	/// Rejects values that would only fail later, at request time.
	pub fn validate(&self) -> Result<(), ConfigError> {
		TenantId::new(&self.tenant_id)?;
		ClientId::new(&self.client_id)?;

		if self.client_secret.is_empty() {
			return Err(ConfigError::invalid_setting("CLIENT_SECRET", "must not be empty"));
		}
		if !(self.license_warning_threshold > 0. && self.license_warning_threshold <= 1.) {
			return Err(ConfigError::invalid_setting(
				"LICENSE_WARNING_THRESHOLD",
				format!("{} is outside (0, 1]", self.license_warning_threshold),
			));
		}
		if self.request_timeout_secs == 0 {
			return Err(ConfigError::invalid_setting("REQUEST_TIMEOUT_SECS", "must not be zero"));
		}
		if self.signin_page_size == 0 {
			return Err(ConfigError::invalid_setting("SIGNIN_PAGE_SIZE", "must not be zero"));
		}
		if self.health_issue_page_size == 0 {
			return Err(ConfigError::invalid_setting("HEALTH_ISSUE_PAGE_SIZE", "must not be zero"));
		}
		if self.allowed_origins().is_empty() {
			return Err(ConfigError::invalid_setting("ALLOWED_ORIGINS", "lists no origin"));
		}

		Ok(())
	}

	/// Trimmed, non-empty entries of `ALLOWED_ORIGINS`.
	pub fn allowed_origins(&self) -> Vec<String> {
		self.allowed_origins
			.split(',')
			.map(str::trim)
			.filter(|origin| !origin.is_empty())
			.map(ToOwned::to_owned)
			.collect()
	}

	/// Upstream request timeout.
	pub fn request_timeout(&self) -> std::time::Duration {
		std::time::Duration::from_secs(self.request_timeout_secs)
	}

	/// Token endpoint descriptor for the configured tenant.
	pub fn authority(&self) -> Result<Authority, ConfigError> {
		let tenant = TenantId::new(&self.tenant_id)?;

		Ok(Authority::builder(tenant)
			.login_host(self.authority_host.clone())
			.scope(self.graph_scope.clone())
			.build()?)
	}

	/// Token provider for the configured service principal.
	pub fn token_provider(&self) -> Result<TokenProvider> {
		let client_id = ClientId::new(&self.client_id).map_err(ConfigError::from)?;
		let http_client = ReqwestHttpClient::with_timeout(self.request_timeout())?;

		Ok(TokenProvider::with_http_client(
			self.authority()?,
			client_id,
			self.client_secret.clone(),
			http_client,
		))
	}

	/// Graph client settings.
	pub fn graph_settings(&self) -> GraphSettings {
		GraphSettings::new(self.graph_base_url.clone())
			.with_page_sizes(self.health_issue_page_size, self.signin_page_size)
	}
}
impl Debug for Settings {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Settings")
			.field("tenant_id", &self.tenant_id)
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.field("allowed_origins", &self.allowed_origins)
			.field("host", &self.host)
			.field("port", &self.port)
			.field("authority_host", &self.authority_host.as_str())
			.field("graph_base_url", &self.graph_base_url.as_str())
			.field("graph_scope", &self.graph_scope)
			.field("license_warning_threshold", &self.license_warning_threshold)
			.field("request_timeout_secs", &self.request_timeout_secs)
			.field("signin_page_size", &self.signin_page_size)
			.field("health_issue_page_size", &self.health_issue_page_size)
			.field("log_format", &self.log_format)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn parse(extra: &[&str]) -> Settings {
		let mut args = vec![
			"m365-monitor",
			"--tenant-id",
			"contoso.onmicrosoft.com",
			"--client-id",
			"11111111-2222-3333-4444-555555555555",
			"--client-secret",
			"hunter2",
		];

		args.extend_from_slice(extra);

		Settings::try_parse_from(args).expect("Settings fixture should parse.")
	}

	#[test]
	fn defaults_match_the_public_cloud() {
		let settings = parse(&["--port", "8000", "--allowed-origins", "*"]);

		settings.validate().expect("Default settings should validate.");

		assert_eq!(settings.allowed_origins(), ["*"]);
		assert_eq!(settings.graph_base_url.as_str(), "https://graph.microsoft.com/v1.0");
		assert_eq!(
			settings.authority().expect("Authority should build.").token_endpoint.as_str(),
			"https://login.microsoftonline.com/contoso.onmicrosoft.com/oauth2/v2.0/token"
		);
		assert_eq!(settings.graph_settings().sign_in_page_size, 200);
		assert_eq!(settings.graph_settings().health_issue_page_size, 50);
	}

	#[test]
	fn origins_are_split_and_trimmed() {
		let settings =
			parse(&["--allowed-origins", " https://a.example.com , ,https://b.example.com"]);

		assert_eq!(settings.allowed_origins(), ["https://a.example.com", "https://b.example.com"]);
	}

	#[test]
	fn validate_rejects_out_of_range_values() {
		let err = parse(&["--license-warning-threshold", "1.5"])
			.validate()
			.expect_err("Threshold above one should be rejected.");

		assert!(err.to_string().contains("LICENSE_WARNING_THRESHOLD"));

		let err = parse(&["--signin-page-size", "0"])
			.validate()
			.expect_err("Zero page size should be rejected.");

		assert!(err.to_string().contains("SIGNIN_PAGE_SIZE"));

		let mut settings = parse(&[]);

		settings.tenant_id = "contoso tenant".into();

		assert!(matches!(settings.validate(), Err(ConfigError::Identifier(_))));
	}

	#[test]
	fn debug_redacts_the_secret() {
		assert!(!format!("{:?}", parse(&[])).contains("hunter2"));
	}
}
