//! Identity platform descriptor (data) and token error strategy (behavior).
//!
//! [`Authority`] pins the token endpoint and scope for a single tenant; the login host can be
//! swapped for sovereign clouds or tests. [`TokenErrorStrategy`] maps token endpoint failures
//! into the crate's error taxonomy without depending on any HTTP client type.

pub mod strategy;

pub use strategy::*;

// self
use crate::{_prelude::*, auth::TenantId};

/// Public-cloud login host.
pub const DEFAULT_LOGIN_HOST: &str = "https://login.microsoftonline.com";
/// App-only scope that grants every Graph application permission consented for the app.
pub const DEFAULT_GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Errors raised while constructing or validating an [`Authority`].
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum AuthorityError {
	/// Endpoints must use HTTPS.
	#[error("The token endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Login host cannot carry a path segment for the tenant.
	#[error("The login host cannot be used as a base URL: {url}.")]
	UnusableLoginHost {
		/// Offending URL.
		url: String,
	},
	/// Scope must be a single non-empty token.
	#[error("Scope `{scope}` must be non-empty and must not contain whitespace.")]
	InvalidScope {
		/// Offending scope value.
		scope: String,
	},
}

/// Immutable token endpoint descriptor consumed by the token provider.
///
/// The client secret always travels in the form body, as the Microsoft identity platform
/// documents for the client-credentials grant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Authority {
	/// Tenant the service principal lives in.
	pub tenant: TenantId,
	/// Fully qualified `/{tenant}/oauth2/v2.0/token` endpoint.
	pub token_endpoint: Url,
	/// Scope requested in every grant.
	pub scope: String,
}
impl Authority {
	/// Public-cloud authority for `tenant` with the default Graph scope.
	pub fn microsoft(tenant: TenantId) -> Result<Self, AuthorityError> {
		Self::builder(tenant).build()
	}

	/// Creates a builder seeded with public-cloud defaults.
	pub fn builder(tenant: TenantId) -> AuthorityBuilder {
		AuthorityBuilder::new(tenant)
	}

	fn validate(&self) -> Result<(), AuthorityError> {
		if self.token_endpoint.scheme() != "https" {
			return Err(AuthorityError::InsecureEndpoint { url: self.token_endpoint.to_string() });
		}
		if self.scope.is_empty() || self.scope.chars().any(char::is_whitespace) {
			return Err(AuthorityError::InvalidScope { scope: self.scope.clone() });
		}

		Ok(())
	}
}

/// Builder for [`Authority`] values.
#[derive(Debug)]
pub struct AuthorityBuilder {
	tenant: TenantId,
	login_host: Option<Url>,
	scope: String,
}
impl AuthorityBuilder {
	fn new(tenant: TenantId) -> Self {
		Self {
			tenant,
			login_host: None,
			scope: DEFAULT_GRAPH_SCOPE.into(),
		}
	}

	/// Overrides the login host (national clouds, mock servers).
	pub fn login_host(mut self, host: Url) -> Self {
		self.login_host = Some(host);

		self
	}

	/// Overrides the requested scope.
	pub fn scope(mut self, scope: impl Into<String>) -> Self {
		self.scope = scope.into();

		self
	}

	/// Consumes the builder and validates the resulting authority.
	pub fn build(self) -> Result<Authority, AuthorityError> {
		let host = match self.login_host {
			Some(host) => host,
			None => Url::parse(DEFAULT_LOGIN_HOST)
				.map_err(|_| AuthorityError::UnusableLoginHost { url: DEFAULT_LOGIN_HOST.into() })?,
		};
		let token_endpoint = token_endpoint(&host, &self.tenant)?;
		let authority = Authority { tenant: self.tenant, token_endpoint, scope: self.scope };

		authority.validate()?;

		Ok(authority)
	}
}

fn token_endpoint(host: &Url, tenant: &TenantId) -> Result<Url, AuthorityError> {
	let mut url = host.clone();

	{
		let mut segments = url
			.path_segments_mut()
			.map_err(|_| AuthorityError::UnusableLoginHost { url: host.to_string() })?;

		segments.pop_if_empty().extend([tenant.as_ref(), "oauth2", "v2.0", "token"]);
	}

	Ok(url)
}
