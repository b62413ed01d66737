//! Crate-level error types shared by the token provider, the Graph client, and the HTTP surface.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary upstream failure; the caller may try again later.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// The identity platform rejected the client credentials.
	#[error("Client authentication failed: {reason}.")]
	InvalidClient {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// The identity platform does not know the configured tenant.
	#[error("Tenant was rejected by the identity platform: {reason}.")]
	InvalidTenant {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// The requested scope is not valid for the client.
	#[error("Requested scope was rejected: {reason}.")]
	InvalidScope {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// Graph answered with a non-success status.
	#[error("Graph request failed with status {status}: {message}.")]
	Graph {
		/// HTTP status returned by Graph.
		status: u16,
		/// OData error code, when the body carried one.
		code: Option<String>,
		/// OData error message or a generic description.
		message: String,
		/// Retry-After hint from Graph, if supplied.
		retry_after: Option<Duration>,
	},
	/// The HTTP server failed while binding or serving.
	#[error("HTTP server failed.")]
	Serve(#[source] std::io::Error),
}
impl Error {
	/// Upstream HTTP status attached to the error, if any.
	pub fn upstream_status(&self) -> Option<u16> {
		match self {
			Self::Graph { status, .. } => Some(*status),
			Self::Transient(TransientError::TokenEndpoint { status, .. }) => *status,
			Self::Transient(TransientError::TokenResponseParse { status, .. }) => *status,
			Self::Transient(TransientError::GraphResponseParse { status, .. }) => Some(*status),
			_ => None,
		}
	}

	/// Retry-After hint attached to the error, if any.
	pub fn retry_after(&self) -> Option<Duration> {
		match self {
			Self::Graph { retry_after, .. } => *retry_after,
			Self::Transient(TransientError::TokenEndpoint { retry_after, .. }) => *retry_after,
			_ => None,
		}
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// A configured URL is invalid.
	#[error("The {name} URL is invalid.")]
	InvalidUrl {
		/// Which URL failed to parse.
		name: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Authority descriptor failed validation.
	#[error(transparent)]
	Authority(#[from] crate::authority::AuthorityError),
	/// Identifier failed validation.
	#[error(transparent)]
	Identifier(#[from] crate::auth::IdentifierError),
	/// Token builder validation failed.
	#[error("Unable to build access token.")]
	TokenBuild(#[from] crate::auth::AccessTokenBuilderError),
	/// A numeric or enumerated setting is out of range.
	#[error("Setting `{name}` is invalid: {reason}.")]
	InvalidSetting {
		/// Environment variable or flag name.
		name: &'static str,
		/// Why the value was rejected.
		reason: String,
	},
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Token endpoint returned a non-positive duration.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
	/// Logging could not be initialised.
	#[error("Logging could not be initialised: {reason}.")]
	Logging {
		/// Subscriber installation failure.
		reason: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}

	/// Builds an [`ConfigError::InvalidSetting`] value.
	pub fn invalid_setting(name: &'static str, reason: impl Into<String>) -> Self {
		Self::InvalidSetting { name, reason: reason.into() }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary failure variants (safe to try again later).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Token endpoint returned an unexpected but non-fatal response.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Token endpoint responded with JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Graph responded with JSON that does not match the expected resource shape.
	#[error("Graph resource `{resource}` returned malformed JSON.")]
	GraphResponseParse {
		/// Relative resource path.
		resource: &'static str,
		/// Structured parsing failure, including the JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code of the response.
		status: u16,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {target}.")]
	Network {
		/// Which upstream was being called.
		target: &'static str,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the token endpoint.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error raised against `target`.
	pub fn network(target: &'static str, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { target, source: Box::new(src) }
	}
}
