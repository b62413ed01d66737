//! Client-credentials exchange over the `oauth2` crate and mapping of its failures.

// crates.io
use oauth2::{
	AuthType, ClientId as OAuthClientId, ClientSecret, EndpointNotSet, EndpointSet,
	HttpClientError, RequestTokenError, Scope, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError, BasicTokenResponse},
};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ClientId, TokenSecret},
	authority::{Authority, TokenErrorContext, TokenErrorKind, TokenErrorStrategy},
	error::{ConfigError, TransientError, TransportError},
	http::{ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot},
};

type TokenOnlyClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_EXPIRES_IN: Duration = Duration::seconds(3599);

const TARGET: &str = "the token endpoint";

pub(crate) struct ClientCredentialsExchange {
	oauth_client: TokenOnlyClient,
	scope: String,
}
impl ClientCredentialsExchange {
	pub(crate) fn new(
		authority: &Authority,
		client_id: &ClientId,
		client_secret: &TokenSecret,
	) -> Result<Self> {
		let token_url = TokenUrl::new(authority.token_endpoint.to_string())
			.map_err(|source| ConfigError::InvalidUrl { name: "token endpoint", source })?;
		let oauth_client = BasicClient::new(OAuthClientId::new(client_id.to_string()))
			.set_client_secret(ClientSecret::new(client_secret.expose().to_owned()))
			.set_auth_type(AuthType::RequestBody)
			.set_token_uri(token_url);

		Ok(Self { oauth_client, scope: authority.scope.clone() })
	}

	pub(crate) async fn exchange(
		&self,
		http_client: &ReqwestHttpClient,
		strategy: &dyn TokenErrorStrategy,
	) -> Result<AccessToken> {
		let meta = ResponseMetadataSlot::default();
		let instrumented = http_client.instrumented(meta.clone());
		let response = self
			.oauth_client
			.exchange_client_credentials()
			.add_scope(Scope::new(self.scope.clone()))
			.request_async(&instrumented)
			.await
			.map_err(|err| map_request_error(strategy, meta.take(), err))?;

		map_token_response(&self.scope, response)
	}
}

fn map_token_response(scope: &str, response: BasicTokenResponse) -> Result<AccessToken> {
	let expires_in = match response.expires_in() {
		Some(lifetime) => {
			let secs = i64::try_from(lifetime.as_secs())
				.map_err(|_| ConfigError::ExpiresInOutOfRange)?;

			if secs <= 0 {
				return Err(ConfigError::NonPositiveExpiresIn.into());
			}

			Duration::seconds(secs)
		},
		None => DEFAULT_EXPIRES_IN,
	};

	AccessToken::builder(scope)
		.secret(response.access_token().secret().to_owned())
		.issued_at(OffsetDateTime::now_utc())
		.expires_in(expires_in)
		.build()
		.map_err(|err| ConfigError::from(err).into())
}

fn map_request_error(
	strategy: &dyn TokenErrorStrategy,
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<ReqwestError>>,
) -> Error {
	let meta = meta.unwrap_or_default();

	match err {
		RequestTokenError::ServerResponse(response) =>
			map_server_response(strategy, &meta, response),
		RequestTokenError::Request(error) => map_transport_error(&meta, error),
		RequestTokenError::Parse(source, body) => {
			let ctx = TokenErrorContext::default()
				.with_body_preview(String::from_utf8_lossy(&body));
			let ctx = match meta.status {
				Some(status) => ctx.with_http_status(status),
				None => ctx,
			};

			// Entra answers some failures with HTML or plain text; keep the classification.
			match strategy.classify(&ctx) {
				TokenErrorKind::Transient =>
					TransientError::TokenResponseParse { source, status: meta.status }.into(),
				kind => classified(kind, ctx.body_preview.unwrap_or_default(), &meta),
			}
		},
		RequestTokenError::Other(message) => TransientError::TokenEndpoint {
			message,
			status: meta.status,
			retry_after: meta.retry_after,
		}
		.into(),
	}
}

fn map_server_response(
	strategy: &dyn TokenErrorStrategy,
	meta: &ResponseMetadata,
	response: BasicErrorResponse,
) -> Error {
	let mut ctx = TokenErrorContext::default().with_oauth_error(response.error().as_ref());

	if let Some(description) = response.error_description() {
		ctx = ctx.with_error_description(description.clone());
	}
	if let Some(status) = meta.status {
		ctx = ctx.with_http_status(status);
	}

	let reason = response
		.error_description()
		.map(|description| first_line(description).to_owned())
		.unwrap_or_else(|| response.error().as_ref().to_owned());

	classified(strategy.classify(&ctx), reason, meta)
}

fn map_transport_error(
	meta: &ResponseMetadata,
	err: HttpClientError<ReqwestError>,
) -> Error {
	match err {
		HttpClientError::Reqwest(inner) => {
			if inner.is_builder() {
				return ConfigError::from(*inner).into();
			}
			if inner.is_timeout() {
				return TransientError::TokenEndpoint {
					message: "request timed out".into(),
					status: meta.status,
					retry_after: meta.retry_after,
				}
				.into();
			}

			TransportError::network(TARGET, *inner).into()
		},
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Other(message) => TransientError::TokenEndpoint {
			message,
			status: meta.status,
			retry_after: meta.retry_after,
		}
		.into(),
		_ => TransientError::TokenEndpoint {
			message: "unrecognized HTTP client failure".into(),
			status: meta.status,
			retry_after: meta.retry_after,
		}
		.into(),
	}
}

fn classified(kind: TokenErrorKind, reason: String, meta: &ResponseMetadata) -> Error {
	match kind {
		TokenErrorKind::InvalidClient => Error::InvalidClient { reason },
		TokenErrorKind::InvalidTenant => Error::InvalidTenant { reason },
		TokenErrorKind::InvalidScope => Error::InvalidScope { reason },
		TokenErrorKind::Transient => TransientError::TokenEndpoint {
			message: reason,
			status: meta.status,
			retry_after: meta.retry_after,
		}
		.into(),
	}
}

// Entra descriptions carry trace and correlation IDs on later lines.
fn first_line(text: &str) -> &str {
	text.lines().next().unwrap_or(text).trim_end_matches('.')
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::TenantId;

	#[test]
	fn exchange_requests_the_authority_scope() {
		let authority =
			Authority::builder(TenantId::new("contoso").expect("Tenant fixture should be valid."))
				.scope("https://graph.microsoft.us/.default")
				.build()
				.expect("Authority fixture should build.");
		let client_id = ClientId::new("app").expect("Client fixture should be valid.");
		let exchange =
			ClientCredentialsExchange::new(&authority, &client_id, &TokenSecret::new("secret"))
				.expect("Exchange should build.");

		assert_eq!(exchange.scope, "https://graph.microsoft.us/.default");
	}

	#[test]
	fn classified_errors_keep_metadata_for_transient_kinds() {
		let meta = ResponseMetadata { status: Some(503), retry_after: Some(Duration::seconds(9)) };
		let err = classified(TokenErrorKind::Transient, "busy".into(), &meta);

		assert_eq!(err.upstream_status(), Some(503));
		assert_eq!(err.retry_after(), Some(Duration::seconds(9)));
		assert!(matches!(
			classified(TokenErrorKind::InvalidTenant, "nope".into(), &meta),
			Error::InvalidTenant { .. }
		));
	}

	#[test]
	fn first_line_drops_trace_ids() {
		assert_eq!(
			first_line("AADSTS7000215: Invalid client secret provided.\r\nTrace ID: abc"),
			"AADSTS7000215: Invalid client secret provided"
		);
	}
}
