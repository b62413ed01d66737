//! API Client: authenticated GETs against the fixed set of Graph resources.
//!
//! Every request carries the bearer token from [`TokenProvider`], expects JSON, and is decoded
//! through `serde_path_to_error` so a schema drift reports the exact JSON path. Collections are
//! unwrapped from their OData `value` envelope; only the first page is read.

pub mod model;

pub use model::*;

// crates.io
use reqwest::{
	StatusCode,
	header::{ACCEPT, AUTHORIZATION},
};
use serde::de::DeserializeOwned;
use time::format_description::well_known::Rfc3339;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransientError, TransportError},
	http,
	obs::{self, Operation},
	token::TokenProvider,
};

/// Graph v1.0 root in the public cloud.
pub const DEFAULT_GRAPH_BASE: &str = "https://graph.microsoft.com/v1.0";
/// `$top` applied to the service health issues request.
pub const DEFAULT_HEALTH_ISSUE_PAGE_SIZE: u32 = 50;
/// `$top` applied to the sign-ins request.
pub const DEFAULT_SIGN_IN_PAGE_SIZE: u32 = 200;

const TARGET: &str = "Microsoft Graph";

/// Boxed future returned by [`GraphApi`] methods.
pub type GraphFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// The Graph reads the HTTP surface depends on.
pub trait GraphApi
where
	Self: Send + Sync,
{
	/// Current health of every subscribed service.
	fn health_overviews(&self) -> GraphFuture<'_, Vec<ServiceHealth>>;

	/// Recent service issues (single page).
	fn health_issues(&self) -> GraphFuture<'_, Vec<ServiceHealthIssue>>;

	/// License SKUs the tenant subscribes to.
	fn subscribed_skus(&self) -> GraphFuture<'_, Vec<SubscribedSku>>;

	/// The tenant's organization object; empty when Graph lists none.
	fn organization(&self) -> GraphFuture<'_, Organization>;

	/// Sign-ins created at or after `since`, oldest first (single page).
	fn sign_ins(&self, since: OffsetDateTime) -> GraphFuture<'_, Vec<SignIn>>;
}

/// Where and how much the Graph client reads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphSettings {
	/// Versioned Graph root, e.g. `https://graph.microsoft.com/v1.0`.
	pub base_url: Url,
	/// `$top` for service issues.
	pub health_issue_page_size: u32,
	/// `$top` for sign-ins.
	pub sign_in_page_size: u32,
}
impl GraphSettings {
	/// Settings for `base_url` with default page sizes.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			health_issue_page_size: DEFAULT_HEALTH_ISSUE_PAGE_SIZE,
			sign_in_page_size: DEFAULT_SIGN_IN_PAGE_SIZE,
		}
	}

	/// Overrides the page sizes.
	pub fn with_page_sizes(mut self, health_issues: u32, sign_ins: u32) -> Self {
		self.health_issue_page_size = health_issues;
		self.sign_in_page_size = sign_ins;

		self
	}
}

/// Microsoft Graph client bound to one token provider.
#[derive(Debug)]
pub struct GraphClient {
	http: ReqwestClient,
	tokens: Arc<TokenProvider>,
	settings: GraphSettings,
}
impl GraphClient {
	/// Creates a client with its own reqwest transport and the given request timeout.
	pub fn new(
		tokens: Arc<TokenProvider>,
		settings: GraphSettings,
		timeout: std::time::Duration,
	) -> Result<Self> {
		let http = ReqwestClient::builder()
			.timeout(timeout)
			.build()
			.map_err(ConfigError::from)?;

		Ok(Self::with_http_client(http, tokens, settings))
	}

	/// Creates a client that reuses the caller-provided reqwest client.
	pub fn with_http_client(
		http: ReqwestClient,
		tokens: Arc<TokenProvider>,
		settings: GraphSettings,
	) -> Self {
		Self { http, tokens, settings }
	}

	/// Fetches a collection resource and unwraps its `value` array.
	pub async fn list<T>(&self, resource: &'static str, query: &[(&str, String)]) -> Result<Vec<T>>
	where
		T: DeserializeOwned,
	{
		let page: Collection<T> = self.get(resource, query).await?;

		if page.next_link.is_some() {
			tracing::debug!(resource, items = page.value.len(), "ignoring further result pages");
		}

		Ok(page.value)
	}

	/// Performs an authenticated GET and decodes the JSON body.
	pub async fn get<T>(&self, resource: &'static str, query: &[(&str, String)]) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let url = self.resource_url(resource)?;
		let token = self.tokens.access_token().await?;
		let response = self
			.http
			.get(url)
			.query(query)
			.header(AUTHORIZATION, token.bearer())
			.header(ACCEPT, "application/json")
			.send()
			.await
			.map_err(map_send_error)?;
		let status = response.status();
		let retry_after = http::parse_retry_after(response.headers());
		let body = response.bytes().await.map_err(map_send_error)?;

		if !status.is_success() {
			if status == StatusCode::UNAUTHORIZED {
				self.tokens.invalidate();
			}

			return Err(graph_error(status, retry_after, &body));
		}

		let de = &mut serde_json::Deserializer::from_slice(&body);

		serde_path_to_error::deserialize(de).map_err(|source| {
			TransientError::GraphResponseParse { resource, source, status: status.as_u16() }.into()
		})
	}

	fn resource_url(&self, resource: &str) -> Result<Url> {
		let mut url = self.settings.base_url.clone();

		url.path_segments_mut()
			.map_err(|_| ConfigError::invalid_setting("GRAPH_BASE_URL", "cannot be a base URL"))?
			.pop_if_empty()
			.extend(resource.split('/'));

		Ok(url)
	}
}
impl GraphApi for GraphClient {
	fn health_overviews(&self) -> GraphFuture<'_, Vec<ServiceHealth>> {
		Box::pin(obs::observe(Operation::HealthOverviews, "graph_get", async move {
			self.list("admin/serviceAnnouncement/healthOverviews", &[]).await
		}))
	}

	fn health_issues(&self) -> GraphFuture<'_, Vec<ServiceHealthIssue>> {
		let top = self.settings.health_issue_page_size;

		Box::pin(obs::observe(Operation::HealthIssues, "graph_get", async move {
			self.list("admin/serviceAnnouncement/issues", &[("$top", top.to_string())]).await
		}))
	}

	fn subscribed_skus(&self) -> GraphFuture<'_, Vec<SubscribedSku>> {
		Box::pin(obs::observe(Operation::SubscribedSkus, "graph_get", async move {
			self.list("subscribedSkus", &[]).await
		}))
	}

	fn organization(&self) -> GraphFuture<'_, Organization> {
		Box::pin(obs::observe(Operation::Organization, "graph_get", async move {
			let organizations: Vec<Organization> = self.list("organization", &[]).await?;

			Ok(organizations.into_iter().next().unwrap_or_default())
		}))
	}

	fn sign_ins(&self, since: OffsetDateTime) -> GraphFuture<'_, Vec<SignIn>> {
		let top = self.settings.sign_in_page_size;

		Box::pin(obs::observe(Operation::SignIns, "graph_get", async move {
			let query = [
				("$filter", format!("createdDateTime ge {}", zulu_seconds(since)?)),
				("$orderby", "createdDateTime asc".to_owned()),
				("$top", top.to_string()),
			];

			self.list("auditLogs/signIns", &query).await
		}))
	}
}

/// Formats `instant` as RFC 3339 UTC with whole seconds, e.g. `2025-01-01T08:00:00Z`.
pub fn zulu_seconds(instant: OffsetDateTime) -> Result<String> {
	instant
		.to_offset(time::UtcOffset::UTC)
		.replace_nanosecond(0)
		.ok()
		.and_then(|truncated| truncated.format(&Rfc3339).ok())
		.ok_or_else(|| ConfigError::invalid_setting("since", "instant cannot be formatted").into())
}

fn map_send_error(err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}

	TransportError::network(TARGET, err).into()
}

fn graph_error(status: StatusCode, retry_after: Option<Duration>, body: &[u8]) -> Error {
	let parsed = serde_json::from_slice::<ODataError>(body).ok().map(|envelope| envelope.error);
	let code = parsed.as_ref().and_then(|error| error.code.clone());
	// Graph messages end with a period; the error's display format adds its own.
	let message = parsed
		.and_then(|error| error.message)
		.map(|message| message.trim_end().trim_end_matches('.').to_owned())
		.filter(|message| !message.is_empty())
		.unwrap_or_else(|| status.canonical_reason().unwrap_or("unexpected status").to_owned());

	Error::Graph { status: status.as_u16(), code, message, retry_after }
}
