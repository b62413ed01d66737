//! HTTP Surface: five read-only JSON endpoints over the Graph client.
//!
//! Handlers only orchestrate: they call [`GraphApi`], hand the payloads to the shapers, and map
//! [`Error`] into a JSON error body with an HTTP status that tells the dashboard whether trying
//! again later makes sense.

// std
use std::num::IntErrorKind;
// crates.io
use axum::{
	Json, Router,
	extract::{Query, State, rejection::QueryRejection},
	http::{HeaderValue, Method, StatusCode, header},
	response::{IntoResponse, Response},
	routing::get,
};
use tower_http::{
	cors::{AllowOrigin, Any, CorsLayer},
	trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use serde::{Deserializer, de};
use tracing::Level;
// self
use crate::{
	_prelude::*,
	config::Settings,
	graph::{GraphApi, GraphClient},
	shape::{
		self, DEFAULT_USAGE_WARNING_THRESHOLD, HealthResponse, LicenseResponse, SignInSummary,
		TenantResponse,
	},
};

/// Shared handler state.
pub type SharedState = Arc<AppState>;

/// Dependencies of the request handlers.
pub struct AppState {
	graph: Arc<dyn GraphApi>,
	license_warning_threshold: f64,
}
impl AppState {
	/// Creates state around a Graph implementation with the default license threshold.
	pub fn new(graph: Arc<dyn GraphApi>) -> Self {
		Self { graph, license_warning_threshold: DEFAULT_USAGE_WARNING_THRESHOLD }
	}

	/// Overrides the license usage ratio that triggers a warning.
	pub fn with_license_warning_threshold(mut self, threshold: f64) -> Self {
		self.license_warning_threshold = threshold;

		self
	}
}

/// Body of `GET /api/ping`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PingResponse {
	/// Always `true`.
	pub ok: bool,
	/// Current server time.
	#[serde(with = "time::serde::rfc3339")]
	pub time: OffsetDateTime,
}

/// Query of `GET /api/signins`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SignInQuery {
	/// Window length in hours, clamped into `1..=168`; out-of-range integers saturate.
	#[serde(default, deserialize_with = "saturating_hours")]
	pub hours: Option<i64>,
}

fn saturating_hours<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
	D: Deserializer<'de>,
{
	let Some(raw) = Option::<String>::deserialize(deserializer)? else {
		return Ok(None);
	};

	match raw.trim().parse::<i64>() {
		Ok(hours) => Ok(Some(hours)),
		Err(e) => match e.kind() {
			IntErrorKind::PosOverflow => Ok(Some(i64::MAX)),
			IntErrorKind::NegOverflow => Ok(Some(i64::MIN)),
			_ => Err(de::Error::custom(format!("hours `{raw}` is not an integer: {e}"))),
		},
	}
}

/// JSON error body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
	/// Human-readable description.
	pub error: String,
	/// Upstream HTTP status, when the failure came from Graph or the token endpoint.
	pub status: Option<u16>,
}

/// Handler failure rendered as [`ErrorBody`].
#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	body: ErrorBody,
	retry_after: Option<Duration>,
}
impl ApiError {
	/// Rejects a malformed request.
	pub fn bad_request(message: impl Into<String>) -> Self {
		Self {
			status: StatusCode::BAD_REQUEST,
			body: ErrorBody { error: message.into(), status: None },
			retry_after: None,
		}
	}

	/// HTTP status the error renders with.
	pub fn status(&self) -> StatusCode {
		self.status
	}
}
impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		let status = match &err {
			Error::Graph { status: 429, .. } => StatusCode::SERVICE_UNAVAILABLE,
			Error::Graph { .. }
			| Error::InvalidClient { .. }
			| Error::InvalidTenant { .. }
			| Error::InvalidScope { .. } => StatusCode::BAD_GATEWAY,
			Error::Transient(_) | Error::Transport(_) => StatusCode::SERVICE_UNAVAILABLE,
			Error::Config(_) | Error::Serve(_) => StatusCode::INTERNAL_SERVER_ERROR,
		};

		if status.is_server_error() {
			tracing::error!(status = status.as_u16(), error = %err, "request failed");
		}

		Self {
			status,
			body: ErrorBody { error: err.to_string(), status: err.upstream_status() },
			retry_after: err.retry_after(),
		}
	}
}
impl From<QueryRejection> for ApiError {
	fn from(rejection: QueryRejection) -> Self {
		Self::bad_request(rejection.body_text())
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let mut response = (self.status, Json(self.body)).into_response();

		if let Some(retry_after) =
			self.retry_after.filter(|_| self.status == StatusCode::SERVICE_UNAVAILABLE)
		{
			let seconds = HeaderValue::from(retry_after.whole_seconds().max(0));

			response.headers_mut().insert(header::RETRY_AFTER, seconds);
		}

		response
	}
}

/// Builds the router with request tracing and CORS for `allowed_origins`.
pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
	Router::new()
		.route("/api/ping", get(ping))
		.route("/api/health", get(health))
		.route("/api/licenses", get(licenses))
		.route("/api/tenant", get(tenant))
		.route("/api/signins", get(sign_ins))
		.layer(build_cors_layer(allowed_origins))
		.layer(
			TraceLayer::new_for_http()
				.on_request(DefaultOnRequest::new().level(Level::INFO))
				.on_response(DefaultOnResponse::new().level(Level::INFO)),
		)
		.with_state(Arc::new(state))
}

/// CORS for the dashboard; a `*` entry allows any origin, explicit origins also allow
/// credentials.
pub fn build_cors_layer(origins: &[String]) -> CorsLayer {
	let is_wildcard = origins.iter().any(|origin| origin == "*");
	let layer = CorsLayer::new().max_age(std::time::Duration::from_secs(3600));

	if is_wildcard {
		return layer.allow_origin(Any).allow_methods(Any).allow_headers(Any);
	}

	let allowed = origins
		.iter()
		.filter_map(|origin| match origin.parse::<HeaderValue>() {
			Ok(value) => Some(value),
			Err(_) => {
				tracing::warn!(%origin, "ignoring unparsable CORS origin");

				None
			},
		})
		.collect::<Vec<_>>();

	layer
		.allow_origin(AllowOrigin::list(allowed))
		.allow_methods([Method::GET, Method::OPTIONS])
		.allow_headers([header::ACCEPT, header::AUTHORIZATION, header::CONTENT_TYPE])
		.allow_credentials(true)
}

/// Wires the token provider, Graph client, and router from `settings` and serves until Ctrl-C.
pub async fn serve(settings: &Settings) -> Result<()> {
	let tokens = Arc::new(settings.token_provider()?);
	let graph = GraphClient::new(tokens, settings.graph_settings(), settings.request_timeout())?;
	let state = AppState::new(Arc::new(graph))
		.with_license_warning_threshold(settings.license_warning_threshold);
	let app = router(state, &settings.allowed_origins());
	let listener = tokio::net::TcpListener::bind((settings.host.as_str(), settings.port))
		.await
		.map_err(Error::Serve)?;

	tracing::info!(addr = ?listener.local_addr().ok(), "http server listening");

	axum::serve(listener, app)
		.with_graceful_shutdown(async {
			tokio::signal::ctrl_c().await.ok();
			tracing::info!("shutdown signal received");
		})
		.await
		.map_err(Error::Serve)
}

async fn ping() -> Json<PingResponse> {
	Json(PingResponse { ok: true, time: OffsetDateTime::now_utc() })
}

async fn health(State(state): State<SharedState>) -> Result<Json<HealthResponse>, ApiError> {
	let (overviews, issues) =
		tokio::try_join!(state.graph.health_overviews(), state.graph.health_issues())?;

	Ok(Json(shape::shape_health(overviews, issues)))
}

async fn licenses(State(state): State<SharedState>) -> Result<Json<LicenseResponse>, ApiError> {
	let skus = state.graph.subscribed_skus().await?;

	Ok(Json(shape::shape_licenses(skus, state.license_warning_threshold)))
}

async fn tenant(State(state): State<SharedState>) -> Result<Json<TenantResponse>, ApiError> {
	let organization = state.graph.organization().await?;

	Ok(Json(shape::shape_tenant(organization)))
}

async fn sign_ins(
	State(state): State<SharedState>,
	query: Result<Query<SignInQuery>, QueryRejection>,
) -> Result<Json<SignInSummary>, ApiError> {
	let Query(query) = query?;
	let hours = shape::clamp_hours(query.hours);
	let now = OffsetDateTime::now_utc();
	let events = state.graph.sign_ins(shape::window_start(now, hours)).await?;

	Ok(Json(shape::summarize_sign_ins(&events, hours, now)))
}

#[cfg(test)]
mod tests {
	// crates.io
	use axum::body::Body;
	use http_body_util::BodyExt;
	use tower::ServiceExt;
	// self
	use super::*;
	use crate::{
		error::TransportError,
		graph::{
			GraphFuture, Organization, PrepaidUnits, ServiceHealth, ServiceHealthIssue, SignIn,
			SubscribedSku,
		},
	};

	#[derive(Default)]
	struct FakeGraph {
		fail_with_status: Option<u16>,
		since: Mutex<Option<OffsetDateTime>>,
	}
	impl FakeGraph {
		fn outcome<T>(&self, value: T) -> Result<T> {
			match self.fail_with_status {
				Some(status) => Err(Error::Graph {
					status,
					code: Some("TooManyRequests".into()),
					message: "Throttled".into(),
					retry_after: Some(Duration::seconds(12)),
				}),
				None => Ok(value),
			}
		}
	}
	impl GraphApi for FakeGraph {
		fn health_overviews(&self) -> GraphFuture<'_, Vec<ServiceHealth>> {
			let overviews = vec![ServiceHealth {
				service: Some("Exchange Online".into()),
				status: Some("serviceOperational".into()),
			}];

			Box::pin(async move { self.outcome(overviews) })
		}

		fn health_issues(&self) -> GraphFuture<'_, Vec<ServiceHealthIssue>> {
			let issues = vec![ServiceHealthIssue {
				id: Some("EX1".into()),
				status: Some("serviceRestored".into()),
				..Default::default()
			}];

			Box::pin(async move { self.outcome(issues) })
		}

		fn subscribed_skus(&self) -> GraphFuture<'_, Vec<SubscribedSku>> {
			let skus = vec![SubscribedSku {
				sku_part_number: Some("ENTERPRISEPACK".into()),
				consumed_units: 80,
				prepaid_units: PrepaidUnits { enabled: 100, ..Default::default() },
				..Default::default()
			}];

			Box::pin(async move { self.outcome(skus) })
		}

		fn organization(&self) -> GraphFuture<'_, Organization> {
			Box::pin(async move { self.outcome(Organization::default()) })
		}

		fn sign_ins(&self, since: OffsetDateTime) -> GraphFuture<'_, Vec<SignIn>> {
			*self.since.lock() = Some(since);

			Box::pin(async move { self.outcome(Vec::new()) })
		}
	}

	async fn call(
		graph: Arc<FakeGraph>,
		uri: &str,
	) -> (StatusCode, Option<String>, serde_json::Value) {
		let app = router(AppState::new(graph), &["*".to_owned()]);
		let response = app
			.oneshot(
				axum::http::Request::builder()
					.uri(uri)
					.body(Body::empty())
					.expect("Request should build."),
			)
			.await
			.expect("Router should respond.");
		let status = response.status();
		let retry_after = response
			.headers()
			.get(header::RETRY_AFTER)
			.and_then(|value| value.to_str().ok())
			.map(ToOwned::to_owned);
		let bytes =
			response.into_body().collect().await.expect("Body should be readable.").to_bytes();
		let json = serde_json::from_slice(&bytes).expect("Body should be JSON.");

		(status, retry_after, json)
	}

	#[tokio::test]
	async fn ping_reports_ok_and_time() {
		let (status, _, json) = call(Arc::new(FakeGraph::default()), "/api/ping").await;

		assert_eq!(status, StatusCode::OK);
		assert_eq!(json["ok"], true);
		assert!(json["time"].as_str().is_some_and(|time| time.ends_with('Z')));
	}

	#[tokio::test]
	async fn health_drops_restored_issues() {
		let (status, _, json) = call(Arc::new(FakeGraph::default()), "/api/health").await;

		assert_eq!(status, StatusCode::OK);
		assert_eq!(json["services"][0]["status"], "serviceOperational");
		assert_eq!(json["openIssues"], serde_json::json!([]));
	}

	#[tokio::test]
	async fn license_threshold_is_configurable() {
		let app = router(
			AppState::new(Arc::new(FakeGraph::default())).with_license_warning_threshold(0.8),
			&["*".to_owned()],
		);
		let response = app
			.oneshot(
				axum::http::Request::builder()
					.uri("/api/licenses")
					.body(Body::empty())
					.expect("Request should build."),
			)
			.await
			.expect("Router should respond.");
		let bytes =
			response.into_body().collect().await.expect("Body should be readable.").to_bytes();
		let json: serde_json::Value = serde_json::from_slice(&bytes).expect("Body should be JSON.");

		assert_eq!(json["skus"][0]["warning"], "≥80% genutzt");
	}

	#[tokio::test]
	async fn sign_ins_clamp_the_window() {
		let graph = Arc::new(FakeGraph::default());
		let before = OffsetDateTime::now_utc();
		let (status, _, json) = call(graph.clone(), "/api/signins?hours=500").await;
		let since = graph.since.lock().take().expect("Graph should have been queried.");

		assert_eq!(status, StatusCode::OK);
		assert_eq!(json["windowHours"], 168);
		assert!(before - since >= Duration::hours(168) - Duration::seconds(5));
		assert!(json["buckets"].as_array().is_some_and(|buckets| buckets.len() >= 168));
	}

	#[tokio::test]
	async fn sign_ins_default_to_a_day() {
		let (status, _, json) = call(Arc::new(FakeGraph::default()), "/api/signins").await;

		assert_eq!(status, StatusCode::OK);
		assert_eq!(json["windowHours"], 24);
		assert_eq!(json["failureRate"], 0.0);
		assert_eq!(json["buckets"].as_array().map(Vec::len), Some(25));
	}

	#[tokio::test]
	async fn oversized_hours_saturate_into_the_clamp() {
		let (status, _, json) =
			call(Arc::new(FakeGraph::default()), "/api/signins?hours=99999999999999999999").await;

		assert_eq!(status, StatusCode::OK);
		assert_eq!(json["windowHours"], 168);

		let (status, _, json) =
			call(Arc::new(FakeGraph::default()), "/api/signins?hours=-99999999999999999999").await;

		assert_eq!(status, StatusCode::OK);
		assert_eq!(json["windowHours"], 1);
	}

	#[tokio::test]
	async fn malformed_query_is_a_bad_request() {
		let (status, _, json) =
			call(Arc::new(FakeGraph::default()), "/api/signins?hours=plenty").await;

		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert!(json["status"].is_null());
		assert!(json["error"].as_str().is_some_and(|error| !error.is_empty()));
	}

	#[tokio::test]
	async fn throttling_maps_to_service_unavailable() {
		let graph = Arc::new(FakeGraph { fail_with_status: Some(429), ..Default::default() });
		let (status, retry_after, json) = call(graph, "/api/tenant").await;

		assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
		assert_eq!(retry_after.as_deref(), Some("12"));
		assert_eq!(json["status"], 429);
	}

	#[tokio::test]
	async fn graph_failures_map_to_bad_gateway() {
		let graph = Arc::new(FakeGraph { fail_with_status: Some(403), ..Default::default() });
		let (status, retry_after, json) = call(graph, "/api/licenses").await;

		assert_eq!(status, StatusCode::BAD_GATEWAY);
		assert_eq!(retry_after, None);
		assert_eq!(json["status"], 403);
		assert_eq!(json["error"], "Graph request failed with status 403: Throttled.");
	}

	#[test]
	fn error_statuses_follow_the_failure_class() {
		let network = std::io::Error::other("connection reset");

		assert_eq!(
			ApiError::from(Error::from(TransportError::network("Microsoft Graph", network))).status(),
			StatusCode::SERVICE_UNAVAILABLE
		);
		assert_eq!(
			ApiError::from(Error::InvalidClient { reason: "AADSTS7000215".into() }).status(),
			StatusCode::BAD_GATEWAY
		);
		assert_eq!(
			ApiError::from(Error::from(crate::error::ConfigError::invalid_setting("PORT", "zero")))
				.status(),
			StatusCode::INTERNAL_SERVER_ERROR
		);
	}

	#[tokio::test]
	async fn explicit_origins_allow_credentials() {
		let app = router(AppState::new(Arc::new(FakeGraph::default())), &[
			"https://dashboard.example.com".to_owned(),
		]);
		let response = app
			.oneshot(
				axum::http::Request::builder()
					.uri("/api/ping")
					.header(header::ORIGIN, "https://dashboard.example.com")
					.body(Body::empty())
					.expect("Request should build."),
			)
			.await
			.expect("Router should respond.");
		let headers = response.headers();

		assert_eq!(
			headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).and_then(|v| v.to_str().ok()),
			Some("https://dashboard.example.com")
		);
		assert_eq!(
			headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).and_then(|v| v.to_str().ok()),
			Some("true")
		);
	}

	#[tokio::test]
	async fn wildcard_origin_omits_credentials() {
		let app = router(AppState::new(Arc::new(FakeGraph::default())), &["*".to_owned()]);
		let response = app
			.oneshot(
				axum::http::Request::builder()
					.uri("/api/ping")
					.header(header::ORIGIN, "https://anywhere.example.org")
					.body(Body::empty())
					.expect("Request should build."),
			)
			.await
			.expect("Router should respond.");
		let headers = response.headers();

		assert_eq!(
			headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).and_then(|v| v.to_str().ok()),
			Some("*")
		);
		assert!(headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).is_none());
	}
}
