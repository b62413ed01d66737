//! Token Provider: the client-credentials grant with a single in-memory cache slot.
//!
//! [`TokenProvider::access_token`] hands out the cached token until it enters the preemptive
//! window before expiry, then acquires a new one. Concurrent callers that find the cache stale
//! queue on one async guard, so only the first of them contacts the token endpoint and the rest
//! reuse its result.

pub mod exchange;

pub use exchange::DEFAULT_EXPIRES_IN;

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ClientId, TokenSecret},
	authority::{Authority, EntraStrategy},
	http::ReqwestHttpClient,
	obs::{self, Operation},
	token::exchange::ClientCredentialsExchange,
};

/// Default window before expiry during which a cached token is considered stale.
pub const DEFAULT_PREEMPTIVE_WINDOW: Duration = Duration::seconds(60);

/// Acquires and caches the service principal's Graph token.
pub struct TokenProvider {
	authority: Authority,
	client_id: ClientId,
	client_secret: TokenSecret,
	http_client: ReqwestHttpClient,
	strategy: EntraStrategy,
	preemptive_window: Duration,
	cached: Mutex<Option<AccessToken>>,
	acquire_guard: AsyncMutex<()>,
}
impl TokenProvider {
	/// Creates a provider with a default reqwest transport.
	pub fn new(
		authority: Authority,
		client_id: ClientId,
		client_secret: impl Into<String>,
	) -> Self {
		Self::with_http_client(authority, client_id, client_secret, ReqwestHttpClient::default())
	}

	/// Creates a provider that reuses the caller-provided transport.
	pub fn with_http_client(
		authority: Authority,
		client_id: ClientId,
		client_secret: impl Into<String>,
		http_client: ReqwestHttpClient,
	) -> Self {
		Self {
			authority,
			client_id,
			client_secret: TokenSecret::new(client_secret),
			http_client,
			strategy: EntraStrategy,
			preemptive_window: DEFAULT_PREEMPTIVE_WINDOW,
			cached: Mutex::new(None),
			acquire_guard: AsyncMutex::new(()),
		}
	}

	/// Overrides the preemptive window; negative values are treated as zero.
	pub fn with_preemptive_window(mut self, window: Duration) -> Self {
		self.preemptive_window = if window.is_negative() { Duration::ZERO } else { window };

		self
	}

	/// Returns a fresh access token, contacting the token endpoint only when needed.
	pub async fn access_token(&self) -> Result<AccessToken> {
		if let Some(token) = self.fresh_cached(OffsetDateTime::now_utc()) {
			tracing::debug!(fingerprint = %token.secret.fingerprint(), "reusing cached access token");

			return Ok(token);
		}

		let _singleflight = self.acquire_guard.lock().await;

		// Another caller may have refreshed while this one waited on the guard.
		if let Some(token) = self.fresh_cached(OffsetDateTime::now_utc()) {
			return Ok(token);
		}

		self.acquire().await
	}

	/// Acquires a new token regardless of the cache state.
	pub async fn force_refresh(&self) -> Result<AccessToken> {
		let _singleflight = self.acquire_guard.lock().await;

		self.acquire().await
	}

	/// Drops the cached token so the next call acquires a new one.
	pub fn invalidate(&self) {
		if self.cached.lock().take().is_some() {
			tracing::info!("cached access token invalidated");
		}
	}

	/// Returns the cached token without checking freshness or touching the network.
	pub fn cached(&self) -> Option<AccessToken> {
		self.cached.lock().clone()
	}

	fn fresh_cached(&self, now: OffsetDateTime) -> Option<AccessToken> {
		self.cached
			.lock()
			.as_ref()
			.filter(|token| !token.needs_refresh_at(now, self.preemptive_window))
			.cloned()
	}

	async fn acquire(&self) -> Result<AccessToken> {
		obs::observe(Operation::TokenAcquire, "client_credentials", async {
			let exchange =
				ClientCredentialsExchange::new(&self.authority, &self.client_id, &self.client_secret)?;
			let token = exchange.exchange(&self.http_client, &self.strategy).await?;

			tracing::info!(
				tenant = %self.authority.tenant,
				fingerprint = %token.secret.fingerprint(),
				expires_at = %token.expires_at,
				"acquired access token"
			);

			*self.cached.lock() = Some(token.clone());

			Ok(token)
		})
		.await
	}
}
impl Debug for TokenProvider {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenProvider")
			.field("authority", &self.authority)
			.field("client_id", &self.client_id)
			.field("preemptive_window", &self.preemptive_window)
			.field("cached", &self.cached.lock().is_some())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::auth::TenantId;

	fn provider(window: Duration) -> TokenProvider {
		let authority =
			Authority::microsoft(TenantId::new("contoso").expect("Tenant fixture should be valid."))
				.expect("Authority fixture should build.");

		TokenProvider::new(
			authority,
			ClientId::new("app").expect("Client fixture should be valid."),
			"hunter2",
		)
		.with_preemptive_window(window)
	}

	fn seed(provider: &TokenProvider, expires_at: OffsetDateTime) {
		let token = AccessToken::builder("scope")
			.secret("seeded")
			.issued_at(expires_at - Duration::hours(1))
			.expires_at(expires_at)
			.build()
			.expect("Seed token should build.");

		*provider.cached.lock() = Some(token);
	}

	#[test]
	fn fresh_cached_honours_preemptive_window() {
		let provider = provider(Duration::seconds(60));
		let expires = macros::datetime!(2025-06-01 12:00 UTC);

		seed(&provider, expires);

		assert!(provider.fresh_cached(expires - Duration::seconds(61)).is_some());
		assert!(provider.fresh_cached(expires - Duration::seconds(60)).is_none());
	}

	#[test]
	fn negative_window_is_clamped_and_invalidate_clears() {
		let provider = provider(Duration::seconds(-5));
		let expires = macros::datetime!(2025-06-01 12:00 UTC);

		seed(&provider, expires);

		assert!(provider.fresh_cached(expires - Duration::seconds(1)).is_some());

		provider.invalidate();

		assert!(provider.cached().is_none());
		assert!(!format!("{provider:?}").contains("hunter2"));
	}
}
