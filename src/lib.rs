//! Microsoft 365 monitoring proxy: one cached client-credentials token, five Graph resources,
//! and dashboard-friendly JSON shapes served over a small read-only HTTP surface.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod auth;
pub mod authority;
pub mod config;
pub mod error;
pub mod graph;
pub mod http;
pub mod obs;
pub mod shape;
pub mod token;
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers shared by unit and integration tests.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{ClientId, TenantId},
		authority::Authority,
		graph::{GraphClient, GraphSettings},
		http::ReqwestHttpClient,
		token::TokenProvider,
	};

	/// Client identifier used across test fixtures.
	pub const TEST_CLIENT_ID: &str = "11111111-2222-3333-4444-555555555555";
	/// Client secret used across test fixtures.
	pub const TEST_CLIENT_SECRET: &str = "fixture-secret";
	/// Tenant identifier used across test fixtures.
	pub const TEST_TENANT_ID: &str = "contoso-tenant";

	/// Builds a reqwest client that accepts the self-signed certificates produced by `httpmock`.
	pub fn test_reqwest_client() -> ReqwestClient {
		ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.expect("Failed to build insecure Reqwest client for tests.")
	}

	/// Builds an [`Authority`] whose login host points at a mock server base URL.
	pub fn test_authority(login_host: &str) -> Authority {
		let tenant = TenantId::new(TEST_TENANT_ID).expect("Tenant fixture should be valid.");

		Authority::builder(tenant)
			.login_host(Url::parse(login_host).expect("Mock login host should parse."))
			.build()
			.expect("Mock authority should build successfully.")
	}

	/// Builds a [`TokenProvider`] wired to the mock login host.
	pub fn build_test_token_provider(login_host: &str) -> Arc<TokenProvider> {
		let client_id = ClientId::new(TEST_CLIENT_ID).expect("Client fixture should be valid.");

		Arc::new(TokenProvider::with_http_client(
			test_authority(login_host),
			client_id,
			TEST_CLIENT_SECRET,
			ReqwestHttpClient::with_client(test_reqwest_client()),
		))
	}

	/// Builds a [`GraphClient`] that talks to `graph_base` and mints tokens against `login_host`.
	pub fn build_test_graph_client(
		login_host: &str,
		graph_base: &str,
	) -> (GraphClient, Arc<TokenProvider>) {
		let tokens = build_test_token_provider(login_host);
		let settings = GraphSettings::new(
			Url::parse(graph_base).expect("Mock Graph base URL should parse."),
		);
		let client = GraphClient::with_http_client(test_reqwest_client(), tokens.clone(), settings);

		(client, tokens)
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::Mutex;
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, http_body_util as _, httpmock as _, tower as _};
