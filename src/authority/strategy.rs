//! Classification of token endpoint failures.
//!
//! Implementations see only primitive data (status, OAuth fields, body preview) so they stay
//! decoupled from reqwest and from the `oauth2` crate.

// self
use crate::_prelude::*;

/// Strategy hook that maps token endpoint failures into [`TokenErrorKind`].
pub trait TokenErrorStrategy: Send + Sync {
	/// Classifies a failed token request.
	fn classify(&self, ctx: &TokenErrorContext) -> TokenErrorKind;
}

/// Canonical token failure categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenErrorKind {
	/// Client identifier or secret is wrong, expired, or unknown to the tenant.
	InvalidClient,
	/// Tenant does not exist or is not reachable through this authority.
	InvalidTenant,
	/// Scope is malformed or not allowed for app-only tokens.
	InvalidScope,
	/// Anything else; may succeed on a later attempt.
	Transient,
}

/// Context passed to strategies when classifying token errors.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenErrorContext {
	/// HTTP status code, when available.
	pub http_status: Option<u16>,
	/// OAuth `error` field.
	pub oauth_error: Option<String>,
	/// OAuth `error_description` field; Entra puts `AADSTS` codes here.
	pub error_description: Option<String>,
	/// Preview of a non-JSON response body.
	pub body_preview: Option<String>,
}
impl TokenErrorContext {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Adds an HTTP status code.
	pub fn with_http_status(mut self, status: u16) -> Self {
		self.http_status = Some(status);

		self
	}

	/// Adds the OAuth `error` code.
	pub fn with_oauth_error(mut self, error: impl Into<String>) -> Self {
		self.oauth_error = Some(error.into());

		self
	}

	/// Adds the OAuth `error_description`.
	pub fn with_error_description(mut self, description: impl Into<String>) -> Self {
		self.error_description = Some(description.into());

		self
	}

	/// Adds a truncated body preview.
	pub fn with_body_preview(mut self, body: impl AsRef<str>) -> Self {
		let body = body.as_ref();
		let mut preview: String = body.chars().take(Self::BODY_PREVIEW_LIMIT).collect();

		if body.chars().nth(Self::BODY_PREVIEW_LIMIT).is_some() {
			preview.push('…');
		}

		self.body_preview = Some(preview);

		self
	}
}

/// Default strategy for the Microsoft identity platform.
///
/// Order of evidence: `AADSTS` codes found in the description or body, then the OAuth `error`
/// code, then the HTTP status. Entra pairs several AADSTS codes with a generic
/// `invalid_request`, so the code decides when both are present.
#[derive(Debug, Default)]
pub struct EntraStrategy;
impl TokenErrorStrategy for EntraStrategy {
	fn classify(&self, ctx: &TokenErrorContext) -> TokenErrorKind {
		let aadsts = ctx
			.error_description
			.as_deref()
			.and_then(classify_aadsts)
			.or_else(|| ctx.body_preview.as_deref().and_then(classify_aadsts));

		aadsts
			.or_else(|| ctx.oauth_error.as_deref().and_then(classify_oauth_error))
			.unwrap_or_else(|| classify_status(ctx.http_status))
	}
}

const INVALID_CLIENT_CODES: &[&str] = &["AADSTS7000215", "AADSTS7000222", "AADSTS700016"];
const INVALID_TENANT_CODES: &[&str] = &["AADSTS90002", "AADSTS900023"];
const INVALID_SCOPE_CODES: &[&str] = &["AADSTS70011", "AADSTS1002012"];

fn classify_aadsts(text: &str) -> Option<TokenErrorKind> {
	let code = text
		.split(|c: char| !c.is_ascii_alphanumeric())
		.find(|word| word.starts_with("AADSTS"))?;

	if INVALID_CLIENT_CODES.contains(&code) {
		Some(TokenErrorKind::InvalidClient)
	} else if INVALID_TENANT_CODES.contains(&code) {
		Some(TokenErrorKind::InvalidTenant)
	} else if INVALID_SCOPE_CODES.contains(&code) {
		Some(TokenErrorKind::InvalidScope)
	} else {
		None
	}
}

fn classify_oauth_error(value: &str) -> Option<TokenErrorKind> {
	match value.to_ascii_lowercase().as_str() {
		"invalid_client" | "unauthorized_client" => Some(TokenErrorKind::InvalidClient),
		"invalid_request" | "invalid_resource" => Some(TokenErrorKind::InvalidTenant),
		"invalid_scope" => Some(TokenErrorKind::InvalidScope),
		"temporarily_unavailable" | "server_error" => Some(TokenErrorKind::Transient),
		_ => None,
	}
}

fn classify_status(status: Option<u16>) -> TokenErrorKind {
	match status {
		Some(400) => TokenErrorKind::InvalidTenant,
		Some(401) => TokenErrorKind::InvalidClient,
		_ => TokenErrorKind::Transient,
	}
}
