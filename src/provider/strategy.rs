//! Provider strategy hooks that classify error responses.
//!
//! Strategies see only crate-owned data (status, OAuth error fields, a body preview), so
//! they stay independent of whichever HTTP client executed the call. The provider client
//! consults the strategy before any typed endpoint interprets a status code.

// self
use crate::_prelude::*;

/// Strategy hook that maps raw provider responses into the broker error taxonomy.
pub trait ProviderStrategy: Send + Sync {
	/// Returns the error category for a response, or `None` to hand the status to the caller.
	fn classify(&self, ctx: &ProviderErrorContext) -> Option<ProviderErrorKind>;
}

/// Canonical provider error categories used by strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderErrorKind {
	/// The credential on the call was rejected.
	Unauthorized,
	/// The provider asked the caller to back off.
	RateLimited,
	/// The authorization code or refresh token is permanently dead.
	InvalidGrant,
	/// The provider rejected the request for a reason the broker does not model.
	Unclassified,
}

/// Context passed to provider strategies when classifying a response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderErrorContext {
	/// Route that produced the response.
	pub route: String,
	/// HTTP status code returned by the provider.
	pub http_status: u16,
	/// Provider-supplied OAuth `error` field.
	pub oauth_error: Option<String>,
	/// Provider-supplied OAuth `error_description` field.
	pub error_description: Option<String>,
	/// Preview of the response body.
	pub body_preview: Option<String>,
}
impl ProviderErrorContext {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Creates a new context for a response on `route`.
	pub fn new(route: impl Into<String>, http_status: u16) -> Self {
		Self {
			route: route.into(),
			http_status,
			oauth_error: None,
			error_description: None,
			body_preview: None,
		}
	}

	/// Adds the OAuth error code string returned by the provider.
	pub fn with_oauth_error(mut self, error: impl Into<String>) -> Self {
		self.oauth_error = Some(error.into());

		self
	}

	/// Adds the OAuth `error_description` field.
	pub fn with_error_description(mut self, description: impl Into<String>) -> Self {
		self.error_description = Some(description.into());

		self
	}

	/// Adds a body preview, truncated to a bounded number of characters.
	pub fn with_body_preview(mut self, body: impl Into<String>) -> Self {
		self.body_preview = Some(truncate_preview(body.into()));

		self
	}

	/// Best available human-readable explanation for the failure.
	pub fn reason(&self) -> String {
		self.error_description
			.clone()
			.or_else(|| self.oauth_error.clone())
			.or_else(|| self.body_preview.clone())
			.unwrap_or_else(|| format!("HTTP {}", self.http_status))
	}
}

/// Default strategy for Discord-style providers.
///
/// 401 and 429 are classified by status alone. A 400 is an invalid grant only when the
/// OAuth `error` field (or, failing that, the body) says `invalid_grant`; every other 400
/// is unclassified. Remaining statuses are left to the typed endpoint.
#[derive(Debug, Default)]
pub struct DefaultProviderStrategy;
impl Display for DefaultProviderStrategy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("default-provider-strategy")
	}
}
impl ProviderStrategy for DefaultProviderStrategy {
	fn classify(&self, ctx: &ProviderErrorContext) -> Option<ProviderErrorKind> {
		match ctx.http_status {
			401 => Some(ProviderErrorKind::Unauthorized),
			429 => Some(ProviderErrorKind::RateLimited),
			400 if is_invalid_grant(ctx) => Some(ProviderErrorKind::InvalidGrant),
			400 => Some(ProviderErrorKind::Unclassified),
			_ => None,
		}
	}
}

fn is_invalid_grant(ctx: &ProviderErrorContext) -> bool {
	match ctx.oauth_error.as_deref() {
		Some(code) => code.eq_ignore_ascii_case("invalid_grant"),
		None => ctx
			.body_preview
			.as_deref()
			.is_some_and(|body| body.to_ascii_lowercase().contains("invalid_grant")),
	}
}

fn truncate_preview(body: String) -> String {
	if body.chars().count() <= ProviderErrorContext::BODY_PREVIEW_LIMIT {
		return body;
	}

	let mut buf = String::new();

	for (idx, ch) in body.chars().enumerate() {
		if idx >= ProviderErrorContext::BODY_PREVIEW_LIMIT {
			buf.push('…');

			break;
		}

		buf.push(ch);
	}

	buf
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn classify(ctx: ProviderErrorContext) -> Option<ProviderErrorKind> {
		DefaultProviderStrategy.classify(&ctx)
	}

	#[test]
	fn status_only_classes() {
		assert_eq!(
			classify(ProviderErrorContext::new("/users/@me", 401)),
			Some(ProviderErrorKind::Unauthorized)
		);
		assert_eq!(
			classify(ProviderErrorContext::new("/users/@me", 429)),
			Some(ProviderErrorKind::RateLimited)
		);
		assert_eq!(classify(ProviderErrorContext::new("/guilds/1/members/2", 403)), None);
		assert_eq!(classify(ProviderErrorContext::new("/guilds/1/members/2", 201)), None);
	}

	#[test]
	fn bad_request_needs_invalid_grant_to_be_a_grant_error() {
		let grant = ProviderErrorContext::new("/oauth2/token", 400).with_oauth_error("invalid_grant");
		let other =
			ProviderErrorContext::new("/oauth2/token", 400).with_oauth_error("invalid_request");
		let body_only = ProviderErrorContext::new("/oauth2/token", 400)
			.with_body_preview(r#"{"error": "INVALID_GRANT"}"#);

		assert_eq!(classify(grant), Some(ProviderErrorKind::InvalidGrant));
		assert_eq!(classify(other), Some(ProviderErrorKind::Unclassified));
		assert_eq!(classify(body_only), Some(ProviderErrorKind::InvalidGrant));
		assert_eq!(
			classify(ProviderErrorContext::new("/oauth2/token", 400)),
			Some(ProviderErrorKind::Unclassified)
		);
	}

	#[test]
	fn previews_are_truncated_and_reasons_prefer_descriptions() {
		let ctx = ProviderErrorContext::new("/x", 400).with_body_preview("a".repeat(400));
		let preview = ctx.body_preview.clone().expect("Preview should be recorded.");

		assert_eq!(preview.chars().count(), ProviderErrorContext::BODY_PREVIEW_LIMIT + 1);
		assert!(preview.ends_with('…'));

		let ctx = ctx.with_oauth_error("invalid_request").with_error_description("bad code");

		assert_eq!(ctx.reason(), "bad code");
		assert_eq!(ProviderErrorContext::new("/x", 502).reason(), "HTTP 502");
	}
}
