//! Broker-level error types shared across flows, providers, and stores.

// self
use crate::_prelude::*;

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical broker error exposed by public APIs.
///
/// Expected per-member outcomes (stale access tokens, members already present, purged
/// records) are modeled as enum variants on the flow results instead; everything here
/// either aborts the current operation or is converted into a skip by batch loops.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Provider rejected the credential used for the call (HTTP 401).
	#[error("Provider rejected the credential for {route}.")]
	Unauthorized {
		/// Route that was being called.
		route: String,
	},
	/// Provider asked the caller to slow down (HTTP 429).
	#[error("Provider rate limited the call to {route}.")]
	RateLimited {
		/// Route that was being called.
		route: String,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Provider rejected the grant (authorization code or refresh token is dead).
	#[error("Provider rejected the grant: {reason}.")]
	InvalidGrant {
		/// Provider- or broker-supplied reason string.
		reason: String,
	},
	/// The user granted a narrower scope set than the broker requires.
	#[error("Token lacks the required scopes: {reason}.")]
	InsufficientScope {
		/// Provider- or broker-supplied reason string.
		reason: String,
	},
	/// No stored record exists for the user, or the provider reports the member as absent.
	#[error("User {user} is unknown.")]
	UnknownUser {
		/// Identifier of the user that could not be resolved.
		user: String,
	},
	/// Provider answered with a status the broker does not know how to interpret.
	#[error("Provider returned an unexpected {status} response: {message}.")]
	UnexpectedResponse {
		/// HTTP status code.
		status: u16,
		/// Short description or body preview.
		message: String,
	},
	/// Provider answered with a body that could not be decoded.
	#[error("Provider returned malformed JSON with status {status}.")]
	MalformedResponse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code.
		status: u16,
	},
	/// HTTP method outside of GET/POST/PUT.
	#[error("HTTP method {method} is not supported.")]
	UnsupportedMethod {
		/// Rejected method name.
		method: String,
	},
}

/// Configuration and validation failures raised by the broker.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Route could not be joined onto the API base URL.
	#[error("Route `{route}` does not form a valid URL.")]
	InvalidRoute {
		/// Offending route.
		route: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Redirect URI cannot be parsed.
	#[error("Redirect URI is invalid.")]
	InvalidRedirect {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Provider descriptor failed validation.
	#[error(transparent)]
	InvalidDescriptor(#[from] crate::provider::ProviderDescriptorError),
	/// Identifier failed validation.
	#[error(transparent)]
	InvalidIdentifier(#[from] crate::auth::IdentifierError),
	/// Scope list failed validation.
	#[error("Scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// Required environment variable is absent.
	#[error("Environment variable {name} is not set.")]
	MissingEnv {
		/// Variable name.
		name: &'static str,
	},
	/// Environment variable is present but cannot be used.
	#[error("Environment variable {name} is invalid: {reason}.")]
	InvalidEnv {
		/// Variable name.
		name: &'static str,
		/// Why the value was rejected.
		reason: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {route}.")]
	Network {
		/// Route that was being called.
		route: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request exceeded the transport's deadline.
	#[error("Request to {route} timed out.")]
	Timeout {
		/// Route that was being called.
		route: String,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while talking to the network.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(
		route: impl Into<String>,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { route: route.into(), source: Box::new(src) }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn config_error_converts_into_broker_error() {
		let err: Error = ConfigError::MissingEnv { name: "BOT_TOKEN" }.into();

		assert!(matches!(err, Error::Config(ConfigError::MissingEnv { name: "BOT_TOKEN" })));
		assert_eq!(err.to_string(), "Environment variable BOT_TOKEN is not set.");
	}

	#[test]
	fn provider_errors_render_their_context() {
		let err = Error::UnexpectedResponse { status: 500, message: "boom".into() };

		assert_eq!(err.to_string(), "Provider returned an unexpected 500 response: boom.");

		let err = Error::RateLimited { route: "/users/@me".into(), retry_after: None };

		assert!(err.to_string().contains("/users/@me"));
	}
}
