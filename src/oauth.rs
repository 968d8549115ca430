//! OAuth client credentials, token-response decoding, and transport error mapping.

// crates.io
use oauth2::{
	ClientId, ClientSecret, RedirectUrl, TokenResponse,
	basic::{BasicErrorResponse, BasicTokenResponse},
};
// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenSecret},
	error::{ConfigError, TransportError},
};

/// Maps HTTP transport failures into broker [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an error emitted by the transport while calling `route` into a broker error.
	fn map_transport_error(&self, route: &str, error: E) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(&self, route: &str, err: ReqwestError) -> Error {
		if err.is_builder() {
			return ConfigError::from(err).into();
		}
		if err.is_timeout() {
			return TransportError::Timeout { route: route.to_owned() }.into();
		}

		TransportError::network(route, err).into()
	}
}

/// Application credentials used against the token endpoint and the guild API.
#[derive(Clone, Debug)]
pub struct ClientCredentials {
	/// OAuth 2.0 client identifier.
	pub client_id: ClientId,
	/// OAuth 2.0 client secret, sent in the token request body.
	pub client_secret: ClientSecret,
	/// Redirect URI registered with the provider.
	pub redirect_uri: RedirectUrl,
	/// Privileged bot credential used for guild administration.
	pub service_token: TokenSecret,
}
impl ClientCredentials {
	/// Validates and bundles the application credentials.
	pub fn new(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		redirect_uri: impl Into<String>,
		service_token: impl Into<TokenSecret>,
	) -> Result<Self> {
		let redirect_uri = RedirectUrl::new(redirect_uri.into())
			.map_err(|source| ConfigError::InvalidRedirect { source })?;

		Ok(Self {
			client_id: ClientId::new(client_id.into()),
			client_secret: ClientSecret::new(client_secret.into()),
			redirect_uri,
			service_token: service_token.into(),
		})
	}

	/// Form fields identifying the client on token endpoint calls.
	pub(crate) fn form_fields(&self) -> [(String, String); 2] {
		[
			("client_id".into(), self.client_id.as_str().to_owned()),
			("client_secret".into(), self.client_secret.secret().to_owned()),
		]
	}
}

/// Token pair returned by an authorization-code or refresh-token exchange.
#[derive(Clone, Debug)]
pub struct TokenExchange {
	/// Newly minted access token.
	pub access_token: TokenSecret,
	/// Rotated refresh token.
	pub refresh_token: TokenSecret,
	/// Scopes the user actually granted.
	pub scope: ScopeSet,
	/// Access token lifetime, when reported.
	pub expires_in: Option<Duration>,
}
impl TokenExchange {
	/// Converts a decoded token endpoint response, rejecting responses without a refresh token.
	pub fn from_response(status: u16, response: &BasicTokenResponse) -> Result<Self> {
		let refresh_token = response.refresh_token().map(TokenSecret::from).ok_or_else(|| {
			Error::UnexpectedResponse {
				status,
				message: "Token endpoint response is missing a refresh token".into(),
			}
		})?;
		let scope = match response.scopes() {
			Some(scopes) => ScopeSet::new(scopes.iter().map(|scope| scope.as_str().to_owned()))
				.map_err(ConfigError::from)?,
			None => ScopeSet::default(),
		};
		let expires_in = response.expires_in().and_then(|lifetime| Duration::try_from(lifetime).ok());

		Ok(Self {
			access_token: TokenSecret::from(response.access_token()),
			refresh_token,
			scope,
			expires_in,
		})
	}
}

/// Extracts the OAuth `error` code (for example `invalid_grant`) from an error body.
pub(crate) fn oauth_error_code(body: &[u8]) -> Option<(String, Option<String>)> {
	let response = serde_json::from_slice::<BasicErrorResponse>(body).ok()?;

	Some((response.error().as_ref().to_owned(), response.error_description().cloned()))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn decode(body: &str) -> BasicTokenResponse {
		serde_json::from_str(body).expect("Token response fixture should decode.")
	}

	#[test]
	fn exchange_reads_scope_and_tokens() {
		let response = decode(
			r#"{"access_token":"a-1","refresh_token":"r-1","token_type":"Bearer","expires_in":604800,"scope":"identify guilds.join"}"#,
		);
		let exchange =
			TokenExchange::from_response(200, &response).expect("Exchange should convert.");

		assert_eq!(exchange.access_token.expose(), "a-1");
		assert_eq!(exchange.refresh_token.expose(), "r-1");
		assert!(exchange.scope.contains("guilds.join"));
		assert!(exchange.scope.contains("identify"));
		assert_eq!(exchange.expires_in, Some(Duration::days(7)));
	}

	#[test]
	fn exchange_without_refresh_token_is_rejected() {
		let response = decode(r#"{"access_token":"a-1","token_type":"Bearer"}"#);
		let err = TokenExchange::from_response(200, &response)
			.expect_err("Missing refresh token must be rejected.");

		assert!(matches!(err, Error::UnexpectedResponse { status: 200, .. }));
	}

	#[test]
	fn oauth_error_code_reads_invalid_grant() {
		let (code, description) =
			oauth_error_code(br#"{"error":"invalid_grant","error_description":"expired"}"#)
				.expect("Error body should decode.");

		assert_eq!(code, "invalid_grant");
		assert_eq!(description.as_deref(), Some("expired"));
		assert!(oauth_error_code(br#"{"message":"401: Unauthorized","code":0}"#).is_none());
	}

	#[test]
	fn credentials_reject_invalid_redirects() {
		let err = ClientCredentials::new("id", "secret", "not a url", "bot")
			.expect_err("Relative redirect must be rejected.");

		assert!(matches!(err, Error::Config(ConfigError::InvalidRedirect { .. })));

		let creds = ClientCredentials::new("id", "secret", "https://example.com/callback", "bot")
			.expect("Valid credentials should build.");

		assert!(!format!("{creds:?}").contains("\"secret\""));
	}
}
