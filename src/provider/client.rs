//! Typed request executor for the provider's REST surface.

// crates.io
use oauth2::basic::BasicTokenResponse;
use serde::de::DeserializeOwned;
use serde_json::json;
// self
use crate::{
	_prelude::*,
	auth::{GuildId, RoleId, TokenSecret, UserId},
	error::ConfigError,
	http::{HttpMethod, HttpRequest, ProviderHttpClient, RawResponse, RequestBody},
	oauth::{self, ClientCredentials, TokenExchange, TransportErrorMapper},
	provider::{ProviderDescriptor, ProviderErrorContext, ProviderErrorKind, ProviderStrategy},
};

/// Credential attached to a provider call.
#[derive(Clone, Copy, Debug)]
pub enum AuthMode<'a> {
	/// Token endpoint call; the client id and secret travel in the form body.
	Client,
	/// Privileged service credential (`Bot <token>`).
	Service,
	/// Per-user access token (`Bearer <token>`).
	Bearer(&'a TokenSecret),
}

/// Request payload.
#[derive(Clone, Debug)]
pub enum Payload {
	/// Form-encoded fields.
	Form(Vec<(String, String)>),
	/// JSON document.
	Json(serde_json::Value),
}

/// Response that survived strategy classification.
#[derive(Clone, Debug)]
pub struct ProviderResponse {
	/// HTTP status code.
	pub status: u16,
	/// Raw body bytes.
	pub body: Vec<u8>,
}
impl ProviderResponse {
	/// Decodes the body as JSON, reporting the failing path on error.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let mut de = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut de)
			.map_err(|source| Error::MalformedResponse { source, status: self.status })
	}

	fn unexpected(&self) -> Error {
		let preview = String::from_utf8_lossy(&self.body);
		let message = if preview.trim().is_empty() {
			"empty body".to_owned()
		} else {
			preview.chars().take(256).collect()
		};

		Error::UnexpectedResponse { status: self.status, message }
	}
}

/// User object returned by `GET /users/@me`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ProviderUser {
	/// Stable user identifier.
	pub id: UserId,
	/// Current display name.
	pub username: String,
}

/// Guild member object.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct GuildMember {
	/// Embedded user object; absent on some partial member payloads.
	#[serde(default)]
	pub user: Option<ProviderUser>,
	/// Roles currently assigned to the member.
	#[serde(default)]
	pub roles: Vec<RoleId>,
}

/// Result of adding a user to the guild with their access token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MembershipJoin {
	/// The user was added (201).
	Joined,
	/// The user was already a member (204).
	AlreadyMember,
	/// The access token no longer authorizes the join (403).
	AccessTokenExpired,
	/// The provider does not know the user (404).
	UnknownUser,
}

/// Result of looking up a guild member.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MemberLookup {
	/// The user is in the guild (200).
	Present(GuildMember),
	/// The user is not in the guild (404).
	Missing,
	/// The provider answered with another non-error status.
	Unavailable(u16),
}

/// Provider REST client bound to one descriptor, one credential set, and one transport.
pub struct ProviderClient<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every outbound provider request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Strategy responsible for classifying error responses.
	pub strategy: Arc<dyn ProviderStrategy>,
	/// Provider descriptor that defines endpoints and required scopes.
	pub descriptor: ProviderDescriptor,
	/// Application credentials.
	pub credentials: ClientCredentials,
}
impl<C, M> ProviderClient<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a client from its collaborators.
	pub fn new(
		descriptor: ProviderDescriptor,
		strategy: Arc<dyn ProviderStrategy>,
		credentials: ClientCredentials,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			strategy,
			descriptor,
			credentials,
		}
	}

	/// Executes a call and classifies the response.
	///
	/// 2xx responses are returned untouched. Anything else goes through the strategy:
	/// classified failures become errors and unclassified statuses are returned so the
	/// typed endpoint can interpret them.
	pub async fn request(
		&self,
		route: &str,
		method: HttpMethod,
		payload: Option<Payload>,
		auth: AuthMode<'_>,
	) -> Result<ProviderResponse> {
		let url = self
			.descriptor
			.route_url(route)
			.map_err(|source| ConfigError::InvalidRoute { route: route.to_owned(), source })?;
		let authorization = match auth {
			AuthMode::Client => None,
			AuthMode::Service => Some(self.credentials.service_token.authorization("Bot")),
			AuthMode::Bearer(token) => Some(token.authorization("Bearer")),
		};
		let body = match payload {
			None => RequestBody::Empty,
			Some(Payload::Form(mut fields)) => {
				if matches!(auth, AuthMode::Client) {
					fields.extend(self.credentials.form_fields());
				}

				RequestBody::Form(fields)
			},
			Some(Payload::Json(value)) => RequestBody::Json(value.to_string().into_bytes()),
		};
		let raw = self
			.http_client
			.execute(HttpRequest { method, url, authorization, body })
			.await
			.map_err(|err| self.transport_mapper.map_transport_error(route, err))?;

		self.classify(route, raw)
	}

	fn classify(&self, route: &str, raw: RawResponse) -> Result<ProviderResponse> {
		let RawResponse { status, retry_after, body } = raw;

		if (200..300).contains(&status) {
			return Ok(ProviderResponse { status, body });
		}

		let mut ctx = ProviderErrorContext::new(route, status);

		if let Some((code, description)) = oauth::oauth_error_code(&body) {
			ctx = ctx.with_oauth_error(code);

			if let Some(description) = description {
				ctx = ctx.with_error_description(description);
			}
		}
		if !body.is_empty() {
			ctx = ctx.with_body_preview(String::from_utf8_lossy(&body));
		}

		match self.strategy.classify(&ctx) {
			None => Ok(ProviderResponse { status, body }),
			Some(ProviderErrorKind::Unauthorized) =>
				Err(Error::Unauthorized { route: route.to_owned() }),
			Some(ProviderErrorKind::RateLimited) =>
				Err(Error::RateLimited { route: route.to_owned(), retry_after }),
			Some(ProviderErrorKind::InvalidGrant) => Err(Error::InvalidGrant { reason: ctx.reason() }),
			Some(ProviderErrorKind::Unclassified) =>
				Err(Error::UnexpectedResponse { status, message: ctx.reason() }),
		}
	}

	/// Exchanges an authorization code for a token pair.
	pub async fn exchange_code(&self, code: &str) -> Result<TokenExchange> {
		let fields = vec![
			("grant_type".to_owned(), "authorization_code".to_owned()),
			("code".to_owned(), code.to_owned()),
			("redirect_uri".to_owned(), self.credentials.redirect_uri.as_str().to_owned()),
		];

		self.token_call(fields).await
	}

	/// Exchanges a refresh token for a rotated token pair.
	pub async fn exchange_refresh(&self, refresh_token: &TokenSecret) -> Result<TokenExchange> {
		let fields = vec![
			("grant_type".to_owned(), "refresh_token".to_owned()),
			("refresh_token".to_owned(), refresh_token.expose().to_owned()),
		];

		self.token_call(fields).await
	}

	async fn token_call(&self, fields: Vec<(String, String)>) -> Result<TokenExchange> {
		let route = self.descriptor.token_route.as_str();
		let response =
			self.request(route, HttpMethod::Post, Some(Payload::Form(fields)), AuthMode::Client).await?;

		if response.status != 200 {
			return Err(response.unexpected());
		}

		let decoded = response.json::<BasicTokenResponse>()?;

		TokenExchange::from_response(response.status, &decoded)
	}

	/// Resolves the user behind an access token.
	pub async fn current_user(&self, access_token: &TokenSecret) -> Result<ProviderUser> {
		self.me(AuthMode::Bearer(access_token)).await
	}

	/// Resolves the application's own bot user, proving the service credential works.
	pub async fn service_identity(&self) -> Result<ProviderUser> {
		self.me(AuthMode::Service).await
	}

	async fn me(&self, auth: AuthMode<'_>) -> Result<ProviderUser> {
		let response = self.request("/users/@me", HttpMethod::Get, None, auth).await?;

		match response.status {
			200 => response.json(),
			_ => Err(response.unexpected()),
		}
	}

	/// Adds `user` to `guild` using the user's access token.
	pub async fn add_guild_member(
		&self,
		guild: &GuildId,
		user: &UserId,
		access_token: &TokenSecret,
	) -> Result<MembershipJoin> {
		let route = format!("/guilds/{guild}/members/{user}");
		let payload = Payload::Json(json!({ "access_token": access_token.expose() }));
		let response =
			self.request(&route, HttpMethod::Put, Some(payload), AuthMode::Service).await?;

		match response.status {
			201 => Ok(MembershipJoin::Joined),
			204 => Ok(MembershipJoin::AlreadyMember),
			403 => Ok(MembershipJoin::AccessTokenExpired),
			404 => Ok(MembershipJoin::UnknownUser),
			_ => Err(response.unexpected()),
		}
	}

	/// Looks up `user` in `guild`.
	pub async fn guild_member(&self, guild: &GuildId, user: &UserId) -> Result<MemberLookup> {
		let route = format!("/guilds/{guild}/members/{user}");
		let response = self.request(&route, HttpMethod::Get, None, AuthMode::Service).await?;

		match response.status {
			200 => Ok(MemberLookup::Present(response.json()?)),
			404 => Ok(MemberLookup::Missing),
			status => Ok(MemberLookup::Unavailable(status)),
		}
	}

	/// Assigns `role` to `user` in `guild`.
	pub async fn grant_role(&self, guild: &GuildId, user: &UserId, role: &RoleId) -> Result<()> {
		let route = format!("/guilds/{guild}/members/{user}/roles/{role}");
		let response = self.request(&route, HttpMethod::Put, None, AuthMode::Service).await?;

		match response.status {
			200 | 204 => Ok(()),
			_ => Err(response.unexpected()),
		}
	}

	/// Lists the ids of every member currently in `guild`, following `after` cursors.
	pub async fn list_guild_members(&self, guild: &GuildId) -> Result<Vec<UserId>> {
		let limit = usize::from(self.descriptor.member_page_limit);
		let mut members = Vec::new();
		let mut after: Option<UserId> = None;

		loop {
			let route = match &after {
				Some(cursor) => format!("/guilds/{guild}/members?limit={limit}&after={cursor}"),
				None => format!("/guilds/{guild}/members?limit={limit}"),
			};
			let response = self.request(&route, HttpMethod::Get, None, AuthMode::Service).await?;

			if response.status != 200 {
				return Err(response.unexpected());
			}

			let page = response.json::<Vec<GuildMember>>()?;
			let page_len = page.len();
			let last = page
				.into_iter()
				.filter_map(|member| member.user.map(|user| user.id))
				.inspect(|id| members.push(id.clone()))
				.max_by(|lhs, rhs| snowflake_cmp(lhs, rhs));

			match last {
				Some(last) if page_len >= limit
					&& after.as_ref().is_none_or(|prev| snowflake_cmp(&last, prev).is_gt()) =>
					after = Some(last),
				_ => break,
			}
		}

		Ok(members)
	}
}
impl<C, M> Clone for ProviderClient<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			http_client: self.http_client.clone(),
			transport_mapper: self.transport_mapper.clone(),
			strategy: self.strategy.clone(),
			descriptor: self.descriptor.clone(),
			credentials: self.credentials.clone(),
		}
	}
}
impl<C, M> Debug for ProviderClient<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ProviderClient")
			.field("descriptor", &self.descriptor.id)
			.field("api_base", &self.descriptor.api_base.as_str())
			.field("client_id", &self.credentials.client_id.as_str())
			.finish()
	}
}

/// Orders numeric snowflake ids by value, falling back to byte order otherwise.
fn snowflake_cmp(lhs: &UserId, rhs: &UserId) -> std::cmp::Ordering {
	lhs.len().cmp(&rhs.len()).then_with(|| lhs.as_ref().cmp(rhs.as_ref()))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn id(raw: &str) -> UserId {
		UserId::new(raw).expect("User id fixture should be valid.")
	}

	#[test]
	fn snowflakes_compare_numerically() {
		assert!(snowflake_cmp(&id("100"), &id("99")).is_gt());
		assert!(snowflake_cmp(&id("99"), &id("100")).is_lt());
		assert!(snowflake_cmp(&id("123"), &id("123")).is_eq());
	}

	#[test]
	fn unexpected_responses_carry_a_preview() {
		let response = ProviderResponse { status: 500, body: b"upstream exploded".to_vec() };

		assert!(matches!(
			response.unexpected(),
			Error::UnexpectedResponse { status: 500, message } if message == "upstream exploded"
		));

		let response = ProviderResponse { status: 502, body: Vec::new() };

		assert!(matches!(
			response.unexpected(),
			Error::UnexpectedResponse { message, .. } if message == "empty body"
		));
	}

	#[test]
	fn malformed_json_reports_the_path() {
		let response = ProviderResponse { status: 200, body: br#"{"id": 5, "username": "x"}"#.to_vec() };
		let err = response.json::<ProviderUser>().expect_err("Numeric id must be rejected.");

		match err {
			Error::MalformedResponse { source, status } => {
				assert_eq!(status, 200);
				assert_eq!(source.path().to_string(), "id");
			},
			other => panic!("Unexpected error: {other:?}"),
		}
	}

	#[test]
	fn guild_members_tolerate_missing_fields() {
		let response = ProviderResponse {
			status: 200,
			body: br#"[{"user":{"id":"1","username":"a"},"roles":["9"]},{"nick":"ghost"}]"#.to_vec(),
		};
		let members = response.json::<Vec<GuildMember>>().expect("Members should decode.");

		assert_eq!(members.len(), 2);
		assert_eq!(members[0].roles.len(), 1);
		assert!(members[1].user.is_none());
	}
}
