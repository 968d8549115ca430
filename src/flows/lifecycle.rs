//! Authorization-code exchange, consent URL, and role grant.
//!
//! The exchange owns the scope policy: a grant that lacks any required scope is rejected
//! before the user profile is fetched, so nothing reaches the store.

// self
use crate::{
	_prelude::*,
	auth::{RoleId, UserIdentity, UserRecord},
	flows::{Broker, observed},
	http::ProviderHttpClient,
	oauth::TransportErrorMapper,
	obs::FlowKind,
	provider::{MemberLookup, ProviderUser},
};

impl<C, M> Broker<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Builds the consent URL users visit to authorize the application.
	///
	/// The URL is derived only from configuration, so repeated calls return equal values.
	pub fn authorization_url(&self) -> Url {
		let descriptor = &self.provider.descriptor;
		let credentials = &self.provider.credentials;
		let mut url = descriptor.authorization_endpoint.clone();

		url.query_pairs_mut()
			.append_pair("client_id", credentials.client_id.as_str())
			.append_pair("redirect_uri", credentials.redirect_uri.as_str())
			.append_pair("response_type", "code")
			.append_pair("scope", &descriptor.required_scopes.normalized());

		url
	}

	/// Exchanges an authorization code, stores the resulting token pair, and returns the
	/// user's identity.
	///
	/// Fails with [`Error::InsufficientScope`] when the granted scopes do not cover the
	/// descriptor's required scopes; the store is left untouched in that case.
	pub async fn exchange_authorization_code(&self, code: &str) -> Result<UserIdentity> {
		observed(FlowKind::AuthorizationCode, "exchange_authorization_code", async move {
			let exchange = self.provider.exchange_code(code).await?;
			let required = &self.provider.descriptor.required_scopes;

			if !exchange.scope.is_superset_of(required) {
				return Err(Error::InsufficientScope {
					reason: format!("missing {}", exchange.scope.missing(required).join(" ")),
				});
			}

			let user = self.provider.current_user(&exchange.access_token).await?;
			let record = UserRecord::new(
				user.id,
				user.username,
				exchange.access_token,
				exchange.refresh_token,
			);

			self.store.upsert(record.clone()).await?;

			Ok(record.identity())
		})
		.await
	}

	/// Exchanges `code`, then grants `role` if the user is already in the guild.
	///
	/// Returns `true` after a grant, `false` when the member lookup is inconclusive, and
	/// [`Error::UnknownUser`] (without any grant call) when the user is not in the guild.
	pub async fn validate_and_grant_role(&self, code: &str, role: &RoleId) -> Result<bool> {
		let identity = self.exchange_authorization_code(code).await?;

		observed(FlowKind::RoleGrant, "validate_and_grant_role", async move {
			match self.provider.guild_member(&self.guild, &identity.user_id).await? {
				MemberLookup::Present(_) => {
					self.provider.grant_role(&self.guild, &identity.user_id, role).await?;

					Ok(true)
				},
				MemberLookup::Missing =>
					Err(Error::UnknownUser { user: identity.user_id.to_string() }),
				MemberLookup::Unavailable(_) => Ok(false),
			}
		})
		.await
	}

	/// Confirms the service credential is accepted by resolving the bot's own user.
	pub async fn verify_service_credential(&self) -> Result<ProviderUser> {
		self.provider.service_identity().await
	}
}
