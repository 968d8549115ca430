//! Per-user token record persisted by the token store.

// self
use crate::{
	_prelude::*,
	auth::{TokenSecret, UserId, UserIdentity},
};

/// Stored token pair for a single user, keyed by [`UserId`].
///
/// Records are created by the first successful code exchange, rewritten on every exchange
/// or refresh, and deleted once the refresh token is known to be dead.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
	/// Primary key.
	pub user_id: UserId,
	/// Display name; may change between exchanges.
	pub username: String,
	/// Short-lived bearer token used for guild joins.
	pub access_token: TokenSecret,
	/// Long-lived token used to mint new access tokens.
	pub refresh_token: TokenSecret,
	/// Instant of the last write.
	pub updated_at: OffsetDateTime,
}
impl UserRecord {
	/// Creates a record stamped with the current UTC instant.
	pub fn new(
		user_id: UserId,
		username: impl Into<String>,
		access_token: impl Into<TokenSecret>,
		refresh_token: impl Into<TokenSecret>,
	) -> Self {
		Self {
			user_id,
			username: username.into(),
			access_token: access_token.into(),
			refresh_token: refresh_token.into(),
			updated_at: OffsetDateTime::now_utc(),
		}
	}

	/// Returns a copy carrying a rotated token pair, keeping the identity fields.
	pub fn rotated(&self, access_token: TokenSecret, refresh_token: TokenSecret) -> Self {
		Self::new(self.user_id.clone(), self.username.clone(), access_token, refresh_token)
	}

	/// Identity triple exposed to callers after an exchange.
	pub fn identity(&self) -> UserIdentity {
		UserIdentity {
			user_id: self.user_id.clone(),
			username: self.username.clone(),
			access_token: self.access_token.clone(),
		}
	}
}
impl Debug for UserRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("UserRecord")
			.field("user_id", &self.user_id)
			.field("username", &self.username)
			.field("access_token", &"<redacted>")
			.field("refresh_token", &"<redacted>")
			.field("updated_at", &self.updated_at)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn record() -> UserRecord {
		UserRecord::new(
			UserId::new("1001").expect("User fixture should be valid."),
			"ferris",
			"access-1",
			"refresh-1",
		)
	}

	#[test]
	fn rotation_keeps_identity_and_replaces_tokens() {
		let original = record();
		let rotated = original.rotated("access-2".into(), "refresh-2".into());

		assert_eq!(rotated.user_id, original.user_id);
		assert_eq!(rotated.username, "ferris");
		assert_eq!(rotated.access_token.expose(), "access-2");
		assert_eq!(rotated.refresh_token.expose(), "refresh-2");
		assert!(rotated.updated_at >= original.updated_at);
	}

	#[test]
	fn debug_output_redacts_tokens() {
		let rendered = format!("{:?}", record());

		assert!(rendered.contains("ferris"));
		assert!(!rendered.contains("access-1"));
		assert!(!rendered.contains("refresh-1"));
	}

	#[test]
	fn identity_exposes_the_current_access_token() {
		let identity = record().identity();

		assert_eq!(identity.user_id.as_ref(), "1001");
		assert_eq!(identity.access_token.expose(), "access-1");
		assert_eq!(identity.to_string(), "ferris (1001)");
	}
}
