//! Identity triple handed back by code exchanges and refreshes.

// self
use crate::{
	_prelude::*,
	auth::{TokenSecret, UserId},
};

/// The `(user id, username, access token)` triple produced by a successful exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserIdentity {
	/// Provider-side user identifier.
	pub user_id: UserId,
	/// Display name at the time of the exchange.
	pub username: String,
	/// Freshly minted access token.
	pub access_token: TokenSecret,
}
impl Display for UserIdentity {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{} ({})", self.username, self.user_id)
	}
}
