//! Single-member guild join.

// self
use crate::{
	_prelude::*,
	auth::{TokenSecret, UserId},
	flows::{Broker, observed},
	http::ProviderHttpClient,
	oauth::TransportErrorMapper,
	obs::FlowKind,
	provider::MembershipJoin,
};

/// Outcome of one join attempt.
///
/// Only provider responses the reconciler acts on are variants; anything else is an
/// [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinOutcome {
	/// The user was added to the guild.
	Joined,
	/// The user was already a member.
	AlreadyMember,
	/// The stored access token no longer authorizes the join.
	AccessTokenExpired,
	/// The provider does not know the user.
	UnknownUser,
	/// The provider rejected the grant behind the access token.
	GrantInvalid,
	/// No record is stored for the user.
	MissingRecord,
}
impl JoinOutcome {
	/// Returns true for the two terminal successes.
	pub const fn is_success(self) -> bool {
		matches!(self, JoinOutcome::Joined | JoinOutcome::AlreadyMember)
	}

	/// Returns true when a refresh may make the next attempt succeed.
	pub const fn needs_refresh(self) -> bool {
		matches!(
			self,
			JoinOutcome::AccessTokenExpired | JoinOutcome::UnknownUser | JoinOutcome::GrantInvalid
		)
	}
}
impl From<MembershipJoin> for JoinOutcome {
	fn from(value: MembershipJoin) -> Self {
		match value {
			MembershipJoin::Joined => JoinOutcome::Joined,
			MembershipJoin::AlreadyMember => JoinOutcome::AlreadyMember,
			MembershipJoin::AccessTokenExpired => JoinOutcome::AccessTokenExpired,
			MembershipJoin::UnknownUser => JoinOutcome::UnknownUser,
		}
	}
}

impl<C, M> Broker<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Adds `user` to the managed guild with their stored access token.
	pub async fn join(&self, user: &UserId) -> Result<JoinOutcome> {
		observed(FlowKind::Join, "join", async move {
			let Some(record) = self.store.get(user).await? else {
				return Ok(JoinOutcome::MissingRecord);
			};

			self.join_with(user, &record.access_token).await
		})
		.await
	}

	/// Adds `user` to the managed guild with an explicit access token.
	pub(crate) async fn join_with(
		&self,
		user: &UserId,
		access_token: &TokenSecret,
	) -> Result<JoinOutcome> {
		match self.provider.add_guild_member(&self.guild, user, access_token).await {
			Ok(join) => Ok(join.into()),
			Err(Error::InvalidGrant { .. }) => Ok(JoinOutcome::GrantInvalid),
			Err(err) => Err(err),
		}
	}
}
