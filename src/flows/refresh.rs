//! Refresh token rotation for single users and for the whole store.
//!
//! A refresh that the provider answers with `invalid_grant` deletes the record in the same
//! operation and reports [`RefreshOutcome::Purged`], so no stored record ever keeps a
//! refresh token known to be dead. Successful refreshes rotate both tokens and keep the
//! stored username.

mod metrics;

pub use metrics::RefreshMetrics;

// crates.io
use futures_util::TryStreamExt;
// self
use crate::{
	_prelude::*,
	auth::{UserId, UserIdentity},
	flows::{Broker, observed},
	http::ProviderHttpClient,
	oauth::TransportErrorMapper,
	obs::{self, DropReason, FlowKind},
};

/// Result of refreshing one user's token pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
	/// The pair was rotated and stored.
	Refreshed(UserIdentity),
	/// The grant is dead; the record has been deleted.
	Purged,
}

/// Tally of a [`Broker::refresh_all`] batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefreshReport {
	/// Records visited.
	pub attempted: usize,
	/// Records whose pair was rotated.
	pub refreshed: usize,
	/// Records deleted after an invalid grant.
	pub purged: usize,
	/// Records left untouched because of an error.
	pub failed: usize,
}

impl<C, M> Broker<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Exchanges the stored refresh token of `user` for a new pair.
	///
	/// Fails with [`Error::UnknownUser`] when no record exists.
	pub async fn refresh(&self, user: &UserId) -> Result<RefreshOutcome> {
		observed(FlowKind::Refresh, "refresh", async move {
			self.refresh_metrics.record_attempt();

			let result = self.rotate(user).await;

			match &result {
				Ok(RefreshOutcome::Refreshed(_)) => self.refresh_metrics.record_success(),
				Ok(RefreshOutcome::Purged) => self.refresh_metrics.record_purge(),
				Err(_) => self.refresh_metrics.record_failure(),
			}

			result
		})
		.await
	}

	async fn rotate(&self, user: &UserId) -> Result<RefreshOutcome> {
		let current =
			self.store.get(user).await?.ok_or_else(|| Error::UnknownUser { user: user.to_string() })?;

		match self.provider.exchange_refresh(&current.refresh_token).await {
			Ok(exchange) => {
				let updated = current.rotated(exchange.access_token, exchange.refresh_token);

				self.store.upsert(updated.clone()).await?;

				Ok(RefreshOutcome::Refreshed(updated.identity()))
			},
			Err(Error::InvalidGrant { .. }) => {
				self.store.delete(user).await?;

				Ok(RefreshOutcome::Purged)
			},
			Err(err) => Err(err),
		}
	}

	/// Refreshes every stored record, one at a time, without aborting on per-record errors.
	///
	/// Only a failure to list the store ends the batch early.
	pub async fn refresh_all(&self) -> Result<RefreshReport> {
		const KIND: FlowKind = FlowKind::RefreshAll;

		observed(KIND, "refresh_all", async move {
			let mut report = RefreshReport::default();
			let mut records = self.store.list_all();

			while let Some(record) = records.try_next().await? {
				let user = record.user_id;

				report.attempted += 1;

				match self.refresh(&user).await {
					Ok(RefreshOutcome::Refreshed(_)) => report.refreshed += 1,
					Ok(RefreshOutcome::Purged) => {
						report.purged += 1;

						obs::record_drop(KIND, &user, DropReason::GrantInvalid, None);
					},
					Err(err @ Error::UnknownUser { .. }) => {
						report.failed += 1;

						obs::record_drop(KIND, &user, DropReason::MissingRecord, Some(&err));
					},
					Err(err) => {
						report.failed += 1;

						obs::record_drop(KIND, &user, DropReason::Failed, Some(&err));
					},
				}
			}

			Ok(report)
		})
		.await
	}
}
