//! Observability helpers for broker flows.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `guild_broker.flow` with the `flow` and
//!   `stage` fields, plus warn-level events for every member a batch drops.
//! - Enable `metrics` to increment the `guild_broker_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`, and the
//!   `guild_broker_dropped_total` counter labeled by `flow` + `reason`.

mod metrics;
mod span;

pub use metrics::*;
pub use span::*;

// self
use crate::{_prelude::*, auth::UserId};

/// Broker operations observed by spans and counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Authorization code exchange.
	AuthorizationCode,
	/// Single refresh token exchange.
	Refresh,
	/// Single guild join.
	Join,
	/// Role grant after a successful exchange.
	RoleGrant,
	/// Reconciliation run.
	Reconcile,
	/// Refresh of every stored record.
	RefreshAll,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::AuthorizationCode => "authorization_code",
			FlowKind::Refresh => "refresh",
			FlowKind::Join => "join",
			FlowKind::RoleGrant => "role_grant",
			FlowKind::Reconcile => "reconcile",
			FlowKind::RefreshAll => "refresh_all",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a broker helper.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Why a batch skipped a member.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DropReason {
	/// No stored record exists for the member.
	MissingRecord,
	/// The refresh token is dead and the record was purged.
	GrantInvalid,
	/// The refreshed access token still could not join; the record was purged.
	TokenUnusable,
	/// A provider, transport, or storage error interrupted the member.
	Failed,
}
impl DropReason {
	/// Returns a stable label suitable for event or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			DropReason::MissingRecord => "missing_record",
			DropReason::GrantInvalid => "grant_invalid",
			DropReason::TokenUnusable => "token_unusable",
			DropReason::Failed => "failed",
		}
	}
}
impl Display for DropReason {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Records a member a batch gave up on, with the error that caused it when there is one.
pub fn record_drop(kind: FlowKind, user: &UserId, reason: DropReason, error: Option<&Error>) {
	#[cfg(feature = "tracing")]
	{
		match error {
			Some(error) => tracing::warn!(
				flow = kind.as_str(),
				user = %user,
				reason = reason.as_str(),
				error = %error,
				"member dropped"
			),
			None => tracing::warn!(
				flow = kind.as_str(),
				user = %user,
				reason = reason.as_str(),
				"member dropped"
			),
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (user, error);
	}

	record_drop_metric(kind, reason);
}

/// Records a batch that stopped before visiting every member.
pub fn record_batch_failure(kind: FlowKind, error: &Error) {
	#[cfg(feature = "tracing")]
	tracing::error!(flow = kind.as_str(), error = %error, "batch aborted");
	#[cfg(not(feature = "tracing"))]
	let _ = (kind, error);
}

/// Installs the process-wide `tracing` subscriber, honoring `RUST_LOG` (default `info`).
#[cfg(feature = "server")]
pub fn init_subscriber() {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

	// A subscriber installed by the embedding process wins.
	let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn labels_are_stable() {
		assert_eq!(FlowKind::Reconcile.to_string(), "reconcile");
		assert_eq!(FlowKind::RefreshAll.as_str(), "refresh_all");
		assert_eq!(DropReason::TokenUnusable.to_string(), "token_unusable");
		assert_eq!(FlowOutcome::Failure.as_str(), "failure");
	}

	#[test]
	fn record_drop_accepts_missing_errors() {
		let user = UserId::new("42").expect("User fixture should be valid.");

		record_drop(FlowKind::Reconcile, &user, DropReason::MissingRecord, None);
		record_drop(
			FlowKind::Reconcile,
			&user,
			DropReason::Failed,
			Some(&Error::UnknownUser { user: "42".into() }),
		);
		record_batch_failure(FlowKind::RefreshAll, &Error::UnknownUser { user: "42".into() });
	}
}
