//! Membership reconciliation.
//!
//! A run joins every stored user who is missing from the guild roster, one at a time, with
//! a fixed pause before each attempt. A member whose join fails with an authorization
//! problem gets exactly one refresh and one retry; if the retry fails too the record is
//! deleted. No single member can abort the run: errors become skips and are reported
//! through [`obs::record_drop`].

// crates.io
use futures_util::TryStreamExt;
// self
use crate::{
	_prelude::*,
	auth::UserId,
	flows::{Broker, JoinOutcome, RefreshOutcome, observed},
	http::ProviderHttpClient,
	oauth::TransportErrorMapper,
	obs::{self, DropReason, FlowKind, FlowOutcome, FlowSpan},
};

/// Boxed future returned by [`ProgressSink::on_joined`].
pub type ProgressFuture<'a> = Pin<Box<dyn Future<Output = ()> + 'a + Send>>;

/// Receives live progress while a reconciliation run is in flight.
pub trait ProgressSink: Send + Sync {
	/// Called after each terminal success with everything joined so far.
	fn on_joined<'a>(&'a self, progress: &'a ReconciliationProgress) -> ProgressFuture<'a>;
}

/// Sink that ignores progress.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopProgress;
impl ProgressSink for NoopProgress {
	fn on_joined<'a>(&'a self, _: &'a ReconciliationProgress) -> ProgressFuture<'a> {
		Box::pin(async {})
	}
}

/// Users joined so far in the current run, in completion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconciliationProgress {
	joined: Vec<UserId>,
}
impl ReconciliationProgress {
	/// Joined users in completion order.
	pub fn joined(&self) -> &[UserId] {
		&self.joined
	}

	/// Number of joined users.
	pub fn len(&self) -> usize {
		self.joined.len()
	}

	/// Returns true when nobody has been joined yet.
	pub fn is_empty(&self) -> bool {
		self.joined.is_empty()
	}

	/// Returns true when `user` has been joined in this run.
	pub fn contains(&self, user: &UserId) -> bool {
		self.joined.contains(user)
	}

	fn push(&mut self, user: UserId) {
		self.joined.push(user);
	}
}
impl FromIterator<UserId> for ReconciliationProgress {
	fn from_iter<I>(iter: I) -> Self
	where
		I: IntoIterator<Item = UserId>,
	{
		Self { joined: iter.into_iter().collect() }
	}
}

/// Stored users missing from the guild roster, in stored-listing order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
	candidates: Vec<UserId>,
}
impl ReconcilePlan {
	/// Computes `stored - roster`, keeping the first occurrence of each stored id.
	pub fn new<I>(roster: &HashSet<UserId>, stored: I) -> Self
	where
		I: IntoIterator<Item = UserId>,
	{
		let mut seen = HashSet::new();
		let candidates = stored
			.into_iter()
			.filter(|user| !roster.contains(user) && seen.insert(user.clone()))
			.collect();

		Self { candidates }
	}

	/// Users the run will attempt.
	pub fn candidates(&self) -> &[UserId] {
		&self.candidates
	}

	/// Number of users the run will attempt.
	pub fn len(&self) -> usize {
		self.candidates.len()
	}

	/// Returns true when nothing needs joining.
	pub fn is_empty(&self) -> bool {
		self.candidates.is_empty()
	}
}

/// Inputs of a `join_all` run, captured before any join is attempted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinAllPlan {
	/// Members currently in the guild.
	pub guild_members: usize,
	/// Records in the token store.
	pub stored_members: usize,
	/// Users that will be attempted.
	pub plan: ReconcilePlan,
}

/// Final tally of a reconciliation run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
	/// Users attempted; always `joined + skipped`.
	pub attempted: usize,
	/// Users that ended as members.
	pub joined: usize,
	/// Users that were given up on.
	pub skipped: usize,
	/// Records deleted during the run.
	pub purged: usize,
	/// Joined users in completion order.
	pub progress: ReconciliationProgress,
}

enum MemberResult {
	Joined,
	Dropped { reason: DropReason, purged: bool },
}

impl<C, M> Broker<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Reads the live roster and the stored users and computes what a run would attempt.
	pub async fn plan_join_all(&self) -> Result<JoinAllPlan> {
		observed(FlowKind::Reconcile, "plan_join_all", async move {
			let roster = self
				.provider
				.list_guild_members(&self.guild)
				.await?
				.into_iter()
				.collect::<HashSet<_>>();
			let stored = self
				.store
				.list_all()
				.map_ok(|record| record.user_id)
				.try_collect::<Vec<_>>()
				.await?;

			Ok(JoinAllPlan {
				guild_members: roster.len(),
				stored_members: stored.len(),
				plan: ReconcilePlan::new(&roster, stored),
			})
		})
		.await
	}

	/// Joins every stored user missing from the live roster.
	pub async fn join_all(&self, sink: &dyn ProgressSink) -> Result<ReconcileReport> {
		let plan = self.plan_join_all().await?;

		Ok(self.execute_plan(&plan.plan, sink).await)
	}

	/// Joins `stored - roster`, reporting progress to `sink`.
	pub async fn reconcile<I>(
		&self,
		roster: &HashSet<UserId>,
		stored: I,
		sink: &dyn ProgressSink,
	) -> ReconcileReport
	where
		I: IntoIterator<Item = UserId>,
	{
		self.execute_plan(&ReconcilePlan::new(roster, stored), sink).await
	}

	/// Attempts every candidate of `plan` sequentially.
	pub async fn execute_plan(
		&self,
		plan: &ReconcilePlan,
		sink: &dyn ProgressSink,
	) -> ReconcileReport {
		const KIND: FlowKind = FlowKind::Reconcile;

		let span = FlowSpan::new(KIND, "execute_plan");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let report = span
			.instrument(async move {
				let mut report = ReconcileReport::default();

				for user in plan.candidates() {
					report.attempted += 1;

					tokio::time::sleep(self.join_delay).await;

					let member = FlowSpan::for_member(KIND, "member", user);

					match member.instrument(self.reconcile_member(user)).await {
						Ok(MemberResult::Joined) => {
							report.joined += 1;
							report.progress.push(user.clone());

							sink.on_joined(&report.progress).await;
						},
						Ok(MemberResult::Dropped { reason, purged }) => {
							report.skipped += 1;

							if purged {
								report.purged += 1;
							}

							obs::record_drop(KIND, user, reason, None);
						},
						Err(err) => {
							report.skipped += 1;

							obs::record_drop(KIND, user, DropReason::Failed, Some(&err));
						},
					}
				}

				report
			})
			.await;

		obs::record_flow_outcome(KIND, FlowOutcome::Success);

		report
	}

	async fn reconcile_member(&self, user: &UserId) -> Result<MemberResult> {
		let first = self.join(user).await?;

		if first.is_success() {
			return Ok(MemberResult::Joined);
		}
		if !first.needs_refresh() {
			return Ok(MemberResult::Dropped { reason: DropReason::MissingRecord, purged: false });
		}

		let identity = match self.refresh(user).await? {
			RefreshOutcome::Refreshed(identity) => identity,
			RefreshOutcome::Purged =>
				return Ok(MemberResult::Dropped { reason: DropReason::GrantInvalid, purged: true }),
		};

		if self.join_with(&identity.user_id, &identity.access_token).await?.is_success() {
			return Ok(MemberResult::Joined);
		}

		let purged = self.store.delete(user).await?;

		Ok(MemberResult::Dropped { reason: DropReason::TokenUnusable, purged })
	}
}
