//! High-level flow orchestrators powered by the broker facade.

pub mod join;
pub mod lifecycle;
pub mod reconcile;
pub mod refresh;

pub use join::*;
pub use reconcile::*;
pub use refresh::*;

// self
use crate::{
	_prelude::*,
	auth::GuildId,
	http::ProviderHttpClient,
	oauth::{ClientCredentials, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::{ProviderClient, ProviderDescriptor, ProviderStrategy},
	store::TokenStore,
};
#[cfg(feature = "reqwest")]
use crate::{
	http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper, provider::DefaultProviderStrategy,
};

#[cfg(feature = "reqwest")]
/// Broker specialized for the crate's default reqwest transport stack.
pub type ReqwestBroker = Broker<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Coordinates the token lifecycle and guild reconciliation for one guild.
///
/// The broker owns the provider client, token store, and pacing configuration so each
/// flow can focus on its own state machine. Every collaborator is injected at
/// construction; cloning is cheap and clones share the store and metrics.
pub struct Broker<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Typed client for the provider's REST surface.
	pub provider: ProviderClient<C, M>,
	/// Token store holding one record per authorized user.
	pub store: Arc<dyn TokenStore>,
	/// Guild the broker manages.
	pub guild: GuildId,
	/// Pause inserted before each join attempt of a reconciliation run.
	pub join_delay: std::time::Duration,
	/// Shared metrics recorder for refresh flow outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
}
impl<C, M> Broker<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Default pause between join attempts.
	pub const DEFAULT_JOIN_DELAY: std::time::Duration = std::time::Duration::from_secs(1);

	/// Creates a broker that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		store: Arc<dyn TokenStore>,
		descriptor: ProviderDescriptor,
		strategy: Arc<dyn ProviderStrategy>,
		credentials: ClientCredentials,
		guild: GuildId,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			provider: ProviderClient::new(descriptor, strategy, credentials, http_client, mapper),
			store,
			guild,
			join_delay: Self::DEFAULT_JOIN_DELAY,
			refresh_metrics: Default::default(),
		}
	}

	/// Overrides the pause inserted before each reconciliation join.
	pub fn with_join_delay(mut self, delay: std::time::Duration) -> Self {
		self.join_delay = delay;

		self
	}
}
#[cfg(feature = "reqwest")]
impl Broker<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a new broker backed by the crate's reqwest transport and default strategy.
	pub fn new(
		store: Arc<dyn TokenStore>,
		descriptor: ProviderDescriptor,
		credentials: ClientCredentials,
		guild: GuildId,
	) -> Self {
		Self::with_http_client(
			store,
			descriptor,
			Arc::new(DefaultProviderStrategy),
			credentials,
			guild,
			ReqwestHttpClient::default(),
			Arc::new(ReqwestTransportErrorMapper),
		)
	}
}
impl<C, M> Clone for Broker<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			provider: self.provider.clone(),
			store: self.store.clone(),
			guild: self.guild.clone(),
			join_delay: self.join_delay,
			refresh_metrics: self.refresh_metrics.clone(),
		}
	}
}
impl<C, M> Debug for Broker<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Broker")
			.field("provider", &self.provider)
			.field("guild", &self.guild)
			.field("join_delay", &self.join_delay)
			.finish()
	}
}

/// Runs `fut` inside a flow span and records its attempt and outcome.
async fn observed<T, F>(kind: FlowKind, stage: &'static str, fut: F) -> Result<T>
where
	F: Future<Output = Result<T>>,
{
	let span = FlowSpan::new(kind, stage);

	obs::record_flow_outcome(kind, FlowOutcome::Attempt);

	let result = span.instrument(fut).await;

	match &result {
		Ok(_) => obs::record_flow_outcome(kind, FlowOutcome::Success),
		Err(_) => obs::record_flow_outcome(kind, FlowOutcome::Failure),
	}

	result
}
