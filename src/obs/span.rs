// self
use crate::{_prelude::*, auth::UserId, obs::FlowKind};

#[cfg(feature = "tracing")]
/// Future wrapped in a flow span.
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
#[cfg(not(feature = "tracing"))]
/// Future returned unchanged when spans are compiled out.
pub type InstrumentedFlow<F> = F;

/// `guild_broker.flow` span carried by a flow or by one member of a batch.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Span for a whole flow.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			Self { span: tracing::info_span!("guild_broker.flow", flow = kind.as_str(), stage) }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Span for one member handled inside a batch; nests under the batch span.
	pub fn for_member(kind: FlowKind, stage: &'static str, user: &UserId) -> Self {
		#[cfg(feature = "tracing")]
		{
			Self {
				span: tracing::debug_span!(
					"guild_broker.flow",
					flow = kind.as_str(),
					stage,
					user = %user
				),
			}
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage, user);

			Self {}
		}
	}

	/// Attaches the span to `fut`; nothing is entered across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			tracing::Instrument::instrument(fut, self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}
