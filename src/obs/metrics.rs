// self
use crate::obs::{DropReason, FlowKind, FlowOutcome};

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"guild_broker_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Counts a dropped member via the global metrics recorder (when enabled).
pub fn record_drop_metric(kind: FlowKind, reason: DropReason) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"guild_broker_dropped_total",
			"flow" => kind.as_str(),
			"reason" => reason.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, reason);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_are_callable_without_a_global_recorder() {
		record_flow_outcome(FlowKind::Join, FlowOutcome::Failure);
		record_drop_metric(FlowKind::Reconcile, DropReason::GrantInvalid);
	}
}
