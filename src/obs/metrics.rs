// self
use crate::{
	error::ErrorKind,
	obs::{FlowKind, FlowOutcome},
};

/// Counter incremented once per attempt and once per outcome, labeled `flow` + `outcome`.
pub const FLOW_COUNTER: &str = "oidc_federation_flow_total";
/// Counter incremented per failed operation, labeled `flow` + `reason`.
pub const FAILURE_COUNTER: &str = "oidc_federation_failure_total";

/// Increments [`FLOW_COUNTER`] when the `metrics` feature is enabled.
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(FLOW_COUNTER, "flow" => kind.as_str(), "outcome" => outcome.as_str())
			.increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records a failed operation in both counters.
///
/// `reason` uses [`ErrorKind::as_str`], so verification failures stay distinguishable on
/// dashboards even though callers only see the public message.
pub fn record_flow_failure(kind: FlowKind, reason: ErrorKind) {
	record_flow_outcome(kind, FlowOutcome::Failure);

	#[cfg(feature = "metrics")]
	{
		metrics::counter!(FAILURE_COUNTER, "flow" => kind.as_str(), "reason" => reason.as_str())
			.increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = reason;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recording_without_a_recorder_is_harmless() {
		record_flow_outcome(FlowKind::RegistryRebuild, FlowOutcome::Skipped);
		record_flow_failure(FlowKind::Exchange, ErrorKind::UnknownKey);
	}
}
