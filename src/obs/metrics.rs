// self
use crate::obs::{Operation, Outcome};

/// Counter incremented once per operation outcome.
pub const OP_COUNTER: &str = "m365_monitor_op_total";

/// Increments [`OP_COUNTER`] through the global metrics recorder.
#[cfg(feature = "metrics")]
pub fn record_outcome(op: Operation, outcome: Outcome) {
	metrics::counter!(OP_COUNTER, "op" => op.as_str(), "outcome" => outcome.as_str()).increment(1);
}

/// No-op without the `metrics` feature.
#[cfg(not(feature = "metrics"))]
pub fn record_outcome(_: Operation, _: Outcome) {}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_outcome_without_recorder_is_noop() {
		record_outcome(Operation::SignIns, Outcome::Failure);
	}
}
