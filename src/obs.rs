//! Observability helpers: operation spans, optional counters, and subscriber setup.
//!
//! # Feature Flags
//!
//! - Enable `metrics` to increment the `m365_monitor_op_total` counter for every
//!   attempt/success/failure, labeled by `op` + `outcome`.

mod logging;
mod metrics;
mod tracing;

pub use logging::*;
pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Upstream operations observed by the proxy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
	/// Client-credentials token acquisition.
	TokenAcquire,
	/// `admin/serviceAnnouncement/healthOverviews`.
	HealthOverviews,
	/// `admin/serviceAnnouncement/issues`.
	HealthIssues,
	/// `subscribedSkus`.
	SubscribedSkus,
	/// `organization`.
	Organization,
	/// `auditLogs/signIns`.
	SignIns,
}
impl Operation {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Operation::TokenAcquire => "token_acquire",
			Operation::HealthOverviews => "health_overviews",
			Operation::HealthIssues => "health_issues",
			Operation::SubscribedSkus => "subscribed_skus",
			Operation::Organization => "organization",
			Operation::SignIns => "sign_ins",
		}
	}
}
impl Display for Operation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Attempt => "attempt",
			Outcome::Success => "success",
			Outcome::Failure => "failure",
		}
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Runs `fut` inside an operation span and records attempt/success/failure.
pub async fn observe<T, Fut>(op: Operation, stage: &'static str, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	record_outcome(op, Outcome::Attempt);

	let result = OpSpan::new(op, stage).wrap(fut).await;

	match &result {
		Ok(_) => record_outcome(op, Outcome::Success),
		Err(e) => {
			::tracing::warn!(op = op.as_str(), stage, error = %e, "upstream operation failed");
			record_outcome(op, Outcome::Failure);
		},
	}

	result
}
