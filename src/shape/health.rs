//! Service health overview plus the issues that are still open.

// self
use crate::{
	_prelude::*,
	graph::{ServiceHealth, ServiceHealthIssue},
};

const UNKNOWN: &str = "unknown";
const RESTORED: &str = "servicerestored";

/// Body of `GET /api/health`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
	/// One entry per service.
	pub services: Vec<ServiceStatus>,
	/// Issues not yet restored.
	pub open_issues: Vec<HealthIssue>,
}

/// Current status of one service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
	/// Service name, `unknown` when Graph omitted it.
	pub service: String,
	/// Status, `unknown` when Graph omitted it.
	pub status: String,
}

/// Service issue as shown on the dashboard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthIssue {
	/// Issue identifier; empty when Graph omitted it.
	pub id: String,
	/// Affected service.
	pub service: Option<String>,
	/// Title.
	pub title: Option<String>,
	/// Impact summary.
	pub impact_description: Option<String>,
	/// `incident` or `advisory`.
	pub classification: Option<String>,
	/// Graph status string.
	pub status: Option<String>,
	/// Start instant, passed through verbatim.
	pub start_date_time: Option<String>,
	/// Last modification instant, passed through verbatim.
	pub last_modified_date_time: Option<String>,
}
impl HealthIssue {
	fn is_restored(&self) -> bool {
		self.status.as_deref().is_some_and(|status| status.eq_ignore_ascii_case(RESTORED))
	}
}
impl From<ServiceHealthIssue> for HealthIssue {
	fn from(issue: ServiceHealthIssue) -> Self {
		Self {
			id: issue.id.unwrap_or_default(),
			service: issue.service,
			title: issue.title,
			impact_description: issue.impact_description,
			classification: issue.classification,
			status: issue.status,
			start_date_time: issue.start_date_time,
			last_modified_date_time: issue.last_modified_date_time,
		}
	}
}

/// Builds the health response, dropping issues whose status is `serviceRestored`.
pub fn shape_health(
	overviews: Vec<ServiceHealth>,
	issues: Vec<ServiceHealthIssue>,
) -> HealthResponse {
	let services = overviews
		.into_iter()
		.map(|overview| ServiceStatus {
			service: overview.service.unwrap_or_else(|| UNKNOWN.to_owned()),
			status: overview.status.unwrap_or_else(|| UNKNOWN.to_owned()),
		})
		.collect();
	let open_issues = issues
		.into_iter()
		.map(HealthIssue::from)
		.filter(|issue| !issue.is_restored())
		.collect();

	HealthResponse { services, open_issues }
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn issue(id: &str, status: Option<&str>) -> ServiceHealthIssue {
		ServiceHealthIssue {
			id: Some(id.into()),
			status: status.map(Into::into),
			..Default::default()
		}
	}

	#[test]
	fn missing_service_fields_become_unknown() {
		let shaped = shape_health(
			vec![
				ServiceHealth {
					service: Some("Exchange Online".into()),
					status: Some("serviceOperational".into()),
				},
				ServiceHealth::default(),
			],
			Vec::new(),
		);

		assert_eq!(shaped.services[0].service, "Exchange Online");
		assert_eq!(shaped.services[1], ServiceStatus {
			service: "unknown".into(),
			status: "unknown".into()
		});
	}

	#[test]
	fn restored_issues_are_dropped_case_insensitively() {
		let shaped = shape_health(Vec::new(), vec![
			issue("EX1", Some("serviceDegradation")),
			issue("EX2", Some("serviceRestored")),
			issue("EX3", Some("SERVICERESTORED")),
			issue("EX4", None),
		]);
		let ids = shaped.open_issues.iter().map(|issue| issue.id.as_str()).collect::<Vec<_>>();

		assert_eq!(ids, ["EX1", "EX4"]);
	}

	#[test]
	fn serializes_camel_case_with_nulls() {
		let shaped = shape_health(Vec::new(), vec![ServiceHealthIssue::default()]);
		let json = serde_json::to_value(&shaped).expect("Health response should serialize.");

		assert_eq!(json["openIssues"][0]["id"], "");
		assert!(json["openIssues"][0]["impactDescription"].is_null());
		assert!(json["openIssues"][0].get("lastModifiedDateTime").is_some());
	}
}
