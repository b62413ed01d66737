//! Raw Graph payloads, decoded leniently: every field has a default so partial objects still load.

// self
use crate::_prelude::*;

/// OData collection envelope.
#[derive(Clone, Debug, Deserialize)]
pub struct Collection<T> {
	/// Items of the current page.
	#[serde(default = "Vec::new")]
	pub value: Vec<T>,
	/// Link to the next page; only logged, never followed.
	#[serde(rename = "@odata.nextLink", default)]
	pub next_link: Option<String>,
}

/// OData error envelope.
#[derive(Clone, Debug, Deserialize)]
pub struct ODataError {
	/// Error body.
	pub error: ODataErrorBody,
}

/// OData error body.
#[derive(Clone, Debug, Deserialize)]
pub struct ODataErrorBody {
	/// Machine-readable code such as `Authorization_RequestDenied`.
	#[serde(default)]
	pub code: Option<String>,
	/// Human-readable message.
	#[serde(default)]
	pub message: Option<String>,
}

/// Entry of `admin/serviceAnnouncement/healthOverviews`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceHealth {
	/// Service display name, e.g. `Exchange Online`.
	pub service: Option<String>,
	/// Health status, e.g. `serviceOperational`.
	pub status: Option<String>,
}

/// Entry of `admin/serviceAnnouncement/issues`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceHealthIssue {
	/// Issue identifier, e.g. `EX123456`.
	pub id: Option<String>,
	/// Affected service.
	pub service: Option<String>,
	/// Issue title.
	pub title: Option<String>,
	/// Impact summary.
	pub impact_description: Option<String>,
	/// `incident` or `advisory`.
	pub classification: Option<String>,
	/// Status, e.g. `serviceDegradation` or `serviceRestored`.
	pub status: Option<String>,
	/// Start instant as sent by Graph.
	pub start_date_time: Option<String>,
	/// Last modification instant as sent by Graph.
	pub last_modified_date_time: Option<String>,
}

/// Entry of `subscribedSkus`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubscribedSku {
	/// SKU GUID.
	pub sku_id: Option<String>,
	/// Part number, e.g. `ENTERPRISEPACK`.
	pub sku_part_number: Option<String>,
	/// Units assigned to users.
	pub consumed_units: i64,
	/// Purchased units by state.
	pub prepaid_units: PrepaidUnits,
}

/// Purchased license units of a SKU.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PrepaidUnits {
	/// Units that are active and assignable.
	pub enabled: i64,
	/// Units in the grace period after expiry.
	pub warning: i64,
	/// Units that are suspended.
	pub suspended: i64,
}

/// Entry of `organization`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Organization {
	/// Tenant GUID.
	pub id: Option<String>,
	/// Organization display name.
	pub display_name: Option<String>,
	/// Domains the tenant has verified.
	pub verified_domains: Vec<VerifiedDomain>,
}

/// Verified domain of the organization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerifiedDomain {
	/// Domain name.
	pub name: Option<String>,
	/// Whether this is the default domain.
	pub is_default: bool,
}

/// Entry of `auditLogs/signIns`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignIn {
	/// RFC 3339 instant of the sign-in.
	pub created_date_time: Option<String>,
	/// Outcome of the sign-in.
	pub status: Option<SignInStatus>,
}
impl SignIn {
	/// A sign-in failed when its error code is non-zero.
	pub fn is_failure(&self) -> bool {
		self.status.as_ref().is_some_and(|status| status.error_code != 0)
	}
}

/// Outcome of a sign-in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignInStatus {
	/// `0` on success, an `AADSTS` number otherwise.
	pub error_code: i64,
	/// Reason for the failure, if any.
	pub failure_reason: Option<String>,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn missing_fields_fall_back_to_defaults() {
		let sku: SubscribedSku = serde_json::from_str(r#"{"skuPartNumber":"ENTERPRISEPACK"}"#)
			.expect("Partial SKU should decode.");

		assert_eq!(sku.sku_part_number.as_deref(), Some("ENTERPRISEPACK"));
		assert_eq!(sku.consumed_units, 0);
		assert_eq!(sku.prepaid_units.enabled, 0);

		let page: Collection<SignIn> =
			serde_json::from_str("{}").expect("Envelope without value should decode.");

		assert!(page.value.is_empty());
	}

	#[test]
	fn sign_in_failure_depends_on_error_code() {
		let ok: SignIn = serde_json::from_str(r#"{"status":{"errorCode":0}}"#)
			.expect("Successful sign-in should decode.");
		let failed: SignIn = serde_json::from_str(r#"{"status":{"errorCode":50126}}"#)
			.expect("Failed sign-in should decode.");
		let bare: SignIn = serde_json::from_str("{}").expect("Bare sign-in should decode.");

		assert!(!ok.is_failure());
		assert!(failed.is_failure());
		assert!(!bare.is_failure());
	}
}
