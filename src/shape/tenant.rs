//! Tenant identity and verified domains.

// self
use crate::{_prelude::*, graph::Organization};

/// Body of `GET /api/tenant`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TenantResponse {
	/// Tenant summary.
	pub tenant: TenantInfo,
}

/// Tenant summary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantInfo {
	/// Tenant GUID; empty when unknown.
	pub id: String,
	/// Organization display name.
	pub display_name: Option<String>,
	/// Names of verified domains.
	pub verified_domains: Vec<String>,
}

/// Builds the tenant response, skipping domains without a name.
pub fn shape_tenant(organization: Organization) -> TenantResponse {
	let verified_domains = organization
		.verified_domains
		.into_iter()
		.filter_map(|domain| domain.name.filter(|name| !name.is_empty()))
		.collect();

	TenantResponse {
		tenant: TenantInfo {
			id: organization.id.unwrap_or_default(),
			display_name: organization.display_name,
			verified_domains,
		},
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::graph::VerifiedDomain;

	#[test]
	fn keeps_only_named_domains() {
		let organization = Organization {
			id: Some("tenant-guid".into()),
			display_name: Some("Contoso".into()),
			verified_domains: vec![
				VerifiedDomain { name: Some("contoso.com".into()), is_default: true },
				VerifiedDomain { name: None, is_default: false },
				VerifiedDomain { name: Some(String::new()), is_default: false },
				VerifiedDomain { name: Some("contoso.onmicrosoft.com".into()), is_default: false },
			],
		};
		let shaped = shape_tenant(organization);

		assert_eq!(shaped.tenant.verified_domains, ["contoso.com", "contoso.onmicrosoft.com"]);

		let json = serde_json::to_value(&shaped).expect("Tenant response should serialize.");

		assert_eq!(json["tenant"]["displayName"], "Contoso");
	}

	#[test]
	fn empty_organization_shapes_to_blank_tenant() {
		let shaped = shape_tenant(Organization::default());

		assert_eq!(shaped.tenant, TenantInfo {
			id: String::new(),
			display_name: None,
			verified_domains: Vec::new()
		});
	}
}
