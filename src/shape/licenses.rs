//! License consumption per SKU with a usage warning near exhaustion.

// self
use crate::{_prelude::*, graph::SubscribedSku};

/// Consumed-to-enabled ratio at or above which a SKU carries a warning.
pub const DEFAULT_USAGE_WARNING_THRESHOLD: f64 = 0.9;

/// Body of `GET /api/licenses`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseResponse {
	/// One entry per subscribed SKU.
	pub skus: Vec<LicenseSku>,
}

/// Usage of one SKU.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseSku {
	/// SKU GUID; empty when Graph omitted it.
	pub sku_id: String,
	/// Part number; empty when Graph omitted it.
	pub sku_part_number: String,
	/// Assigned units.
	pub consumed_units: i64,
	/// Enabled prepaid units.
	pub enabled: i64,
	/// Set when usage reached the threshold.
	pub warning: Option<String>,
}

/// Builds the license response using `threshold` as the warning ratio.
pub fn shape_licenses(skus: Vec<SubscribedSku>, threshold: f64) -> LicenseResponse {
	let skus = skus
		.into_iter()
		.map(|sku| {
			let enabled = sku.prepaid_units.enabled;

			LicenseSku {
				warning: usage_warning(sku.consumed_units, enabled, threshold),
				sku_id: sku.sku_id.unwrap_or_default(),
				sku_part_number: sku.sku_part_number.unwrap_or_default(),
				consumed_units: sku.consumed_units,
				enabled,
			}
		})
		.collect();

	LicenseResponse { skus }
}

/// Returns e.g. `≥90% genutzt` when `consumed / enabled >= threshold`; SKUs without enabled
/// units never warn.
pub fn usage_warning(consumed: i64, enabled: i64, threshold: f64) -> Option<String> {
	if enabled <= 0 {
		return None;
	}

	(consumed as f64 / enabled as f64 >= threshold)
		.then(|| format!("≥{}% genutzt", threshold_percent(threshold)))
}

// Up to two decimals without trailing zeros: `0.9` -> `90`, `0.905` -> `90.5`.
fn threshold_percent(threshold: f64) -> String {
	let fixed = format!("{:.2}", threshold * 100.);

	fixed.trim_end_matches('0').trim_end_matches('.').to_owned()
}
