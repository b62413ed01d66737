//! Hourly sign-in counts and the overall failure rate for a trailing window.

// crates.io
use time::{Time, UtcOffset, format_description::well_known::Rfc3339};
// self
use crate::{_prelude::*, graph::SignIn};

/// Window used when the caller does not ask for one.
pub const DEFAULT_WINDOW_HOURS: i64 = 24;
/// Smallest accepted window.
pub const MIN_WINDOW_HOURS: i64 = 1;
/// Largest accepted window (one week).
pub const MAX_WINDOW_HOURS: i64 = 168;

/// Body of `GET /api/signins`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInSummary {
	/// Effective window after clamping.
	pub window_hours: i64,
	/// All sign-ins returned by Graph, including those without a usable timestamp.
	pub total: u64,
	/// Sign-ins with a non-zero error code.
	pub failed: u64,
	/// `failed / total` in percent, rounded to two decimals.
	pub failure_rate: f64,
	/// One entry per hour of the window, oldest first.
	pub buckets: Vec<SignInBucket>,
}

/// Sign-in counts for one hour.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SignInBucket {
	/// Start of the hour, `YYYY-MM-DDTHH:00:00Z`.
	pub timestamp: String,
	/// Sign-ins in this hour.
	pub total: u64,
	/// Failed sign-ins in this hour.
	pub failed: u64,
}

#[derive(Clone, Copy, Debug, Default)]
struct Counts {
	total: u64,
	failed: u64,
}

/// Resolves the requested window, falling back to the default and clamping into range.
pub fn clamp_hours(requested: Option<i64>) -> i64 {
	requested.unwrap_or(DEFAULT_WINDOW_HOURS).clamp(MIN_WINDOW_HOURS, MAX_WINDOW_HOURS)
}

/// Start of a window of `hours` ending at `now`.
pub fn window_start(now: OffsetDateTime, hours: i64) -> OffsetDateTime {
	now - Duration::hours(hours.clamp(MIN_WINDOW_HOURS, MAX_WINDOW_HOURS))
}

/// Truncates `instant` to the start of its UTC hour.
pub fn floor_hour(instant: OffsetDateTime) -> OffsetDateTime {
	let utc = instant.to_offset(UtcOffset::UTC);

	utc.replace_time(Time::MIDNIGHT) + Duration::hours(i64::from(utc.hour()))
}

/// Formats an hour start as `YYYY-MM-DDTHH:00:00Z`.
pub fn bucket_key(hour: OffsetDateTime) -> String {
	let utc = hour.to_offset(UtcOffset::UTC);

	format!(
		"{:04}-{:02}-{:02}T{:02}:00:00Z",
		utc.year(),
		u8::from(utc.month()),
		utc.day(),
		utc.hour()
	)
}

/// Aggregates `events` into hourly buckets covering `[floor_hour(now - hours), floor_hour(now)]`.
///
/// Events whose timestamp is missing or not RFC 3339 still count towards the totals but do not
/// appear in any listed bucket, and neither do events outside the window.
pub fn summarize_sign_ins(events: &[SignIn], hours: i64, now: OffsetDateTime) -> SignInSummary {
	let hours = hours.clamp(MIN_WINDOW_HOURS, MAX_WINDOW_HOURS);
	let mut per_hour = BTreeMap::<OffsetDateTime, Counts>::new();
	let mut overall = Counts::default();
	let mut undated = 0_u64;

	for event in events {
		let failed = u64::from(event.is_failure());

		overall.total += 1;
		overall.failed += failed;

		match event
			.created_date_time
			.as_deref()
			.and_then(|raw| OffsetDateTime::parse(raw, &Rfc3339).ok())
		{
			Some(created) => {
				let counts = per_hour.entry(floor_hour(created)).or_default();

				counts.total += 1;
				counts.failed += failed;
			},
			None => undated += 1,
		}
	}

	if undated > 0 {
		tracing::debug!(undated, "sign-ins without a usable timestamp");
	}

	let end = floor_hour(now);
	let mut cursor = floor_hour(window_start(now, hours));
	let mut buckets = Vec::with_capacity(hours as usize + 1);

	while cursor <= end {
		let counts = per_hour.get(&cursor).copied().unwrap_or_default();

		buckets.push(SignInBucket {
			timestamp: bucket_key(cursor),
			total: counts.total,
			failed: counts.failed,
		});

		cursor += Duration::HOUR;
	}

	SignInSummary {
		window_hours: hours,
		total: overall.total,
		failed: overall.failed,
		failure_rate: failure_rate(overall),
		buckets,
	}
}

fn failure_rate(counts: Counts) -> f64 {
	if counts.total == 0 {
		return 0.;
	}

	let percent = counts.failed as f64 / counts.total as f64 * 100.;

	// `{:.2}` rounds the exact binary value, ties to even.
	format!("{percent:.2}").parse().unwrap_or(percent)
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::graph::SignInStatus;

	fn event(created: Option<&str>, error_code: i64) -> SignIn {
		SignIn {
			created_date_time: created.map(Into::into),
			status: Some(SignInStatus { error_code, failure_reason: None }),
		}
	}

	#[test]
	fn hours_default_and_clamp() {
		assert_eq!(clamp_hours(None), 24);
		assert_eq!(clamp_hours(Some(0)), 1);
		assert_eq!(clamp_hours(Some(-5)), 1);
		assert_eq!(clamp_hours(Some(6)), 6);
		assert_eq!(clamp_hours(Some(1_000)), 168);
	}

	#[test]
	fn floor_hour_normalises_to_utc() {
		let instant = macros::datetime!(2025-03-10 00:45:12.5 +02:00);

		assert_eq!(floor_hour(instant), macros::datetime!(2025-03-09 22:00 UTC));
		assert_eq!(bucket_key(floor_hour(instant)), "2025-03-09T22:00:00Z");
	}

	#[test]
	fn buckets_cover_the_window_inclusively() {
		let now = macros::datetime!(2025-03-10 12:30 UTC);
		let summary = summarize_sign_ins(&[], 3, now);
		let keys = summary.buckets.iter().map(|bucket| bucket.timestamp.as_str()).collect::<Vec<_>>();

		assert_eq!(keys, [
			"2025-03-10T09:00:00Z",
			"2025-03-10T10:00:00Z",
			"2025-03-10T11:00:00Z",
			"2025-03-10T12:00:00Z",
		]);
		assert_eq!(summary.total, 0);
		assert_eq!(summary.failure_rate, 0.);
	}

	#[test]
	fn counts_failures_and_unknown_timestamps() {
		let now = macros::datetime!(2025-03-10 12:30 UTC);
		let events = [
			event(Some("2025-03-10T11:05:00Z"), 0),
			event(Some("2025-03-10T11:59:59.9999999Z"), 50126),
			event(Some("2025-03-10T12:01:00Z"), 0),
			event(None, 50053),
			event(Some("yesterday-ish"), 0),
			SignIn::default(),
		];
		let summary = summarize_sign_ins(&events, 2, now);

		assert_eq!(summary.window_hours, 2);
		assert_eq!(summary.total, 6);
		assert_eq!(summary.failed, 2);
		assert_eq!(summary.failure_rate, 33.33);
		assert_eq!(summary.buckets, [
			SignInBucket { timestamp: "2025-03-10T10:00:00Z".into(), total: 0, failed: 0 },
			SignInBucket { timestamp: "2025-03-10T11:00:00Z".into(), total: 2, failed: 1 },
			SignInBucket { timestamp: "2025-03-10T12:00:00Z".into(), total: 1, failed: 0 },
		]);
	}

	#[test]
	fn failure_rate_rounds_ties_to_even() {
		let rate = |failed, total| failure_rate(Counts { total, failed });

		assert_eq!(rate(1, 160), 0.62);
		assert_eq!(rate(1, 800), 0.12);
		assert_eq!(rate(3, 800), 0.38);
		assert_eq!(rate(1, 6), 16.67);
		assert_eq!(rate(0, 0), 0.);
	}

	#[test]
	fn serializes_camel_case() {
		let now = macros::datetime!(2025-03-10 12:00 UTC);
		let summary = summarize_sign_ins(&[event(Some("2025-03-10T12:00:00Z"), 1)], 1, now);
		let json = serde_json::to_value(&summary).expect("Summary should serialize.");

		assert_eq!(json["windowHours"], 1);
		assert_eq!(json["failureRate"], 100.0);
		assert_eq!(json["buckets"][1]["timestamp"], "2025-03-10T12:00:00Z");
		assert_eq!(json["buckets"][1]["failed"], 1);
	}
}
