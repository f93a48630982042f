#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Ridership check-in types.
//!
//! Field names on the wire match the column headers of the check-in CSV
//! (`"Total Count"`, `"By SmartCard"`, ...) so the same record type reads
//! the file and serves the API.

pub mod dates;

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// One hourly check-in row for a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RidershipRecord {
    /// Service day.
    #[serde(
        rename = "Date",
        serialize_with = "dates::serialize",
        deserialize_with = "dates::deserialize"
    )]
    pub date: NaiveDate,
    /// Hour of day (0-23).
    #[serde(rename = "Hour", deserialize_with = "lenient_hour")]
    pub hour: u8,
    /// Route identifier, kept as text even when numeric.
    #[serde(rename = "Route")]
    pub route: String,
    /// Passengers checked in.
    #[serde(rename = "Total Count", deserialize_with = "lenient_count")]
    pub total_count: u64,
    /// Passengers paying by smartcard.
    #[serde(rename = "By SmartCard", deserialize_with = "lenient_count")]
    pub by_smartcard: u64,
    /// Passengers paying by QR code.
    #[serde(rename = "By QR", deserialize_with = "lenient_count")]
    pub by_qr: u64,
    /// Buses in service on the route during the hour.
    #[serde(rename = "Number Of Busses", deserialize_with = "lenient_count")]
    pub bus_count: u64,
    /// Operating company.
    #[serde(rename = "Operator")]
    pub operator: String,
}

/// Summed counters for a group of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CountTotals {
    /// Sum of `Total Count`.
    #[serde(rename = "Total Count")]
    pub total_count: u64,
    /// Sum of `By SmartCard`.
    #[serde(rename = "By SmartCard")]
    pub by_smartcard: u64,
    /// Sum of `By QR`.
    #[serde(rename = "By QR")]
    pub by_qr: u64,
    /// Sum of `Number Of Busses`.
    #[serde(rename = "Number Of Busses")]
    pub bus_count: u64,
}

impl CountTotals {
    /// Adds one record's counters.
    pub const fn add(&mut self, record: &RidershipRecord) {
        self.total_count += record.total_count;
        self.by_smartcard += record.by_smartcard;
        self.by_qr += record.by_qr;
        self.bus_count += record.bus_count;
    }

    /// Passengers per bus, or `None` when no buses were counted.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn pass_per_bus(&self) -> Option<f64> {
        (self.bus_count > 0).then(|| self.total_count as f64 / self.bus_count as f64)
    }

    /// Percentage of passengers paying by smartcard, or `None` when there
    /// were no passengers.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn smartcard_pct(&self) -> Option<f64> {
        (self.total_count > 0)
            .then(|| self.by_smartcard as f64 / self.total_count as f64 * 100.0)
    }
}

/// Grouping column for volume and breakdown rollups.
///
/// Serialized flattened, so a row carries `"Route"`, `"Hour"` or
/// `"Operator"` as its key column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum GroupKey {
    /// Grouped by route.
    Route(String),
    /// Grouped by hour of day.
    Hour(u8),
    /// Grouped by operator.
    Operator(String),
}

/// Column selector for `GET /api/bus/volume`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum VolumeGrouping {
    /// One row per route.
    #[default]
    Route,
    /// One row per hour.
    Hour,
    /// One row per operator.
    Operator,
}

impl VolumeGrouping {
    /// Parses a grouping name, falling back to [`Self::Route`] for anything
    /// unrecognised.
    #[must_use]
    pub fn parse_or_default(value: &str) -> Self {
        value.trim().parse().unwrap_or_default()
    }
}

/// A volume rollup row: key column plus summed counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeRow {
    /// Grouping key.
    #[serde(flatten)]
    pub key: GroupKey,
    /// Summed counters.
    #[serde(flatten)]
    pub totals: CountTotals,
}

/// An analytics breakdown row with efficiency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakdown {
    /// Grouping key.
    #[serde(flatten)]
    pub key: GroupKey,
    /// Summed counters.
    #[serde(flatten)]
    pub totals: CountTotals,
    /// First operator seen for the group (route breakdowns only).
    #[serde(rename = "Operator", skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    /// Passengers per bus, `null` when the group has no buses.
    pub pass_per_bus: Option<f64>,
}

/// Row of `GET /api/bus/routes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteRollup {
    /// Route identifier.
    #[serde(rename = "Route")]
    pub route: String,
    /// Passengers on the route.
    #[serde(rename = "Total Count")]
    pub total_count: u64,
    /// Buses on the route.
    #[serde(rename = "Number Of Busses")]
    pub bus_count: u64,
    /// First operator seen for the route.
    #[serde(rename = "Operator")]
    pub operator: String,
}

/// Row of `GET /api/bus/operators`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperatorRollup {
    /// Operator name.
    #[serde(rename = "Operator")]
    pub operator: String,
    /// Passengers carried.
    #[serde(rename = "Total_Passengers")]
    pub total_passengers: u64,
    /// Buses run.
    #[serde(rename = "Total_Buses")]
    pub total_buses: u64,
}

/// Inclusive first/last service day in a table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DateRange {
    /// Earliest date, `null` for an empty table.
    #[serde(serialize_with = "dates::serialize_option")]
    pub start: Option<NaiveDate>,
    /// Latest date, `null` for an empty table.
    #[serde(serialize_with = "dates::serialize_option")]
    pub end: Option<NaiveDate>,
}

/// One page of `GET /api/bus/registrations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
    /// Records on this page.
    pub data: Vec<RidershipRecord>,
    /// Records matching the filter across all pages.
    pub total: usize,
}

/// Whole-table summary for `GET /api/bus/stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RidershipStats {
    /// Row count.
    pub total_records: usize,
    /// Service-day span.
    pub date_range: DateRange,
    /// Distinct routes.
    pub routes_count: usize,
    /// Distinct operators in first-seen order.
    pub operators: Vec<String>,
    /// Passengers across all rows.
    pub total_passengers: u64,
}

/// Headline numbers of an analytics rollup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    /// Passengers in the filtered rows.
    pub total_passengers: u64,
    /// Buses in the filtered rows.
    pub total_buses: u64,
    /// Passengers per bus rounded to one decimal, 0 without buses.
    pub avg_pass_per_bus: f64,
    /// Hour with the most passengers (lowest hour on ties, 0 when empty).
    pub peak_hour: u8,
    /// Operator with the most passengers per bus, `"N/A"` when none.
    pub most_efficient_company: String,
    /// Operator with the highest smartcard share, `"N/A"` when none.
    pub payment_leader: String,
}

/// Distinct filter values available in the filtered rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Dropdowns {
    /// Operators, sorted.
    pub companies: Vec<String>,
    /// Routes, numeric-aware sorted.
    pub routes: Vec<String>,
    /// Hours, ascending.
    pub hours: Vec<u8>,
    /// Service days as `YYYY-MM-DD`, ascending.
    pub dates: Vec<String>,
}

/// Full response of `GET /api/bus/analytics`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsReport {
    /// Headline numbers.
    pub kpis: Kpis,
    /// Per-operator breakdown.
    pub by_company: Vec<Breakdown>,
    /// Per-route breakdown.
    pub by_route: Vec<Breakdown>,
    /// Per-hour breakdown.
    pub by_hour: Vec<Breakdown>,
    /// Busiest routes by passengers.
    pub top_routes: Vec<Breakdown>,
    /// Least efficient routes by passengers per bus.
    pub bottom_routes: Vec<Breakdown>,
    /// Filter values.
    pub dropdowns: Dropdowns,
}

/// Row filter for the registrations listing and hourly trend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Exact route match.
    pub route: Option<String>,
    /// Exact operator match.
    pub operator: Option<String>,
    /// First day included.
    pub start_date: Option<NaiveDate>,
    /// Last day included.
    pub end_date: Option<NaiveDate>,
}

impl RecordFilter {
    /// Whether `record` passes every set criterion.
    #[must_use]
    pub fn matches(&self, record: &RidershipRecord) -> bool {
        self.route.as_deref().is_none_or(|r| record.route == r)
            && self.operator.as_deref().is_none_or(|o| record.operator == o)
            && self.start_date.is_none_or(|d| record.date >= d)
            && self.end_date.is_none_or(|d| record.date <= d)
    }
}

/// Row filter for the analytics rollup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalyticsFilter {
    /// First day included.
    pub start_date: Option<NaiveDate>,
    /// Last day included.
    pub end_date: Option<NaiveDate>,
    /// First hour included.
    pub hour_start: Option<u8>,
    /// Last hour included.
    pub hour_end: Option<u8>,
    /// Operators to keep; empty keeps all.
    pub companies: Vec<String>,
    /// Routes to keep; empty keeps all.
    pub routes: Vec<String>,
}

impl AnalyticsFilter {
    /// Whether `record` passes every set criterion.
    #[must_use]
    pub fn matches(&self, record: &RidershipRecord) -> bool {
        self.start_date.is_none_or(|d| record.date >= d)
            && self.end_date.is_none_or(|d| record.date <= d)
            && self.hour_start.is_none_or(|h| record.hour >= h)
            && self.hour_end.is_none_or(|h| record.hour <= h)
            && (self.companies.is_empty() || self.companies.contains(&record.operator))
            && (self.routes.is_empty() || self.routes.contains(&record.route))
    }
}

/// Splits a comma-separated query value into trimmed, non-empty items.
#[must_use]
pub fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Orders identifiers numerically when both are integers, otherwise
/// lexically, with numeric identifiers first.
///
/// Equal numbers with different spellings (`"07"`, `"7"`) fall back to
/// lexical order so the ordering stays consistent with string equality.
#[must_use]
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Accepts counts written as integers or as whole floats (`"12.0"`).
fn lenient_count<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64>,
{
    use serde::de::Error as _;

    let raw = String::deserialize(deserializer)?;
    let raw = raw.trim();
    let value = match raw.parse::<u64>() {
        Ok(v) => v,
        Err(_) => {
            let float: f64 = raw
                .parse()
                .map_err(|_| D::Error::custom(format!("invalid count '{raw}'")))?;
            whole_number(float).ok_or_else(|| D::Error::custom(format!("invalid count '{raw}'")))?
        }
    };
    T::try_from(value).map_err(|_| D::Error::custom(format!("count '{raw}' out of range")))
}

/// A [`lenient_count`] that must also be an hour of day.
fn lenient_hour<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    use serde::de::Error as _;

    let hour: u8 = lenient_count(deserializer)?;
    if hour > 23 {
        return Err(D::Error::custom(format!("hour {hour} is not in 0-23")));
    }
    Ok(hour)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_number(value: f64) -> Option<u64> {
    (value.is_finite() && value >= 0.0 && value.fract() == 0.0).then(|| value as u64)
}
