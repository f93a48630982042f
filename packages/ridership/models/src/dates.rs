//! Service-day parsing and wire formatting.
//!
//! Source files use several date spellings; on the wire every date is a
//! midnight timestamp (`2024-03-04T00:00:00`).

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serializer};

/// Wire format for service days.
pub const WIRE_FORMAT: &str = "%Y-%m-%dT00:00:00";

/// Day-only formats accepted on input, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%m/%d/%Y", "%Y/%m/%d"];

/// Timestamp formats accepted on input; the time part is discarded.
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parses a date in any accepted spelling.
#[must_use]
pub fn parse(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Serializes a date in [`WIRE_FORMAT`].
///
/// # Errors
///
/// Propagates serializer errors.
pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&date.format(WIRE_FORMAT))
}

/// Serializes an optional date in [`WIRE_FORMAT`], `None` as `null`.
///
/// # Errors
///
/// Propagates serializer errors.
#[allow(clippy::ref_option)]
pub fn serialize_option<S: Serializer>(
    date: &Option<NaiveDate>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match date {
        Some(date) => serialize(date, serializer),
        None => serializer.serialize_none(),
    }
}

/// Deserializes a date in any accepted spelling.
///
/// # Errors
///
/// Fails when the text matches none of the accepted formats.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
    use serde::de::Error as _;

    let raw = String::deserialize(deserializer)?;
    parse(&raw).ok_or_else(|| D::Error::custom(format!("unrecognised date '{raw}'")))
}
