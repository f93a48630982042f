#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the transit map server.
//!
//! Query parameter structs deserialize raw strings and convert into the
//! ridership filters, so parameter validation happens in one place.
//! Response bodies that are not already owned by a domain crate live here.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use transit_map_ridership_models::{AnalyticsFilter, RecordFilter, VolumeGrouping, dates, split_list};
use transit_map_scraper_models::RefreshSummary;

/// A query parameter that could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParamError {
    #[error("invalid {param} '{value}': expected a date such as 2024-03-01")]
    InvalidDate { param: &'static str, value: String },
}

/// Query parameters for `GET /api/bus/registrations`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationsQuery {
    pub route: Option<String>,
    pub operator: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl RegistrationsQuery {
    /// Builds the row filter. Empty values are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::InvalidDate`] if a date cannot be parsed.
    pub fn filter(&self) -> Result<RecordFilter, ParamError> {
        Ok(RecordFilter {
            route: non_empty(self.route.as_deref()),
            operator: non_empty(self.operator.as_deref()),
            start_date: parse_date("start_date", self.start_date.as_deref())?,
            end_date: parse_date("end_date", self.end_date.as_deref())?,
        })
    }
}

/// Query parameters for `GET /api/bus/analytics`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyticsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub hour_start: Option<u8>,
    pub hour_end: Option<u8>,
    /// Comma-separated operators.
    pub companies: Option<String>,
    /// Comma-separated routes.
    pub routes: Option<String>,
}

impl AnalyticsQuery {
    /// Builds the analytics filter.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::InvalidDate`] if a date cannot be parsed.
    pub fn filter(&self) -> Result<AnalyticsFilter, ParamError> {
        Ok(AnalyticsFilter {
            start_date: parse_date("start_date", self.start_date.as_deref())?,
            end_date: parse_date("end_date", self.end_date.as_deref())?,
            hour_start: self.hour_start,
            hour_end: self.hour_end,
            companies: split_list(self.companies.as_deref()),
            routes: split_list(self.routes.as_deref()),
        })
    }
}

/// Query parameters for `GET /api/bus/volume`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VolumeQuery {
    pub group_by: Option<String>,
}

impl VolumeQuery {
    /// The requested grouping; absent or unknown values group by route.
    #[must_use]
    pub fn grouping(&self) -> VolumeGrouping {
        self.group_by
            .as_deref()
            .map(VolumeGrouping::parse_or_default)
            .unwrap_or_default()
    }
}

/// Query parameters for `GET /api/bus/hourly-trend`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HourlyTrendQuery {
    pub route: Option<String>,
}

impl HourlyTrendQuery {
    #[must_use]
    pub fn route(&self) -> Option<&str> {
        self.route.as_deref().map(str::trim).filter(|r| !r.is_empty())
    }
}

/// Response of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    pub status: String,
    pub bus_data_loaded: bool,
    pub geo_data_loaded: bool,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

impl ApiError {
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Response of `POST /api/routes/refresh`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub status: String,
    pub message: String,
    pub data: RefreshSummary,
}

impl RefreshResponse {
    #[must_use]
    pub fn success(data: RefreshSummary) -> Self {
        let message = if data.is_partial() {
            "Route data refreshed with failures"
        } else {
            "Route data refreshed"
        };
        Self {
            status: "success".to_string(),
            message: message.to_string(),
            data,
        }
    }
}

/// Response of `POST /api/reload-data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReloadResponse {
    /// Whether the ridership CSV was reloaded.
    pub bus_data_reloaded: bool,
    /// Whether the zone file was reloaded.
    pub geo_data_reloaded: bool,
    /// Whether a ridership table is being served after the reload.
    pub bus_data_loaded: bool,
    /// Whether a zone table is being served after the reload.
    pub geo_data_loaded: bool,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_date(param: &'static str, value: Option<&str>) -> Result<Option<NaiveDate>, ParamError> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    dates::parse(value)
        .map(Some)
        .ok_or_else(|| ParamError::InvalidDate {
            param,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registrations_filter_ignores_empty_values() {
        let query = RegistrationsQuery {
            route: Some(String::new()),
            operator: Some("BakuBus".to_string()),
            start_date: Some("2024-03-01".to_string()),
            end_date: Some(" ".to_string()),
            ..RegistrationsQuery::default()
        };
        let filter = query.filter().unwrap();
        assert_eq!(filter.route, None);
        assert_eq!(filter.operator.as_deref(), Some("BakuBus"));
        assert_eq!(filter.start_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(filter.end_date, None);
    }

    #[test]
    fn bad_dates_are_rejected() {
        let query = AnalyticsQuery {
            end_date: Some("yesterday".to_string()),
            ..AnalyticsQuery::default()
        };
        let err = query.filter().unwrap_err();
        assert_eq!(
            err,
            ParamError::InvalidDate {
                param: "end_date",
                value: "yesterday".to_string()
            }
        );
        assert!(err.to_string().contains("end_date"));
    }

    #[test]
    fn analytics_lists_are_split() {
        let query = AnalyticsQuery {
            companies: Some("BakuBus, Sahil,".to_string()),
            routes: Some("10".to_string()),
            hour_start: Some(6),
            ..AnalyticsQuery::default()
        };
        let filter = query.filter().unwrap();
        assert_eq!(filter.companies, vec!["BakuBus", "Sahil"]);
        assert_eq!(filter.routes, vec!["10"]);
        assert_eq!(filter.hour_start, Some(6));
    }

    #[test]
    fn volume_grouping_falls_back_to_route() {
        let grouping = |g: Option<&str>| {
            VolumeQuery {
                group_by: g.map(str::to_string),
            }
            .grouping()
        };
        assert_eq!(grouping(None), VolumeGrouping::Route);
        assert_eq!(grouping(Some("hour")), VolumeGrouping::Hour);
        assert_eq!(grouping(Some("weekday")), VolumeGrouping::Route);
    }

    #[test]
    fn refresh_message_reports_failures() {
        let clean = RefreshResponse::success(RefreshSummary::default());
        assert_eq!(clean.message, "Route data refreshed");

        let partial = RefreshResponse::success(RefreshSummary {
            failed_buses: 2,
            ..RefreshSummary::default()
        });
        assert_eq!(partial.status, "success");
        assert_eq!(partial.message, "Route data refreshed with failures");

        let json = serde_json::to_value(&partial).unwrap();
        assert_eq!(json["data"]["failed_buses"], 2);
    }
}
