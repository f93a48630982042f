#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Zone demographic types shared by the zone table, the API and the map
//! renderer.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Administrative level zones are dissolved to.
///
/// Levels nest: every micro region belongs to one meso region, and every
/// meso region to one macro region.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RegionLevel {
    /// Finest level.
    Micro,
    /// Intermediate level.
    Meso,
    /// Coarsest level.
    Macro,
}

impl RegionLevel {
    /// Zone attribute holding this level's region identifier.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Micro => "MICRO",
            Self::Meso => "MESO",
            Self::Macro => "MACRO",
        }
    }
}

/// Total, mean and extremes of one attribute across regions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub total: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl MetricSummary {
    /// Summarises `values`; every field is 0 when there are none.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let mut count = 0_usize;
        let mut total = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for value in values {
            count += 1;
            total += value;
            min = min.min(value);
            max = max.max(value);
        }

        if count == 0 {
            return Self::default();
        }

        Self {
            total,
            mean: total / count as f64,
            min,
            max,
        }
    }
}

/// Response of `GET /api/demographics/stats/{level}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionStats {
    /// Dissolved regions at the level.
    pub total_zones: usize,
    pub region_type: RegionLevel,
    pub population: MetricSummary,
    pub jobs: MetricSummary,
}

/// Per-macro-region totals shown in the map sidebar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroSummary {
    pub name: String,
    /// Source zones inside the region.
    pub zone_count: usize,
    pub population: f64,
    pub tot_jobs: f64,
}
