#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Scraped transit layer types.
//!
//! Each row type doubles as the CSV cache schema and the JSON shape served
//! by the live routes endpoint, so field names follow the cache headers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Identifier the bus API assigns to a route.
pub type BusId = i64;

/// A labelled point of interest from the feature-map tiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poi {
    pub title: String,
    pub lat: f64,
    pub lon: f64,
}

/// A stop served by a bus route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusStop {
    pub bus_id: BusId,
    pub bus_number: String,
    pub stop_name: String,
    pub lat: f64,
    pub lon: f64,
}

/// Summary of one bus route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusRoute {
    pub id: BusId,
    pub number: String,
    /// Name of the first terminal.
    #[serde(rename = "firstPoint")]
    pub first_point: String,
    /// Name of the last terminal.
    #[serde(rename = "lastPoint")]
    pub last_point: String,
    /// End-to-end duration in minutes.
    pub duration: f64,
    pub stops_count: usize,
}

/// One vertex of a route's drawn path, flattened for the CSV cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePathPoint {
    pub bus_id: BusId,
    pub bus_number: String,
    pub lat: f64,
    pub lon: f64,
}

/// A path vertex without its route columns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    pub lat: f64,
    pub lon: f64,
}

impl From<&RoutePathPoint> for PathPoint {
    fn from(point: &RoutePathPoint) -> Self {
        Self {
            lat: point.lat,
            lon: point.lon,
        }
    }
}

/// An entry of the bus list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusListing {
    pub id: BusId,
    pub number: String,
}

/// Everything scraped for one bus route.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BusDetail {
    pub first_point: String,
    pub last_point: String,
    pub duration: f64,
    /// Stop entries in the response, including ones dropped for missing
    /// coordinates.
    pub stop_entries: usize,
    pub stops: Vec<BusStop>,
    pub path: Vec<RoutePathPoint>,
}

/// Response of `GET /api/routes/live`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveRoutes {
    pub pois: Vec<Poi>,
    pub stops: Vec<BusStop>,
    pub buses: Vec<BusRoute>,
    /// Path vertices keyed by bus id, in cache order.
    pub route_paths: BTreeMap<BusId, Vec<PathPoint>>,
}

/// Outcome of a scrape-and-cache run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSummary {
    pub pois: usize,
    pub buses: usize,
    pub stops: usize,
    pub paths: usize,
    /// Buses whose detail request failed and were left out.
    pub failed_buses: usize,
    /// Whether the POI request failed, leaving `pois` at zero.
    pub poi_fetch_failed: bool,
}

impl RefreshSummary {
    /// Whether any part of the scrape was skipped because of a failure.
    #[must_use]
    pub const fn is_partial(&self) -> bool {
        self.poi_fetch_failed || self.failed_buses > 0
    }
}
