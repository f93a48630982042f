#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Zone polygons and their demographic attributes.
//!
//! Zones are loaded once into a [`ZoneTable`], which dissolves them to
//! every [`RegionLevel`] up front: polygons sharing a region key are
//! unioned and their population and job counts summed. Queries then only
//! read the precomputed regions.

mod load;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use geo::{BooleanOps, MultiPolygon};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, feature::Id};
use thiserror::Error;
use transit_map_zones_models::{MacroSummary, MetricSummary, RegionLevel, RegionStats};

/// Errors that can occur loading zone data.
#[derive(Debug, Error)]
pub enum ZoneError {
    /// The file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The `GeoJSON` document could not be parsed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// A `GeoJSON` document was valid but not a feature collection.
    #[error("expected a GeoJSON FeatureCollection")]
    NotFeatureCollection,

    /// Reading the `GeoPackage` through `DuckDB` failed.
    #[error("DuckDB error: {0}")]
    Database(#[from] duckdb::Error),

    /// The file extension is not a supported zone format.
    #[error("unsupported zone file '{}' (expected .gpkg, .geojson or .json)", path.display())]
    UnsupportedFormat {
        /// Offending path.
        path: PathBuf,
    },
}

/// One source zone.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub micro_id: String,
    pub meso_id: String,
    pub macro_id: String,
    pub population: f64,
    pub tot_jobs: f64,
    pub geometry: MultiPolygon<f64>,
}

impl Zone {
    /// Region identifier at `level`.
    #[must_use]
    pub fn region_id(&self, level: RegionLevel) -> &str {
        match level {
            RegionLevel::Micro => &self.micro_id,
            RegionLevel::Meso => &self.meso_id,
            RegionLevel::Macro => &self.macro_id,
        }
    }
}

/// Zones dissolved into one region.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub name: String,
    pub population: f64,
    pub tot_jobs: f64,
    /// Source zones merged into this region.
    pub zone_count: usize,
    pub geometry: MultiPolygon<f64>,
}

/// Loaded zones plus their dissolved regions at every level.
#[derive(Debug, Clone, Default)]
pub struct ZoneTable {
    zones: Vec<Zone>,
    regions: BTreeMap<RegionLevel, Vec<Region>>,
}

impl ZoneTable {
    /// Loads zones from a `GeoPackage` (`.gpkg`) or `GeoJSON`
    /// (`.geojson`, `.json`) file.
    ///
    /// # Errors
    ///
    /// Returns [`ZoneError`] if the file cannot be read or parsed, or has
    /// an unsupported extension.
    pub fn load(path: &Path) -> Result<Self, ZoneError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        let zones = match extension.as_deref() {
            Some("gpkg") => load::read_geopackage(path)?,
            Some("geojson" | "json") => load::read_geojson(&std::fs::read_to_string(path)?)?,
            _ => {
                return Err(ZoneError::UnsupportedFormat {
                    path: path.to_path_buf(),
                });
            }
        };

        log::info!("Loaded {} zones from {}", zones.len(), path.display());
        Ok(Self::from_zones(zones))
    }

    /// Builds a table from zones, dissolving every level.
    #[must_use]
    pub fn from_zones(zones: Vec<Zone>) -> Self {
        let regions = [RegionLevel::Micro, RegionLevel::Meso, RegionLevel::Macro]
            .into_iter()
            .map(|level| (level, dissolve(&zones, level)))
            .collect();

        Self { zones, regions }
    }

    /// Source zones in load order.
    #[must_use]
    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// Number of source zones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    /// Whether no zones were loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Regions at `level`, ordered by region key.
    #[must_use]
    pub fn dissolve(&self, level: RegionLevel) -> &[Region] {
        self.regions
            .get(&level)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Regions at `level` as a `GeoJSON` feature collection.
    ///
    /// Feature ids are 0-based positions. A region made of a single
    /// polygon is emitted as a `Polygon`, anything else as a
    /// `MultiPolygon`.
    #[must_use]
    pub fn feature_collection(&self, level: RegionLevel) -> FeatureCollection {
        let features = self
            .dissolve(level)
            .iter()
            .enumerate()
            .map(|(index, region)| region_feature(index, region, level))
            .collect();

        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }

    /// Population and job statistics across regions at `level`.
    #[must_use]
    pub fn stats(&self, level: RegionLevel) -> RegionStats {
        let regions = self.dissolve(level);
        RegionStats {
            total_zones: regions.len(),
            region_type: level,
            population: MetricSummary::from_values(regions.iter().map(|r| r.population)),
            jobs: MetricSummary::from_values(regions.iter().map(|r| r.tot_jobs)),
        }
    }

    /// Macro regions by population, largest first.
    #[must_use]
    pub fn macro_summaries(&self) -> Vec<MacroSummary> {
        let mut summaries: Vec<MacroSummary> = self
            .dissolve(RegionLevel::Macro)
            .iter()
            .map(|region| MacroSummary {
                name: region.name.clone(),
                zone_count: region.zone_count,
                population: region.population,
                tot_jobs: region.tot_jobs,
            })
            .collect();

        summaries.sort_by(|a, b| b.population.total_cmp(&a.population));
        summaries
    }
}

fn dissolve(zones: &[Zone], level: RegionLevel) -> Vec<Region> {
    let mut grouped: BTreeMap<&str, Region> = BTreeMap::new();

    for zone in zones {
        let key = zone.region_id(level);
        if key.is_empty() {
            continue;
        }

        match grouped.get_mut(key) {
            Some(region) => {
                region.population += zone.population;
                region.tot_jobs += zone.tot_jobs;
                region.zone_count += 1;
                region.geometry = region.geometry.union(&zone.geometry);
            }
            None => {
                grouped.insert(
                    key,
                    Region {
                        name: key.to_string(),
                        population: zone.population,
                        tot_jobs: zone.tot_jobs,
                        zone_count: 1,
                        geometry: zone.geometry.clone(),
                    },
                );
            }
        }
    }

    let mut regions: Vec<Region> = grouped.into_values().collect();
    regions.sort_by(|a, b| cmp_region_keys(&a.name, &b.name));
    regions
}

/// Numeric keys in numeric order ahead of everything else, which sorts
/// lexically.
fn cmp_region_keys(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.total_cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

fn region_feature(index: usize, region: &Region, level: RegionLevel) -> Feature {
    let value = match region.geometry.0.as_slice() {
        [polygon] => geojson::Value::from(polygon),
        _ => geojson::Value::from(&region.geometry),
    };

    let mut properties = JsonObject::new();
    properties.insert("region_name".to_string(), region.name.clone().into());
    properties.insert("population".to_string(), region.population.into());
    properties.insert("tot_jobs".to_string(), region.tot_jobs.into());
    properties.insert("region_type".to_string(), level.as_ref().into());

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: Some(Id::Number(index.into())),
        properties: Some(properties),
        foreign_members: None,
    }
}
