//! CSV cache of scraped layers.
//!
//! A refresh writes four files into the cache directory; the live routes
//! endpoint and the map renderer read them back. Each file is written to a
//! temporary sibling and renamed into place, so readers never see a
//! half-written cache file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use transit_map_scraper_models::{
    BusId, BusRoute, BusStop, LiveRoutes, PathPoint, Poi, RoutePathPoint,
};

use crate::ScrapeError;

pub const POIS_FILE: &str = "pois.csv";
pub const STOPS_FILE: &str = "bus_stops.csv";
pub const ROUTES_FILE: &str = "bus_routes.csv";
pub const PATHS_FILE: &str = "bus_route_paths.csv";

/// Everything one refresh scraped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitLayers {
    pub pois: Vec<Poi>,
    pub stops: Vec<BusStop>,
    pub routes: Vec<BusRoute>,
    pub paths: Vec<RoutePathPoint>,
}

/// Location of the cache files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheDir {
    root: PathBuf,
}

impl CacheDir {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn file(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Whether the files the live routes endpoint needs are present.
    #[must_use]
    pub fn is_populated(&self) -> bool {
        [POIS_FILE, STOPS_FILE, ROUTES_FILE]
            .iter()
            .all(|name| self.file(name).is_file())
    }

    /// Writes every layer, replacing any previous cache.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError`] if the directory cannot be created or a file
    /// cannot be written.
    pub fn write(&self, layers: &TransitLayers) -> Result<(), ScrapeError> {
        std::fs::create_dir_all(&self.root)?;
        write_rows(&self.file(POIS_FILE), &layers.pois)?;
        write_rows(&self.file(STOPS_FILE), &layers.stops)?;
        write_rows(&self.file(ROUTES_FILE), &layers.routes)?;
        write_rows(&self.file(PATHS_FILE), &layers.paths)?;
        log::info!(
            "Cached {} POIs, {} stops, {} routes, {} path points in {}",
            layers.pois.len(),
            layers.stops.len(),
            layers.routes.len(),
            layers.paths.len(),
            self.root.display()
        );
        Ok(())
    }

    /// Replaces only the POI file.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError`] if the file cannot be written.
    pub fn write_pois(&self, pois: &[Poi]) -> Result<(), ScrapeError> {
        std::fs::create_dir_all(&self.root)?;
        write_rows(&self.file(POIS_FILE), pois)
    }

    /// Reads every cached layer. The path file is optional.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::CacheMissing`] if a required file is absent,
    /// or a CSV error if a file is malformed.
    pub fn read(&self) -> Result<TransitLayers, ScrapeError> {
        let paths_file = self.file(PATHS_FILE);
        let paths = if paths_file.is_file() {
            read_rows(&paths_file)?
        } else {
            Vec::new()
        };

        Ok(TransitLayers {
            pois: read_rows(&self.file(POIS_FILE))?,
            stops: read_rows(&self.file(STOPS_FILE))?,
            routes: read_rows(&self.file(ROUTES_FILE))?,
            paths,
        })
    }

    /// Reads the cache in the live routes response shape.
    ///
    /// # Errors
    ///
    /// See [`Self::read`].
    pub fn read_live(&self) -> Result<LiveRoutes, ScrapeError> {
        Ok(self.read()?.into())
    }
}

impl From<TransitLayers> for LiveRoutes {
    fn from(layers: TransitLayers) -> Self {
        Self {
            route_paths: group_paths(&layers.paths),
            pois: layers.pois,
            stops: layers.stops,
            buses: layers.routes,
        }
    }
}

/// Groups path vertices by bus, keeping cache order within each bus.
#[must_use]
pub fn group_paths(points: &[RoutePathPoint]) -> BTreeMap<BusId, Vec<PathPoint>> {
    let mut grouped: BTreeMap<BusId, Vec<PathPoint>> = BTreeMap::new();
    for point in points {
        grouped.entry(point.bus_id).or_default().push(point.into());
    }
    grouped
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), ScrapeError> {
    let tmp = path.with_extension("csv.tmp");
    {
        let mut writer = csv::Writer::from_path(&tmp)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, ScrapeError> {
    if !path.is_file() {
        return Err(ScrapeError::CacheMissing {
            path: path.to_path_buf(),
        });
    }

    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader.deserialize().collect::<Result<Vec<T>, _>>()?;
    Ok(rows)
}
