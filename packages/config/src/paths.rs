//! Canonical file locations under the data directory.
//!
//! The data directory defaults to `data/` relative to the working
//! directory and can be moved with `TRANSIT_MAP_DATA_DIR`. The two input
//! tables can be pointed elsewhere individually.

use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "TRANSIT_MAP_DATA_DIR";

/// Environment variable overriding the ridership CSV path.
pub const RIDERSHIP_CSV_ENV: &str = "TRANSIT_MAP_RIDERSHIP_CSV";

/// Environment variable overriding the zone boundaries path.
pub const ZONES_PATH_ENV: &str = "TRANSIT_MAP_ZONES_PATH";

/// Resolved locations of every file the toolchain reads or writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    /// Root data directory.
    pub data_dir: PathBuf,
    /// Ridership check-in CSV.
    pub ridership_csv: PathBuf,
    /// Zone attributes (`.gpkg` or `.geojson`).
    pub zones: PathBuf,
}

impl DataPaths {
    /// Lays out the default file names under `data_dir`.
    #[must_use]
    pub fn under(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            ridership_csv: data_dir.join("ceck_in_buss.csv"),
            zones: data_dir.join("zone_attributes_synthetic.gpkg"),
            data_dir,
        }
    }

    /// Resolves paths from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut paths = Self::under(lookup(DATA_DIR_ENV).unwrap_or_else(|| "data".to_string()));
        if let Some(csv) = lookup(RIDERSHIP_CSV_ENV) {
            paths.ridership_csv = PathBuf::from(csv);
        }
        if let Some(zones) = lookup(ZONES_PATH_ENV) {
            paths.zones = PathBuf::from(zones);
        }
        paths
    }

    /// Directory holding the scraped CSV caches.
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }

    /// Directory holding generated HTML maps.
    #[must_use]
    pub fn generated_dir(&self) -> PathBuf {
        self.data_dir.join("generated")
    }
}

impl Default for DataPaths {
    fn default() -> Self {
        Self::under("data")
    }
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
