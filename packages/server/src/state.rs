//! Shared application state.
//!
//! Each table sits behind an `Arc` in a `RwLock`ed slot. Handlers clone
//! the `Arc` and release the lock at once, so a reload never blocks a
//! running query and a query never sees a half-replaced table.

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::Mutex;
use transit_map_config::DataPaths;
use transit_map_ridership::RidershipTable;
use transit_map_scraper::cache::CacheDir;
use transit_map_scraper::refresh::Scraper;
use transit_map_server_models::ReloadResponse;
use transit_map_zones::ZoneTable;

pub struct AppState {
    paths: DataPaths,
    ridership: RwLock<Option<Arc<RidershipTable>>>,
    zones: RwLock<Option<Arc<ZoneTable>>>,
    scraper: Scraper,
    cache: CacheDir,
    /// Held for the duration of a scrape; one refresh runs at a time.
    pub(crate) refreshing: Mutex<()>,
}

impl AppState {
    /// State with no tables loaded. The cache lives under `paths`.
    #[must_use]
    pub fn new(paths: DataPaths, scraper: Scraper) -> Self {
        Self {
            cache: CacheDir::new(paths.cache_dir()),
            paths,
            ridership: RwLock::new(None),
            zones: RwLock::new(None),
            scraper,
            refreshing: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn with_ridership(self, table: RidershipTable) -> Self {
        set_slot(&self.ridership, Arc::new(table));
        self
    }

    #[must_use]
    pub fn with_zones(self, table: ZoneTable) -> Self {
        set_slot(&self.zones, Arc::new(table));
        self
    }

    /// The ridership table, if one is loaded.
    pub fn ridership(&self) -> Option<Arc<RidershipTable>> {
        read_slot(&self.ridership)
    }

    /// The zone table, if one is loaded.
    pub fn zones(&self) -> Option<Arc<ZoneTable>> {
        read_slot(&self.zones)
    }

    #[must_use]
    pub const fn paths(&self) -> &DataPaths {
        &self.paths
    }

    #[must_use]
    pub const fn cache(&self) -> &CacheDir {
        &self.cache
    }

    #[must_use]
    pub const fn scraper(&self) -> &Scraper {
        &self.scraper
    }

    /// Reads both tables from disk and swaps in each one that loads.
    ///
    /// A table that fails to load is logged and the previous one, if any,
    /// keeps being served.
    pub fn reload(&self) -> ReloadResponse {
        let bus_data_reloaded = load_ridership(&self.paths.ridership_csv)
            .map(|table| set_slot(&self.ridership, Arc::new(table)))
            .is_some();
        let geo_data_reloaded = load_zones(&self.paths.zones)
            .map(|table| set_slot(&self.zones, Arc::new(table)))
            .is_some();

        ReloadResponse {
            bus_data_reloaded,
            geo_data_reloaded,
            bus_data_loaded: self.ridership().is_some(),
            geo_data_loaded: self.zones().is_some(),
        }
    }
}

fn load_ridership(path: &Path) -> Option<RidershipTable> {
    match RidershipTable::load(path) {
        Ok(table) => Some(table),
        Err(e) => {
            log::error!("Failed to load ridership data from {}: {e}", path.display());
            None
        }
    }
}

fn load_zones(path: &Path) -> Option<ZoneTable> {
    match ZoneTable::load(path) {
        Ok(table) => Some(table),
        Err(e) => {
            log::error!("Failed to load zones from {}: {e}", path.display());
            None
        }
    }
}

fn read_slot<T>(slot: &RwLock<Option<Arc<T>>>) -> Option<Arc<T>> {
    slot.read()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
        .map(Arc::clone)
}

fn set_slot<T>(slot: &RwLock<Option<Arc<T>>>, table: Arc<T>) {
    *slot.write().unwrap_or_else(PoisonError::into_inner) = Some(table);
}
