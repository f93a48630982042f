//! Scrape-and-cache orchestration.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use transit_map_scraper_models::{BusDetail, BusListing, BusRoute, Poi, RefreshSummary};

use crate::cache::{CacheDir, TransitLayers};
use crate::config::ProviderConfig;
use crate::progress::ProgressCallback;
use crate::{ScrapeError, bus, feature_maps};

/// Connect timeout shared by every upstream request.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client bound to one provider.
#[derive(Debug, Clone)]
pub struct Scraper {
    client: Client,
    config: ProviderConfig,
}

impl Scraper {
    /// Creates a scraper for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Http`] if the HTTP client cannot be built.
    pub fn new(config: ProviderConfig) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub const fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Fetches the POIs of every configured tile.
    ///
    /// # Errors
    ///
    /// See [`feature_maps::fetch_pois`].
    #[allow(clippy::future_not_send)]
    pub async fn fetch_pois(&self) -> Result<Vec<Poi>, ScrapeError> {
        feature_maps::fetch_pois(&self.client, &self.config).await
    }

    /// Fetches the bus route list.
    ///
    /// # Errors
    ///
    /// See [`bus::fetch_bus_list`].
    #[allow(clippy::future_not_send)]
    pub async fn fetch_bus_list(&self) -> Result<Vec<BusListing>, ScrapeError> {
        bus::fetch_bus_list(&self.client, &self.config.bus).await
    }

    /// Fetches one bus route's detail.
    ///
    /// # Errors
    ///
    /// See [`bus::fetch_bus_detail`].
    #[allow(clippy::future_not_send)]
    pub async fn fetch_bus_detail(&self, bus: &BusListing) -> Result<BusDetail, ScrapeError> {
        bus::fetch_bus_detail(&self.client, &self.config.bus, bus).await
    }

    /// Scrapes POIs, the bus list, then every bus detail in turn.
    ///
    /// A failed POI request or bus detail is logged, counted in the summary
    /// and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError`] only if the bus list cannot be fetched.
    #[allow(clippy::future_not_send)]
    pub async fn scrape(
        &self,
        progress: &Arc<dyn ProgressCallback>,
    ) -> Result<(TransitLayers, RefreshSummary), ScrapeError> {
        let mut layers = TransitLayers::default();
        let mut summary = RefreshSummary::default();

        progress.set_message("Fetching points of interest".to_string());
        match self.fetch_pois().await {
            Ok(pois) => layers.pois = pois,
            Err(e) => {
                log::warn!("POI fetch failed, continuing without POIs: {e}");
                summary.poi_fetch_failed = true;
            }
        }

        progress.set_message("Fetching bus list".to_string());
        let buses = self.fetch_bus_list().await?;
        log::info!("Found {} bus routes", buses.len());

        progress.set_total(buses.len() as u64);
        for listing in &buses {
            progress.set_message(format!("Bus {}", listing.number));
            match self.fetch_bus_detail(listing).await {
                Ok(detail) => merge_detail(&mut layers, listing, detail),
                Err(e) => {
                    log::warn!("Bus {} (id {}) failed: {e}", listing.number, listing.id);
                    summary.failed_buses += 1;
                }
            }
            progress.inc(1);
        }

        summary.pois = layers.pois.len();
        summary.buses = layers.routes.len();
        summary.stops = layers.stops.len();
        summary.paths = layers.paths.len();

        if summary.is_partial() {
            log::warn!(
                "Scrape incomplete: {} failed buses, POI fetch failed: {}",
                summary.failed_buses,
                summary.poi_fetch_failed
            );
        }
        progress.finish(format!(
            "Scraped {} POIs and {} bus routes",
            summary.pois, summary.buses
        ));
        Ok((layers, summary))
    }
}

/// Scrapes the provider and replaces the cache in `cache`.
///
/// The cache is only written once the scrape has finished.
///
/// # Errors
///
/// Returns [`ScrapeError`] if the bus list cannot be fetched or the cache
/// cannot be written.
#[allow(clippy::future_not_send)]
pub async fn refresh(
    scraper: &Scraper,
    cache: &CacheDir,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<RefreshSummary, ScrapeError> {
    let (layers, summary) = scraper.scrape(progress).await?;
    cache.write(&layers)?;
    Ok(summary)
}

fn merge_detail(layers: &mut TransitLayers, listing: &BusListing, detail: BusDetail) {
    layers.routes.push(BusRoute {
        id: listing.id,
        number: listing.number.clone(),
        first_point: detail.first_point,
        last_point: detail.last_point,
        duration: detail.duration,
        stops_count: detail.stop_entries,
    });
    layers.stops.extend(detail.stops);
    layers.paths.extend(detail.path);
}
