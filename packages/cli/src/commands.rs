//! The work behind each CLI subcommand.

use std::path::{Path, PathBuf};

use transit_map_cli_utils::{IndicatifProgress, MultiProgress};
use transit_map_config::{DataPaths, ServerConfig};
use transit_map_render::{MapDocument, write_map};
use transit_map_scraper::cache::CacheDir;
use transit_map_scraper::config::ProviderConfig;
use transit_map_scraper::refresh::Scraper;
use transit_map_zones::ZoneTable;

/// File name of the rendered map; served as the `/maps` index.
pub const MAP_FILE: &str = "index.html";

/// Scrapes POIs and every bus route, then rewrites the cache.
///
/// # Errors
///
/// Returns an error if the bus list cannot be fetched or the cache cannot
/// be written.
pub async fn refresh(
    multi: &MultiProgress,
    paths: &DataPaths,
) -> Result<(), Box<dyn std::error::Error>> {
    let scraper = Scraper::new(ProviderConfig::baku()?)?;
    let cache = CacheDir::new(paths.cache_dir());
    let progress = IndicatifProgress::scrape_bar(multi, "Scraping transit layers");

    let summary = transit_map_scraper::refresh::refresh(&scraper, &cache, &progress).await?;

    println!(
        "Cached {} POIs, {} bus routes, {} stops and {} path points in {}",
        summary.pois,
        summary.buses,
        summary.stops,
        summary.paths,
        cache.root().display()
    );
    if summary.poi_fetch_failed {
        println!("POI request failed; the POI layer is empty.");
    }
    if summary.failed_buses > 0 {
        println!("{} bus routes failed and were skipped.", summary.failed_buses);
    }
    Ok(())
}

/// Fetches only the feature-map POIs and replaces the cached POI file.
///
/// # Errors
///
/// Returns an error if the request fails or the file cannot be written.
pub async fn pois(
    multi: &MultiProgress,
    paths: &DataPaths,
) -> Result<(), Box<dyn std::error::Error>> {
    let scraper = Scraper::new(ProviderConfig::baku()?)?;
    let cache = CacheDir::new(paths.cache_dir());
    let progress = IndicatifProgress::task_spinner(multi, "Fetching points of interest");

    let pois = scraper.fetch_pois().await?;
    cache.write_pois(&pois)?;
    progress.finish(format!("Fetched {} POIs", pois.len()));

    println!("Wrote {} POIs to {}", pois.len(), cache.root().display());
    Ok(())
}

/// Renders the cached layers and zone summaries to an HTML map.
///
/// Zones are optional: when the zone file cannot be loaded the map is
/// rendered without the region sidebar.
///
/// # Errors
///
/// Returns an error if the cache is missing or the page cannot be written.
pub fn render(
    paths: &DataPaths,
    output: Option<PathBuf>,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let provider = ProviderConfig::baku()?;
    let live = CacheDir::new(paths.cache_dir()).read_live()?;

    let mut doc = MapDocument::new(format!("{} Transit Map", provider.name), provider.center)
        .with_subtitle("Points of interest, bus stops and route paths")
        .with_live_routes(live);

    match ZoneTable::load(&paths.zones) {
        Ok(zones) => doc = doc.with_regions(zones.len(), zones.macro_summaries()),
        Err(e) => log::warn!(
            "Rendering without zone summaries; failed to load {}: {e}",
            paths.zones.display()
        ),
    }

    let output = output.unwrap_or_else(|| default_map_path(paths));
    write_map(&output, &doc)?;
    Ok(output)
}

/// Runs the API server on its own actix runtime.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn serve(
    config: ServerConfig,
    paths: DataPaths,
) -> Result<(), Box<dyn std::error::Error>> {
    tokio::task::spawn_blocking(move || {
        actix_web::rt::System::new().block_on(transit_map_server::run_server(config, paths))
    })
    .await??;
    Ok(())
}

/// Runs the interactive server prompts on their own actix runtime.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn serve_interactive() -> Result<(), Box<dyn std::error::Error>> {
    tokio::task::spawn_blocking(|| {
        actix_web::rt::System::new().block_on(transit_map_server::interactive::run())
    })
    .await??;
    Ok(())
}

#[must_use]
pub fn default_map_path(paths: &DataPaths) -> PathBuf {
    paths.generated_dir().join(MAP_FILE)
}

/// Whether the cache holds everything [`render`] needs.
#[must_use]
pub fn cache_ready(paths: &DataPaths) -> bool {
    CacheDir::new(paths.cache_dir()).is_populated()
}

/// Shortens `path` relative to the working directory for display.
#[must_use]
pub fn display_path(path: &Path) -> String {
    std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(cwd).ok().map(Path::to_path_buf))
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}
