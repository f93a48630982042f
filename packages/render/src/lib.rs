#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Static map page generation.
//!
//! Renders a single self-contained HTML page: a Leaflet map with the cached
//! POI, stop and route path layers, plus a sidebar with counts, a POI search
//! list and the largest macro regions. Layer data is embedded as JSON, so
//! the page works when opened straight from disk.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use serde::Serialize;
use transit_map_scraper_models::{BusId, BusStop, LiveRoutes, PathPoint, Poi};
use transit_map_tiles::LatLon;
use transit_map_zones_models::MacroSummary;

const TEMPLATE: &str = include_str!("../templates/map.html");

/// Macro regions listed in the sidebar.
pub const SIDEBAR_REGIONS: usize = 15;

/// Initial zoom of the rendered map.
pub const DEFAULT_ZOOM: u8 = 11;

/// Errors that can occur while rendering a map page.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Writing the page failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A layer could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything shown on one map page.
#[derive(Debug, Clone, PartialEq)]
pub struct MapDocument {
    pub title: String,
    pub subtitle: String,
    pub center: LatLon,
    pub zoom: u8,
    pub pois: Vec<Poi>,
    pub stops: Vec<BusStop>,
    pub route_paths: BTreeMap<BusId, Vec<PathPoint>>,
    /// Source zones behind the region summaries.
    pub zone_count: usize,
    /// Macro regions, largest population first.
    pub regions: Vec<MacroSummary>,
}

impl MapDocument {
    /// An empty page centred on `center`.
    #[must_use]
    pub fn new(title: impl Into<String>, center: LatLon) -> Self {
        Self {
            title: title.into(),
            subtitle: String::new(),
            center,
            zoom: DEFAULT_ZOOM,
            pois: Vec::new(),
            stops: Vec::new(),
            route_paths: BTreeMap::new(),
            zone_count: 0,
            regions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = subtitle.into();
        self
    }

    /// Takes the POI, stop and path layers from a cache read.
    #[must_use]
    pub fn with_live_routes(mut self, live: LiveRoutes) -> Self {
        self.pois = live.pois;
        self.stops = live.stops;
        self.route_paths = live.route_paths;
        self
    }

    #[must_use]
    pub fn with_regions(mut self, zone_count: usize, regions: Vec<MacroSummary>) -> Self {
        self.zone_count = zone_count;
        self.regions = regions;
        self
    }

    /// Renders the page.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Json`] if a layer cannot be serialized.
    #[allow(clippy::cast_precision_loss)]
    pub fn render(&self) -> Result<String, RenderError> {
        let population: f64 = self.regions.iter().map(|r| r.population).sum();
        let jobs: f64 = self.regions.iter().map(|r| r.tot_jobs).sum();

        let mut values: BTreeMap<&str, String> = BTreeMap::new();
        values.insert("TITLE", escape_html(&self.title));
        values.insert("SUBTITLE", escape_html(&self.subtitle));
        values.insert("POI_COUNT", format_count(self.pois.len() as f64));
        values.insert("STOP_COUNT", format_count(self.stops.len() as f64));
        values.insert("ROUTE_COUNT", format_count(self.route_paths.len() as f64));
        values.insert("ZONE_COUNT", format_count(self.zone_count as f64));
        values.insert("REGION_COUNT", format_count(self.regions.len() as f64));
        values.insert("TOTAL_POPULATION", format_count(population));
        values.insert("TOTAL_JOBS", format_count(jobs));
        values.insert("REGIONS_HTML", regions_html(&self.regions));
        values.insert("CENTER_LAT", self.center.lat.to_string());
        values.insert("CENTER_LON", self.center.lon.to_string());
        values.insert("ZOOM", self.zoom.to_string());
        values.insert("POIS_JSON", embed_json(&self.pois)?);
        values.insert("STOPS_JSON", embed_json(&self.stops)?);
        values.insert("PATHS_JSON", embed_json(&self.route_paths)?);

        Ok(fill(TEMPLATE, &values))
    }
}

/// Renders `doc` to `path`, creating parent directories.
///
/// # Errors
///
/// Returns [`RenderError`] if rendering or writing fails.
pub fn write_map(path: &Path, doc: &MapDocument) -> Result<(), RenderError> {
    let html = doc.render()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)?;

    log::info!(
        "Wrote map with {} POIs, {} stops and {} route paths to {}",
        doc.pois.len(),
        doc.stops.len(),
        doc.route_paths.len(),
        path.display()
    );
    Ok(())
}

/// Escapes text for use in HTML content and attribute values.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Serializes `value` for an inline `<script>`; `</` cannot close the tag.
fn embed_json<T: Serialize + ?Sized>(value: &T) -> Result<String, RenderError> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

/// Whole number with thousands separators.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn format_count(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{}", rounded.abs() as u64);
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0.0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn regions_html(regions: &[MacroSummary]) -> String {
    let mut html = String::new();
    for region in regions.iter().take(SIDEBAR_REGIONS) {
        let _ = writeln!(
            html,
            "                <div class=\"region-row\"><span class=\"region-name\">{}</span>\
             <span class=\"region-figures\">{} people, {} jobs ({} zones)</span></div>",
            escape_html(&region.name),
            format_count(region.population),
            format_count(region.tot_jobs),
            region.zone_count
        );
    }
    html
}

/// Replaces `{{NAME}}` placeholders in one pass, so substituted text is
/// never scanned again. Unknown placeholders are left as they are.
fn fill(template: &str, values: &BTreeMap<&str, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) if values.contains_key(&after[..end]) => {
                out.push_str(&values[&after[..end]]);
                rest = &after[end + 2..];
            }
            _ => {
                out.push_str("{{");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> MapDocument {
        let live = LiveRoutes {
            pois: vec![Poi {
                title: "Maiden Tower".to_string(),
                lat: 40.3661,
                lon: 49.8372,
            }],
            stops: vec![BusStop {
                bus_id: 1,
                bus_number: "1".to_string(),
                stop_name: "Icherisheher".to_string(),
                lat: 40.366,
                lon: 49.835,
            }],
            buses: Vec::new(),
            route_paths: BTreeMap::from([(
                1,
                vec![
                    PathPoint { lat: 40.36, lon: 49.83 },
                    PathPoint { lat: 40.37, lon: 49.84 },
                ],
            )]),
        };

        MapDocument::new("Baku Transit Map", LatLon::new(40.4093, 49.8671))
            .with_subtitle("Cached layers")
            .with_live_routes(live)
            .with_regions(
                12,
                vec![
                    MacroSummary {
                        name: "Nasimi".to_string(),
                        zone_count: 7,
                        population: 1_234_567.4,
                        tot_jobs: 89_000.0,
                    },
                    MacroSummary {
                        name: "Sabail".to_string(),
                        zone_count: 5,
                        population: 900.0,
                        tot_jobs: 12.0,
                    },
                ],
            )
    }

    #[test]
    fn renders_every_placeholder() {
        let html = document().render().unwrap();
        assert!(!html.contains("{{"));
        assert!(html.contains("<title>Baku Transit Map</title>"));
        assert!(html.contains("setView([40.4093, 49.8671], 11)"));
        assert!(html.contains("\"title\":\"Maiden Tower\""));
        assert!(html.contains("\"stop_name\":\"Icherisheher\""));
        assert!(html.contains("\"1\":[{\"lat\":40.36,\"lon\":49.83}"));
        assert!(html.contains("1,235,467"));
        assert!(html.contains("Nasimi"));
        assert!(html.contains("Route Paths (1)"));
    }

    #[test]
    fn sidebar_text_is_escaped() {
        let mut doc = document();
        doc.title = "<b>Baku</b> & co".to_string();
        doc.regions[0].name = "<script>".to_string();

        let html = doc.render().unwrap();
        assert!(html.contains("&lt;b&gt;Baku&lt;/b&gt; &amp; co"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<b>Baku</b>"));
    }

    #[test]
    fn embedded_json_cannot_close_the_script() {
        let mut doc = document();
        doc.pois[0].title = "</script><script>alert(1)</script>".to_string();

        let html = doc.render().unwrap();
        assert!(!html.contains("</script><script>alert"));
        assert!(html.contains("<\\/script><script>alert(1)<\\/script>"));
    }

    #[test]
    fn substituted_text_is_not_rescanned() {
        let mut doc = document();
        doc.pois[0].title = "{{ZOOM}}".to_string();
        let html = doc.render().unwrap();
        assert!(html.contains("\"title\":\"{{ZOOM}}\""));
    }

    #[test]
    fn sidebar_lists_at_most_fifteen_regions() {
        let regions = (0..20)
            .map(|i| MacroSummary {
                name: format!("Region {i}"),
                zone_count: 1,
                population: 1.0,
                tot_jobs: 1.0,
            })
            .collect::<Vec<_>>();
        let html = regions_html(&regions);
        assert_eq!(html.lines().count(), SIDEBAR_REGIONS);
        assert!(!html.contains("Region 15"));
    }

    #[test]
    fn counts_use_thousands_separators() {
        assert_eq!(format_count(0.0), "0");
        assert_eq!(format_count(999.0), "999");
        assert_eq!(format_count(1000.0), "1,000");
        assert_eq!(format_count(1_234_567.6), "1,234,568");
    }

    #[test]
    fn write_map_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("generated").join("map.html");
        write_map(&path, &document()).unwrap();
        let html = std::fs::read_to_string(path).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
    }
}
