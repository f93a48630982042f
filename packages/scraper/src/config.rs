//! Provider configuration, embedded from `provider/*.toml`.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Duration;

use serde::Deserialize;
use transit_map_tiles::{GeoBounds, LatLon, Projection, TileError, TileId};

use crate::ScrapeError;

/// The Baku provider definition, baked in at compile time.
const BAKU_TOML: &str = include_str!("../provider/baku.toml");

/// Endpoints, headers and geography of one map provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Display name.
    pub name: String,
    /// Zoom of the world-pixel coordinates used by tile origins and offsets.
    pub projection_zoom: u8,
    /// Default map centre.
    pub center: LatLon,
    /// Area scraped points must fall inside.
    pub bounds: GeoBounds,
    pub feature_maps: FeatureMapsConfig,
    pub bus: BusApiConfig,
}

/// Feature-map tile service settings.
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureMapsConfig {
    pub endpoint: String,
    pub map_id: String,
    pub version: String,
    /// Constant tail of the `pb` request parameter after the tile list.
    pub pb_suffix: String,
    pub timeout_secs: u64,
    pub tiles: TileRange,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// Inclusive rectangle of tiles at one zoom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TileRange {
    pub zoom: u8,
    pub x_min: u32,
    pub x_max: u32,
    pub y_min: u32,
    pub y_max: u32,
}

/// Bus API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BusApiConfig {
    pub list_url: String,
    /// Detail endpoint; the bus id is passed as the `id` query parameter.
    pub detail_url: String,
    pub timeout_secs: u64,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl ProviderConfig {
    /// The built-in Baku provider.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Config`] if the embedded TOML is invalid.
    pub fn baku() -> Result<Self, ScrapeError> {
        Self::from_toml(BAKU_TOML)
    }

    /// Parses a provider definition.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Config`] if the TOML does not describe a
    /// provider, or its projection zoom is out of range.
    pub fn from_toml(toml_str: &str) -> Result<Self, ScrapeError> {
        let config: Self =
            toml::de::from_str(toml_str).map_err(|e| ScrapeError::Config(e.to_string()))?;
        config.projection()?;
        Ok(config)
    }

    /// Projection for the provider's world-pixel coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Tile`] if the projection zoom is out of range.
    pub fn projection(&self) -> Result<Projection, ScrapeError> {
        Ok(Projection::new(self.projection_zoom)?)
    }
}

impl TileRange {
    /// Every tile in the range, column by column.
    ///
    /// # Errors
    ///
    /// Returns [`TileError`] if the zoom is invalid or a coordinate is
    /// outside the pyramid.
    pub fn tiles(&self) -> Result<Vec<TileId>, TileError> {
        let mut tiles = Vec::new();
        for x in self.x_min..=self.x_max {
            for y in self.y_min..=self.y_max {
                tiles.push(TileId::new(self.zoom, x, y)?);
            }
        }
        Ok(tiles)
    }
}

impl FeatureMapsConfig {
    /// Request URL covering every configured tile.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Tile`] if the tile range is invalid.
    pub fn url(&self) -> Result<String, ScrapeError> {
        let mut pb = String::new();
        for tile in self.tiles.tiles()? {
            let _ = write!(pb, "!1m4!1m3!1i{}!2i{}!3i{}", tile.zoom, tile.x, tile.y);
        }
        pb.push_str(&self.pb_suffix);

        Ok(format!(
            "{}?map_id={}&version={}&pb={pb}",
            self.endpoint, self.map_id, self.version
        ))
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl BusApiConfig {
    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
