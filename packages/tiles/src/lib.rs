#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Web-Mercator tile pyramid math for placing scraped map features.
//!
//! Feature-map tiles report positions as world-space pixel coordinates at a
//! fixed pyramid zoom. [`Projection`] owns that zoom (and therefore the
//! pixel extent of the world) so every caller converts with the same
//! constant. [`FeatureDeduplicator`] drops features that neighbouring tiles
//! report more than once.

pub mod dedup;

pub use dedup::FeatureDeduplicator;

use serde::{Deserialize, Serialize};

/// Edge length of a single tile in pixels.
pub const TILE_SIZE: u32 = 256;

/// Pixel zoom the feature-map service reports world coordinates at.
///
/// At zoom 23 the world spans `256 * 2^23 = 2^31` pixels per axis.
pub const DEFAULT_PIXEL_ZOOM: u8 = 23;

/// Highest zoom whose world extent still fits comfortably in an `f64`
/// mantissa alongside sub-pixel offsets.
pub const MAX_ZOOM: u8 = 30;

/// Errors from tile pyramid arithmetic.
#[derive(Debug, thiserror::Error)]
pub enum TileError {
    /// The zoom level is outside the supported pyramid.
    #[error("zoom {zoom} is outside the supported range 0..={MAX_ZOOM}")]
    InvalidZoom {
        /// The rejected zoom.
        zoom: u8,
    },

    /// A tile was addressed at a finer zoom than the projection resolves.
    #[error("tile zoom {tile_zoom} is finer than projection zoom {projection_zoom}")]
    TileZoomTooFine {
        /// Zoom of the tile.
        tile_zoom: u8,
        /// Zoom of the projection.
        projection_zoom: u8,
    },

    /// Tile x/y falls outside the grid at its zoom.
    #[error("tile ({x}, {y}) is outside the {size}x{size} grid at zoom {zoom}")]
    TileOutOfRange {
        /// Tile zoom.
        zoom: u8,
        /// Tile column.
        x: u32,
        /// Tile row.
        y: u32,
        /// Number of tiles per axis at this zoom.
        size: u64,
    },
}

/// A geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    /// Latitude in degrees, positive north.
    pub lat: f64,
    /// Longitude in degrees, positive east.
    pub lon: f64,
}

impl LatLon {
    /// Creates a position from latitude and longitude in degrees.
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// A world-space pixel coordinate at a [`Projection`]'s zoom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldPoint {
    /// Pixels east of the antimeridian.
    pub x: f64,
    /// Pixels south of the northern pyramid edge.
    pub y: f64,
}

impl WorldPoint {
    /// Creates a world pixel coordinate.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns this point shifted by a tile-local pixel offset.
    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Inverse/forward Web-Mercator projection at a fixed pixel zoom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Projection {
    zoom: u8,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            zoom: DEFAULT_PIXEL_ZOOM,
        }
    }
}

impl Projection {
    /// Creates a projection for world pixels at `zoom`.
    ///
    /// # Errors
    ///
    /// Returns [`TileError::InvalidZoom`] if `zoom` exceeds [`MAX_ZOOM`].
    pub const fn new(zoom: u8) -> Result<Self, TileError> {
        if zoom > MAX_ZOOM {
            return Err(TileError::InvalidZoom { zoom });
        }
        Ok(Self { zoom })
    }

    /// Pixel zoom of this projection.
    #[must_use]
    pub const fn zoom(self) -> u8 {
        self.zoom
    }

    /// Total pixel extent of the world along one axis (`256 * 2^zoom`).
    #[must_use]
    pub const fn world_size(self) -> u64 {
        (TILE_SIZE as u64) << self.zoom
    }

    /// Converts a world pixel coordinate to latitude/longitude.
    ///
    /// The normalized y is clamped to `[0, 1]`, so pixels beyond the
    /// pyramid's vertical edges map to the Mercator latitude limit.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_lat_lon(self, world: WorldPoint) -> LatLon {
        let size = self.world_size() as f64;
        let x = world.x / size;
        let y = (world.y / size).clamp(0.0, 1.0);

        let lon = x.mul_add(360.0, -180.0);
        let lat = (std::f64::consts::PI * 2.0f64.mul_add(-y, 1.0))
            .sinh()
            .atan()
            .to_degrees();

        LatLon { lat, lon }
    }

    /// Converts latitude/longitude to a world pixel coordinate.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_world(self, position: LatLon) -> WorldPoint {
        let size = self.world_size() as f64;
        let x = (position.lon + 180.0) / 360.0;
        let lat_rad = position.lat.to_radians();
        let y = (1.0 - lat_rad.tan().asinh() / std::f64::consts::PI) / 2.0;

        WorldPoint {
            x: x * size,
            y: y * size,
        }
    }
}

/// A tile address in the `z/x/y` scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileId {
    /// Tile zoom.
    pub zoom: u8,
    /// Tile column, counted east from the antimeridian.
    pub x: u32,
    /// Tile row, counted south from the northern edge.
    pub y: u32,
}

impl TileId {
    /// Creates a tile address.
    ///
    /// # Errors
    ///
    /// Returns [`TileError`] if the zoom is unsupported or the column/row
    /// fall outside the grid.
    pub const fn new(zoom: u8, x: u32, y: u32) -> Result<Self, TileError> {
        if zoom > MAX_ZOOM {
            return Err(TileError::InvalidZoom { zoom });
        }
        let size = 1u64 << zoom;
        if x as u64 >= size || y as u64 >= size {
            return Err(TileError::TileOutOfRange { zoom, x, y, size });
        }
        Ok(Self { zoom, x, y })
    }

    /// World pixel coordinate of this tile's north-west corner at the
    /// projection's zoom.
    ///
    /// # Errors
    ///
    /// Returns [`TileError::TileZoomTooFine`] if the tile is addressed at a
    /// finer zoom than the projection.
    #[allow(clippy::cast_precision_loss)]
    pub const fn origin(self, projection: Projection) -> Result<WorldPoint, TileError> {
        if self.zoom > projection.zoom {
            return Err(TileError::TileZoomTooFine {
                tile_zoom: self.zoom,
                projection_zoom: projection.zoom,
            });
        }
        let pixels_per_tile = (TILE_SIZE as u64) << (projection.zoom - self.zoom);
        Ok(WorldPoint {
            x: (self.x as u64 * pixels_per_tile) as f64,
            y: (self.y as u64 * pixels_per_tile) as f64,
        })
    }
}

/// An inclusive latitude/longitude box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    /// Southern edge.
    pub min_lat: f64,
    /// Northern edge.
    pub max_lat: f64,
    /// Western edge.
    pub min_lon: f64,
    /// Eastern edge.
    pub max_lon: f64,
}

impl GeoBounds {
    /// Whether `position` lies inside the box (edges included).
    #[must_use]
    pub fn contains(&self, position: LatLon) -> bool {
        (self.min_lat..=self.max_lat).contains(&position.lat)
            && (self.min_lon..=self.max_lon).contains(&position.lon)
    }
}
