//! Point-of-interest extraction from feature-map tiles.
//!
//! The tile service answers with an array of tiles:
//!
//! ```json
//! [{"base": [1371209728, 809893888],
//!   "features": [{"a": [4096, 6144], "c": "{\"1\": {\"title\": \"Park\"}}"}]}]
//! ```
//!
//! `base` is the tile origin in world pixels, `a` a pixel offset from it,
//! and `c` a JSON document (itself a string) carrying the label.

use reqwest::Client;
use serde_json::Value;
use transit_map_scraper_models::Poi;
use transit_map_tiles::dedup::FeatureDeduplicator;
use transit_map_tiles::{GeoBounds, Projection, WorldPoint};

use crate::config::ProviderConfig;
use crate::{ScrapeError, header_map, retry};

/// Label used when a feature has none.
pub const UNKNOWN_TITLE: &str = "Unknown";

/// Requests every configured tile and extracts the POIs in them.
///
/// # Errors
///
/// Returns [`ScrapeError`] if the request fails or the response is not a
/// tile array.
#[allow(clippy::future_not_send)]
pub async fn fetch_pois(client: &Client, config: &ProviderConfig) -> Result<Vec<Poi>, ScrapeError> {
    let feature_maps = &config.feature_maps;
    let url = feature_maps.url()?;
    let headers = header_map(&feature_maps.headers)?;

    log::info!(
        "Fetching {} feature-map tiles from {}",
        feature_maps.tiles.tiles()?.len(),
        feature_maps.endpoint
    );
    let body = retry::send_json(|| {
        client
            .get(&url)
            .headers(headers.clone())
            .timeout(feature_maps.timeout())
    })
    .await?;

    let pois = extract_pois(&body, config.projection()?, &config.bounds)?;
    log::info!("Extracted {} POIs", pois.len());
    Ok(pois)
}

/// Decodes a tile array into unique POIs inside `bounds`.
///
/// Tiles without a usable `base` are skipped. Features keep their response
/// order, and a feature repeated in an overlapping tile is kept only the
/// first time.
///
/// # Errors
///
/// Returns [`ScrapeError::Parse`] if `body` is not an array.
pub fn extract_pois(
    body: &Value,
    projection: Projection,
    bounds: &GeoBounds,
) -> Result<Vec<Poi>, ScrapeError> {
    let tiles = body
        .as_array()
        .ok_or_else(|| ScrapeError::Parse("feature-map response is not an array".to_string()))?;

    let mut dedup = FeatureDeduplicator::new();
    let mut pois = Vec::new();
    let mut skipped_tiles = 0_usize;

    for tile in tiles {
        let Some(base) = tile_origin(tile) else {
            skipped_tiles += 1;
            continue;
        };

        let features = tile.get("features").and_then(Value::as_array);
        for feature in features.into_iter().flatten() {
            let (dx, dy) = pixel_offset(feature);
            let position = projection.to_lat_lon(base.offset(dx, dy));
            if !bounds.contains(position) {
                continue;
            }

            let title = feature_title(feature);
            if dedup.insert(position, &title) {
                pois.push(Poi {
                    title,
                    lat: position.lat,
                    lon: position.lon,
                });
            }
        }
    }

    if skipped_tiles > 0 {
        log::debug!("Skipped {skipped_tiles} tiles without an origin");
    }

    Ok(pois)
}

/// A tile's `base` origin; missing, null or zero columns are unusable.
fn tile_origin(tile: &Value) -> Option<WorldPoint> {
    let base = tile.get("base")?.as_array()?;
    let x = base.first()?.as_f64()?;
    let y = base.get(1)?.as_f64()?;
    (x != 0.0).then_some(WorldPoint::new(x, y))
}

/// A feature's `a` offset; absent components count as zero.
fn pixel_offset(feature: &Value) -> (f64, f64) {
    let offset = feature.get("a").and_then(Value::as_array);
    let component = |i: usize| {
        offset
            .and_then(|a| a.get(i))
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
    };
    (component(0), component(1))
}

/// The `1.title` entry of a feature's embedded `c` document.
fn feature_title(feature: &Value) -> String {
    feature
        .get("c")
        .and_then(Value::as_str)
        .and_then(|c| serde_json::from_str::<Value>(c).ok())
        .and_then(|c| c.get("1")?.get("title")?.as_str().map(str::to_string))
        .unwrap_or_else(|| UNKNOWN_TITLE.to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use transit_map_tiles::TileId;

    use super::*;

    const BAKU: GeoBounds = GeoBounds {
        min_lat: 40.0,
        max_lat: 41.0,
        min_lon: 49.0,
        max_lon: 51.0,
    };

    fn projection() -> Projection {
        Projection::new(23).unwrap()
    }

    /// Origin of the zoom-12 tile holding the Heydar Aliyev Center.
    fn origin() -> WorldPoint {
        TileId::new(12, 2615, 1544)
            .unwrap()
            .origin(projection())
            .unwrap()
    }

    fn tile(base: Value, features: Value) -> Value {
        json!({"base": base, "features": features})
    }

    #[test]
    fn projects_feature_offsets() {
        let base = origin();
        let dx = 1_371_213_824.0 - base.x;
        let dy = 809_900_032.0 - base.y;
        let body = json!([tile(
            json!([base.x, base.y]),
            json!([{"a": [dx, dy], "c": "{\"1\": {\"title\": \"Heydar Aliyev Center\"}}"}])
        )]);

        let pois = extract_pois(&body, projection(), &BAKU).unwrap();
        assert_eq!(pois.len(), 1);
        assert_eq!(pois[0].title, "Heydar Aliyev Center");
        assert!((pois[0].lat - 40.3953).abs() < 1e-3);
        assert!((pois[0].lon - 49.8678).abs() < 1e-3);
    }

    #[test]
    fn dedups_across_overlapping_tiles() {
        let base = origin();
        let feature = json!({"a": [100, 200], "c": "{\"1\": {\"title\": \"Fountain\"}}"});
        let other = json!({"a": [100, 200], "c": "{\"1\": {\"title\": \"Kiosk\"}}"});
        let body = json!([
            tile(json!([base.x, base.y]), json!([feature.clone(), other])),
            tile(json!([base.x, base.y]), json!([feature]))
        ]);

        let pois = extract_pois(&body, projection(), &BAKU).unwrap();
        let titles: Vec<&str> = pois.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Fountain", "Kiosk"]);
    }

    #[test]
    fn skips_tiles_without_origin() {
        let base = origin();
        let features = json!([{"a": [0, 0], "c": "{\"1\": {\"title\": \"X\"}}"}]);
        let body = json!([
            json!({"features": features.clone()}),
            tile(json!([null, base.y]), features.clone()),
            tile(json!([0, base.y]), features.clone()),
            tile(json!([base.x]), features)
        ]);
        assert!(extract_pois(&body, projection(), &BAKU).unwrap().is_empty());
    }

    #[test]
    fn malformed_labels_become_unknown() {
        let base = origin();
        let body = json!([tile(
            json!([base.x, base.y]),
            json!([
                {"a": [10, 10], "c": "not json"},
                {"a": [20, 20], "c": "{\"2\": {}}"},
                {"a": [30, 30]}
            ])
        )]);

        let pois = extract_pois(&body, projection(), &BAKU).unwrap();
        assert_eq!(pois.len(), 3);
        assert!(pois.iter().all(|p| p.title == UNKNOWN_TITLE));
    }

    #[test]
    fn missing_offset_uses_tile_origin() {
        let base = origin();
        let body = json!([tile(json!([base.x, base.y]), json!([{"c": "{}"}]))]);
        let pois = extract_pois(&body, projection(), &BAKU).unwrap();
        let expected = projection().to_lat_lon(base);
        assert!((pois[0].lat - expected.lat).abs() < 1e-12);
        assert!((pois[0].lon - expected.lon).abs() < 1e-12);
    }

    #[test]
    fn drops_points_outside_bounds() {
        let far = TileId::new(12, 0, 0).unwrap().origin(projection()).unwrap();
        let body = json!([tile(json!([far.x + 1.0, far.y]), json!([{"a": [0, 0]}]))]);
        assert!(extract_pois(&body, projection(), &BAKU).unwrap().is_empty());
    }

    #[test]
    fn rejects_non_array_body() {
        let err = extract_pois(&json!({"error": "quota"}), projection(), &BAKU).unwrap_err();
        assert!(matches!(err, ScrapeError::Parse(_)));
    }
}
