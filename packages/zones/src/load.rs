//! Zone file readers.

use std::path::Path;

use geo::MultiPolygon;
use geojson::{GeoJson, JsonObject, JsonValue};

use transit_map_zones_models::RegionLevel;

use crate::{Zone, ZoneError};

/// Reads a `GeoPackage` through `DuckDB`'s spatial extension.
pub fn read_geopackage(path: &Path) -> Result<Vec<Zone>, ZoneError> {
    let conn = duckdb::Connection::open_in_memory()?;
    conn.execute_batch("INSTALL spatial; LOAD spatial;")?;

    let source = path.to_string_lossy().replace('\'', "''");
    let query = format!(
        "SELECT CAST({} AS VARCHAR), CAST({} AS VARCHAR), CAST({} AS VARCHAR), \
         CAST(population AS DOUBLE), CAST(tot_jobs AS DOUBLE), ST_AsGeoJSON(geom) \
         FROM ST_Read('{source}')",
        RegionLevel::Micro.column(),
        RegionLevel::Meso.column(),
        RegionLevel::Macro.column(),
    );

    let mut stmt = conn.prepare(&query)?;
    let mut rows = stmt.query([])?;
    let mut zones = Vec::new();
    let mut skipped = 0_usize;

    while let Some(row) = rows.next()? {
        let geojson_str: Option<String> = row.get(5)?;
        let Some(geometry) = geojson_str.as_deref().and_then(parse_geojson_to_multipolygon) else {
            skipped += 1;
            continue;
        };

        zones.push(Zone {
            micro_id: normalize_key(row.get::<_, Option<String>>(0)?.as_deref()),
            meso_id: normalize_key(row.get::<_, Option<String>>(1)?.as_deref()),
            macro_id: normalize_key(row.get::<_, Option<String>>(2)?.as_deref()),
            population: row.get::<_, Option<f64>>(3)?.unwrap_or(0.0),
            tot_jobs: row.get::<_, Option<f64>>(4)?.unwrap_or(0.0),
            geometry,
        });
    }

    if skipped > 0 {
        log::warn!("Skipped {skipped} zones without a usable polygon geometry");
    }

    Ok(zones)
}

/// Reads zones from a `GeoJSON` feature collection.
pub fn read_geojson(text: &str) -> Result<Vec<Zone>, ZoneError> {
    let GeoJson::FeatureCollection(collection) = text.parse::<GeoJson>()? else {
        return Err(ZoneError::NotFeatureCollection);
    };

    let mut zones = Vec::with_capacity(collection.features.len());
    for (index, feature) in collection.features.into_iter().enumerate() {
        let geometry = feature
            .geometry
            .and_then(|geom| geo::Geometry::<f64>::try_from(geom).ok())
            .and_then(into_multipolygon);
        let Some(geometry) = geometry else {
            log::warn!("Skipping zone feature {index}: no polygon geometry");
            continue;
        };

        let properties = feature.properties.unwrap_or_default();
        zones.push(Zone {
            micro_id: key_property(&properties, RegionLevel::Micro.column()),
            meso_id: key_property(&properties, RegionLevel::Meso.column()),
            macro_id: key_property(&properties, RegionLevel::Macro.column()),
            population: number_property(&properties, "population"),
            tot_jobs: number_property(&properties, "tot_jobs"),
            geometry,
        });
    }

    Ok(zones)
}

/// Parses a `GeoJSON` geometry string into a [`MultiPolygon`].
fn parse_geojson_to_multipolygon(geojson_str: &str) -> Option<MultiPolygon<f64>> {
    let GeoJson::Geometry(geom) = geojson_str.parse::<GeoJson>().ok()? else {
        return None;
    };
    into_multipolygon(geom.try_into().ok()?)
}

fn into_multipolygon(geometry: geo::Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geometry {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}

fn key_property(properties: &JsonObject, name: &str) -> String {
    match properties.get(name) {
        Some(JsonValue::String(s)) => normalize_key(Some(s)),
        Some(JsonValue::Number(n)) => normalize_key(Some(&n.to_string())),
        _ => String::new(),
    }
}

fn number_property(properties: &JsonObject, name: &str) -> f64 {
    match properties.get(name) {
        Some(JsonValue::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(JsonValue::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Trims a region key and drops a whole-number `.0` suffix, so keys stored
/// as floating point match their integer spelling.
fn normalize_key(raw: Option<&str>) -> String {
    let raw = raw.unwrap_or_default().trim();
    raw.strip_suffix(".0").unwrap_or(raw).to_string()
}
