//! Bus route list and detail scraping.
//!
//! The bus API is loosely typed: ids, numbers and coordinates arrive as
//! JSON numbers or numeric strings depending on the record, so decoding
//! works on [`serde_json::Value`] and accepts either.

use reqwest::Client;
use serde_json::Value;
use transit_map_scraper_models::{BusDetail, BusId, BusListing, BusStop, RoutePathPoint};

use crate::config::BusApiConfig;
use crate::{ScrapeError, header_map, retry};

/// Stop name used when neither the stop nor its entry names it.
pub const UNKNOWN_STOP: &str = "Unknown";

/// Fetches the list of bus routes.
///
/// # Errors
///
/// Returns [`ScrapeError`] if the request fails or the response is not an
/// array.
#[allow(clippy::future_not_send)]
pub async fn fetch_bus_list(
    client: &Client,
    config: &BusApiConfig,
) -> Result<Vec<BusListing>, ScrapeError> {
    let headers = header_map(&config.headers)?;
    let body = retry::send_json(|| {
        client
            .get(&config.list_url)
            .headers(headers.clone())
            .timeout(config.timeout())
    })
    .await?;

    parse_bus_list(&body)
}

/// Fetches stops, path and terminals of one bus route.
///
/// # Errors
///
/// Returns [`ScrapeError`] if the request fails.
#[allow(clippy::future_not_send)]
pub async fn fetch_bus_detail(
    client: &Client,
    config: &BusApiConfig,
    bus: &BusListing,
) -> Result<BusDetail, ScrapeError> {
    let headers = header_map(&config.headers)?;
    let id = bus.id.to_string();
    let body = retry::send_json(|| {
        client
            .get(&config.detail_url)
            .query(&[("id", id.as_str())])
            .headers(headers.clone())
            .timeout(config.timeout())
    })
    .await?;

    Ok(parse_bus_detail(bus, &body))
}

/// Decodes the bus list. Entries without an id are skipped.
///
/// # Errors
///
/// Returns [`ScrapeError::Parse`] if `body` is not an array.
pub fn parse_bus_list(body: &Value) -> Result<Vec<BusListing>, ScrapeError> {
    let entries = body
        .as_array()
        .ok_or_else(|| ScrapeError::Parse("bus list response is not an array".to_string()))?;

    let buses: Vec<BusListing> = entries
        .iter()
        .filter_map(|entry| {
            let id = entry.get("id").and_then(lenient_id)?;
            let number = entry
                .get("number")
                .and_then(lenient_text)
                .unwrap_or_else(|| id.to_string());
            Some(BusListing { id, number })
        })
        .collect();

    if buses.len() < entries.len() {
        log::warn!(
            "Skipped {} bus list entries without an id",
            entries.len() - buses.len()
        );
    }

    Ok(buses)
}

/// Decodes a bus detail response.
///
/// Stops need non-zero coordinates and path vertices need both
/// coordinates; anything else is dropped.
#[must_use]
pub fn parse_bus_detail(bus: &BusListing, body: &Value) -> BusDetail {
    let stops = array(body, "stops")
        .filter_map(|entry| {
            let stop = entry.get("stop");
            let coordinate = |key: &str| {
                stop.and_then(|s| s.get(key))
                    .and_then(lenient_f64)
                    .filter(|v| *v != 0.0)
            };
            let lat = coordinate("latitude")?;
            let lon = coordinate("longitude")?;
            let stop_name = stop
                .and_then(|s| s.get("name"))
                .and_then(lenient_text)
                .or_else(|| entry.get("stopName").and_then(lenient_text))
                .unwrap_or_else(|| UNKNOWN_STOP.to_string());

            Some(BusStop {
                bus_id: bus.id,
                bus_number: bus.number.clone(),
                stop_name,
                lat,
                lon,
            })
        })
        .collect();

    let path = array(body, "routes")
        .flat_map(|route| array(route, "coordinatesList"))
        .filter_map(|coord| {
            Some(RoutePathPoint {
                bus_id: bus.id,
                bus_number: bus.number.clone(),
                lat: coord.get("lat").and_then(lenient_f64)?,
                lon: coord.get("lng").and_then(lenient_f64)?,
            })
        })
        .collect();

    BusDetail {
        first_point: body
            .get("firstPoint")
            .and_then(lenient_text)
            .unwrap_or_default(),
        last_point: body
            .get("lastPoint")
            .and_then(lenient_text)
            .unwrap_or_default(),
        duration: body
            .get("durationMinuts")
            .and_then(lenient_f64)
            .unwrap_or(0.0),
        stop_entries: array(body, "stops").count(),
        stops,
        path,
    }
}

fn array<'a>(value: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    value
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

fn lenient_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn lenient_id(value: &Value) -> Option<BusId> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                .map(|f| f as BusId)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
