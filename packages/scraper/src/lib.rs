#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Transit layer scraping for the Baku map provider.
//!
//! Two upstream services are scraped:
//!
//! - the feature-map tile service, whose tiles carry labelled points of
//!   interest as pixel offsets from a tile origin ([`feature_maps`]);
//! - the bus API, which lists routes and returns stops and drawn paths per
//!   route ([`bus`]).
//!
//! [`refresh::refresh`] runs both and writes the results to the CSV cache
//! ([`cache`]) that the live routes endpoint and the map renderer read.

pub mod bus;
pub mod cache;
pub mod config;
pub mod feature_maps;
pub mod progress;
pub mod refresh;
pub mod retry;

use std::collections::BTreeMap;
use std::path::PathBuf;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use transit_map_tiles::TileError;

/// Errors that can occur during scraping and caching.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// An HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The upstream answered with an unusable status.
    #[error("HTTP status {status} from {url}")]
    Status {
        /// Response status.
        status: reqwest::StatusCode,
        /// Requested URL.
        url: String,
    },

    /// Parsing the response body failed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The provider configuration is invalid.
    #[error("Config error: {0}")]
    Config(String),

    /// A tile in the configured range is invalid.
    #[error("Tile error: {0}")]
    Tile(#[from] TileError),

    /// A required cache file has not been written yet.
    #[error("cache file {} not found; run a refresh first", path.display())]
    CacheMissing {
        /// Missing file.
        path: PathBuf,
    },
}

/// Builds a header map from configured name/value pairs.
///
/// # Errors
///
/// Returns [`ScrapeError::Config`] if a name or value is not a valid HTTP
/// header.
pub fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, ScrapeError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ScrapeError::Config(format!("header name '{name}': {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ScrapeError::Config(format!("header value for '{name}': {e}")))?;
        map.insert(name, value);
    }
    Ok(map)
}
