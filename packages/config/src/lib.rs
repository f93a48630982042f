#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Runtime configuration for the transit map toolchain.
//!
//! Everything is read from environment variables with defaults that match
//! the repository's `data/` layout. See [`paths`] for file locations and
//! [`ServerConfig`] for the HTTP bind address.

pub mod paths;

pub use paths::DataPaths;

/// Default bind address for the API server.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1";

/// Default port for the API server.
pub const DEFAULT_PORT: u16 = 8080;

/// Address and port the API server listens on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Interface to bind (`BIND_ADDR`).
    pub bind_addr: String,
    /// TCP port (`PORT`).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// Reads `BIND_ADDR` and `PORT`, falling back to the defaults.
    ///
    /// An unparsable `PORT` is logged and ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let port = lookup("PORT").map_or(DEFAULT_PORT, |raw| {
            raw.parse().unwrap_or_else(|_| {
                log::warn!("Ignoring invalid PORT value '{raw}', using {DEFAULT_PORT}");
                DEFAULT_PORT
            })
        });

        Self { bind_addr, port }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_environment() {
        let config = ServerConfig::from_lookup(|_| None);
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn reads_bind_addr_and_port() {
        let config = ServerConfig::from_lookup(|key| match key {
            "BIND_ADDR" => Some("0.0.0.0".to_string()),
            "PORT" => Some("8000".to_string()),
            _ => None,
        });
        assert_eq!(config.bind_addr, "0.0.0.0");
        assert_eq!(config.port, 8000);
    }

    #[test]
    fn invalid_port_falls_back() {
        let config = ServerConfig::from_lookup(|key| (key == "PORT").then(|| "http".to_string()));
        assert_eq!(config.port, DEFAULT_PORT);
    }
}
