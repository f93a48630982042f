#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Standalone entry point for the transit map API server.
//!
//! Reads `BIND_ADDR`, `PORT` and the data paths from the environment.

use transit_map_config::{DataPaths, ServerConfig};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    transit_map_server::run_server(ServerConfig::from_env(), DataPaths::from_env()).await
}
