//! Interactive mode for the server.
//!
//! Prompts for the bind address, port and data directory before starting
//! the server.

use dialoguer::{Confirm, Input};
use transit_map_config::{DataPaths, ServerConfig};

/// Runs the server in interactive mode, prompting for configuration.
///
/// Defaults come from the environment, so pressing enter through every
/// prompt starts the server exactly as [`super::run_server`] would with
/// [`ServerConfig::from_env`] and [`DataPaths::from_env`].
///
/// # Errors
///
/// Returns an `std::io::Result` error if the underlying server fails to
/// start.
#[allow(clippy::future_not_send)]
pub async fn run() -> std::io::Result<()> {
    println!("Transit Map Server");
    println!();

    let defaults = ServerConfig::from_env();
    let default_paths = DataPaths::from_env();

    let bind_addr: String = Input::new()
        .with_prompt("Bind address")
        .default(defaults.bind_addr.clone())
        .interact_text()
        .unwrap_or(defaults.bind_addr);

    let port: u16 = Input::new()
        .with_prompt("Port")
        .default(defaults.port)
        .interact_text()
        .unwrap_or(defaults.port);

    let data_dir: String = Input::new()
        .with_prompt("Data directory")
        .default(default_paths.data_dir.display().to_string())
        .interact_text()
        .unwrap_or_else(|_| default_paths.data_dir.display().to_string());

    let paths = if std::path::Path::new(&data_dir) == default_paths.data_dir {
        default_paths
    } else {
        DataPaths::under(data_dir)
    };

    if !Confirm::new()
        .with_prompt(format!("Start server on {bind_addr}:{port}?"))
        .default(true)
        .interact()
        .unwrap_or(true)
    {
        println!("Cancelled.");
        return Ok(());
    }

    super::run_server(ServerConfig { bind_addr, port }, paths).await
}
