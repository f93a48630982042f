#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for the transit map toolchain.
//!
//! With a subcommand it runs that tool directly. Without one it asks which
//! tool to run. Logging goes through [`transit_map_cli_utils::init_logger`]
//! so log lines and progress bars share the terminal cleanly.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dialoguer::{Confirm, Select};
use transit_map_cli_utils::MultiProgress;
use transit_map_config::{DataPaths, ServerConfig};

#[derive(Parser)]
#[command(name = "transit_map", about = "Transit map toolchain")]
struct Cli {
    /// Data directory (defaults to `TRANSIT_MAP_DATA_DIR` or `data`)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Interface to bind (defaults to `BIND_ADDR` or 127.0.0.1)
        #[arg(long)]
        bind_addr: Option<String>,
        /// Port to listen on (defaults to `PORT` or 8080)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Scrape POIs and bus routes into the CSV cache
    Refresh,
    /// Scrape only the points of interest
    Pois,
    /// Render the cached layers to an HTML map
    Render {
        /// Output file (defaults to `<data>/generated/index.html`)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

/// Tools offered in interactive mode.
enum Tool {
    Refresh,
    Pois,
    Render,
    Server,
}

impl Tool {
    const ALL: &[Self] = &[Self::Refresh, Self::Pois, Self::Render, Self::Server];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Refresh => "Refresh live transit data",
            Self::Pois => "Fetch points of interest only",
            Self::Render => "Render HTML map",
            Self::Server => "Start server",
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = transit_map_cli_utils::init_logger();
    let cli = Cli::parse();

    let paths = cli
        .data_dir
        .map_or_else(DataPaths::from_env, DataPaths::under);

    match cli.command {
        Some(Commands::Serve { bind_addr, port }) => {
            let mut config = ServerConfig::from_env();
            if let Some(bind_addr) = bind_addr {
                config.bind_addr = bind_addr;
            }
            if let Some(port) = port {
                config.port = port;
            }
            commands::serve(config, paths).await?;
        }
        Some(Commands::Refresh) => commands::refresh(&multi, &paths).await?,
        Some(Commands::Pois) => commands::pois(&multi, &paths).await?,
        Some(Commands::Render { output }) => render(&paths, output)?,
        None => interactive(&multi, &paths).await?,
    }

    Ok(())
}

async fn interactive(
    multi: &MultiProgress,
    paths: &DataPaths,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Transit Map Toolchain");
    println!();

    let labels: Vec<&str> = Tool::ALL.iter().map(Tool::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Tool::ALL[idx] {
        Tool::Refresh => commands::refresh(multi, paths).await?,
        Tool::Pois => commands::pois(multi, paths).await?,
        Tool::Render => {
            if !commands::cache_ready(paths) {
                let scrape_first = Confirm::new()
                    .with_prompt("No cached transit data found. Refresh it first?")
                    .default(true)
                    .interact()?;
                if !scrape_first {
                    println!("Cancelled.");
                    return Ok(());
                }
                commands::refresh(multi, paths).await?;
            }
            render(paths, None)?;
        }
        Tool::Server => commands::serve_interactive().await?,
    }

    Ok(())
}

fn render(paths: &DataPaths, output: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let written = commands::render(paths, output)?;
    println!("Map written to {}", commands::display_path(&written));
    Ok(())
}
