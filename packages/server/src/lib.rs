#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the transit map application.
//!
//! Serves ridership queries and analytics over the loaded check-in CSV,
//! dissolved zone demographics as GeoJSON, the scraped live route layers
//! from the CSV cache, and the generated HTML maps under `/maps`.

mod handlers;
pub mod interactive;
mod state;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpResponse, HttpServer, error, middleware, web};
use transit_map_config::{DataPaths, ServerConfig, paths::ensure_dir};
use transit_map_scraper::config::ProviderConfig;
use transit_map_scraper::refresh::Scraper;
use transit_map_server_models::ApiError;

pub use state::AppState;

/// Registers `/health` and every `/api` route.
///
/// Query strings that fail to deserialize answer 400 with an [`ApiError`]
/// body instead of actix-web's plain-text default.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::QueryConfig::default().error_handler(|err, _req| {
        let body = ApiError::new(err.to_string());
        error::InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
    }))
    .route("/health", web::get().to(handlers::health))
    .service(
        web::scope("/api")
            .route("/bus/registrations", web::get().to(handlers::registrations))
            .route("/bus/stats", web::get().to(handlers::stats))
            .route("/bus/analytics", web::get().to(handlers::analytics))
            .route("/bus/routes", web::get().to(handlers::routes))
            .route("/bus/operators", web::get().to(handlers::operators))
            .route("/bus/volume", web::get().to(handlers::volume))
            .route("/bus/hourly-trend", web::get().to(handlers::hourly_trend))
            .route("/date-range", web::get().to(handlers::date_range))
            .route(
                "/demographics/stats/{level}",
                web::get().to(handlers::demographic_stats),
            )
            .route("/demographics/{level}", web::get().to(handlers::demographics))
            .route("/routes/live", web::get().to(handlers::live_routes))
            .route("/routes/cached", web::get().to(handlers::live_routes))
            .route("/routes/refresh", web::post().to(handlers::refresh_routes))
            .route("/reload-data", web::post().to(handlers::reload_data)),
    );
}

/// Starts the transit map API server.
///
/// Loads both tables (a table that fails to load is left absent and its
/// endpoints answer 503), then serves until shut down. The caller provides
/// the runtime and the logger.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the scraper cannot be built, the
/// generated map directory cannot be created, or the HTTP server fails to
/// bind.
#[allow(clippy::future_not_send)]
pub async fn run_server(config: ServerConfig, paths: DataPaths) -> std::io::Result<()> {
    let provider = ProviderConfig::baku().map_err(std::io::Error::other)?;
    let scraper = Scraper::new(provider).map_err(std::io::Error::other)?;

    let maps_dir = paths.generated_dir();
    ensure_dir(&maps_dir)?;

    log::info!("Loading data tables...");
    let state = web::Data::new(AppState::new(paths, scraper));
    state.reload();

    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
            .service(Files::new("/maps", &maps_dir).index_file("index.html"))
    })
    .bind((config.bind_addr, config.port))?
    .run()
    .await
}
