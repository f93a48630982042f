//! HTTP handler functions for the transit map API.

use std::sync::Arc;

use actix_web::{HttpResponse, web};
use transit_map_ridership::{Page, RidershipTable};
use transit_map_scraper::ScrapeError;
use transit_map_scraper::progress::null_progress;
use transit_map_server_models::{
    AnalyticsQuery, ApiError, ApiHealth, HourlyTrendQuery, RefreshResponse, RegistrationsQuery,
    VolumeQuery,
};
use transit_map_zones::ZoneTable;
use transit_map_zones_models::RegionLevel;

use crate::AppState;

const LIVE_CACHE_HINT: &str = "CSV files not found. Click 'Refresh Live Data'";

/// `GET /health`
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        status: "healthy".to_string(),
        bus_data_loaded: state.ridership().is_some(),
        geo_data_loaded: state.zones().is_some(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/bus/registrations`
///
/// One page of check-in rows matching the route, operator and date filters.
pub async fn registrations(
    state: web::Data<AppState>,
    params: web::Query<RegistrationsQuery>,
) -> HttpResponse {
    let table = match ridership(&state) {
        Ok(table) => table,
        Err(response) => return response,
    };

    let filter = match params.filter() {
        Ok(filter) => filter,
        Err(e) => return bad_request(e),
    };
    let page = match Page::new(params.limit, params.offset) {
        Ok(page) => page,
        Err(e) => return bad_request(e),
    };

    HttpResponse::Ok().json(table.list(&filter, page))
}

/// `GET /api/bus/stats`
pub async fn stats(state: web::Data<AppState>) -> HttpResponse {
    match ridership(&state) {
        Ok(table) => HttpResponse::Ok().json(table.stats()),
        Err(response) => response,
    }
}

/// `GET /api/bus/analytics`
///
/// KPIs, breakdowns, top/bottom routes and dropdown values for the
/// dashboard, over the filtered rows.
pub async fn analytics(
    state: web::Data<AppState>,
    params: web::Query<AnalyticsQuery>,
) -> HttpResponse {
    let table = match ridership(&state) {
        Ok(table) => table,
        Err(response) => return response,
    };

    match params.filter() {
        Ok(filter) => HttpResponse::Ok().json(table.analytics(&filter)),
        Err(e) => bad_request(e),
    }
}

/// `GET /api/bus/routes`
pub async fn routes(state: web::Data<AppState>) -> HttpResponse {
    match ridership(&state) {
        Ok(table) => HttpResponse::Ok().json(table.top_routes()),
        Err(response) => response,
    }
}

/// `GET /api/bus/operators`
pub async fn operators(state: web::Data<AppState>) -> HttpResponse {
    match ridership(&state) {
        Ok(table) => HttpResponse::Ok().json(table.operators()),
        Err(response) => response,
    }
}

/// `GET /api/bus/volume`
pub async fn volume(state: web::Data<AppState>, params: web::Query<VolumeQuery>) -> HttpResponse {
    match ridership(&state) {
        Ok(table) => HttpResponse::Ok().json(table.volume(params.grouping())),
        Err(response) => response,
    }
}

/// `GET /api/bus/hourly-trend`
pub async fn hourly_trend(
    state: web::Data<AppState>,
    params: web::Query<HourlyTrendQuery>,
) -> HttpResponse {
    match ridership(&state) {
        Ok(table) => HttpResponse::Ok().json(table.hourly_trend(params.route())),
        Err(response) => response,
    }
}

/// `GET /api/date-range`
pub async fn date_range(state: web::Data<AppState>) -> HttpResponse {
    match ridership(&state) {
        Ok(table) => HttpResponse::Ok().json(table.date_range()),
        Err(response) => response,
    }
}

/// `GET /api/demographics/{level}`
///
/// Zones dissolved by region level as a GeoJSON `FeatureCollection`.
pub async fn demographics(state: web::Data<AppState>, level: web::Path<String>) -> HttpResponse {
    let (table, level) = match zones_at(&state, &level) {
        Ok(found) => found,
        Err(response) => return response,
    };
    HttpResponse::Ok().json(table.feature_collection(level))
}

/// `GET /api/demographics/stats/{level}`
pub async fn demographic_stats(
    state: web::Data<AppState>,
    level: web::Path<String>,
) -> HttpResponse {
    let (table, level) = match zones_at(&state, &level) {
        Ok(found) => found,
        Err(response) => return response,
    };
    HttpResponse::Ok().json(table.stats(level))
}

/// `GET /api/routes/live` and `GET /api/routes/cached`
///
/// The scraped layers from the CSV cache.
pub async fn live_routes(state: web::Data<AppState>) -> HttpResponse {
    let cache = state.cache().clone();
    match web::block(move || cache.read_live()).await {
        Ok(Ok(live)) => HttpResponse::Ok().json(live),
        Ok(Err(e @ ScrapeError::CacheMissing { .. })) => {
            log::debug!("Live routes requested before a refresh: {e}");
            HttpResponse::NotFound().json(ApiError::new(format!("{LIVE_CACHE_HINT}. Error: {e}")))
        }
        Ok(Err(e)) => {
            log::error!("Failed to read live route cache: {e}");
            HttpResponse::InternalServerError()
                .json(ApiError::new(format!("Failed to read route cache: {e}")))
        }
        Err(e) => internal_error("read route cache", &e),
    }
}

/// `POST /api/routes/refresh`
///
/// Re-scrapes the provider and overwrites the CSV cache. Only one refresh
/// runs at a time; a concurrent request answers 409.
pub async fn refresh_routes(state: web::Data<AppState>) -> HttpResponse {
    let Ok(_guard) = state.refreshing.try_lock() else {
        return HttpResponse::Conflict().json(ApiError::new("A refresh is already running"));
    };

    log::info!("Refreshing route data...");
    let (layers, summary) = match state.scraper().scrape(&null_progress()).await {
        Ok(scraped) => scraped,
        Err(e) => return refresh_failed(&e),
    };

    let cache = state.cache().clone();
    match web::block(move || cache.write(&layers)).await {
        Ok(Ok(())) => HttpResponse::Ok().json(RefreshResponse::success(summary)),
        Ok(Err(e)) => refresh_failed(&e),
        Err(e) => internal_error("write route cache", &e),
    }
}

fn refresh_failed(e: &ScrapeError) -> HttpResponse {
    log::error!("Route refresh failed: {e}");
    HttpResponse::InternalServerError().json(ApiError::new(format!("Error: {e}")))
}

/// `POST /api/reload-data`
///
/// Reloads the ridership and zone tables from disk.
pub async fn reload_data(state: web::Data<AppState>) -> HttpResponse {
    let state = state.into_inner();
    match web::block(move || state.reload()).await {
        Ok(outcome) => {
            log::info!(
                "Reloaded data: bus={} geo={}",
                outcome.bus_data_reloaded,
                outcome.geo_data_reloaded
            );
            HttpResponse::Ok().json(outcome)
        }
        Err(e) => internal_error("reload data", &e),
    }
}

/// The ridership table, or the 503 response to send when it is absent.
fn ridership(state: &AppState) -> Result<Arc<RidershipTable>, HttpResponse> {
    state.ridership().ok_or_else(|| {
        HttpResponse::ServiceUnavailable().json(ApiError::new("Bus data not loaded"))
    })
}

/// The zone table and parsed level, or the 503/400 response to send.
fn zones_at(state: &AppState, level: &str) -> Result<(Arc<ZoneTable>, RegionLevel), HttpResponse> {
    let table = state.zones().ok_or_else(|| {
        HttpResponse::ServiceUnavailable().json(ApiError::new("Geo data not loaded"))
    })?;
    let level = level.parse::<RegionLevel>().map_err(|_| {
        bad_request(format!(
            "unknown region level '{level}': expected micro, meso or macro"
        ))
    })?;
    Ok((table, level))
}

fn bad_request(e: impl std::fmt::Display) -> HttpResponse {
    HttpResponse::BadRequest().json(ApiError::new(e.to_string()))
}

fn internal_error(action: &str, e: &impl std::fmt::Display) -> HttpResponse {
    log::error!("Failed to {action}: {e}");
    HttpResponse::InternalServerError().json(ApiError::new(format!("Failed to {action}")))
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use serde_json::Value;
    use transit_map_config::DataPaths;
    use transit_map_scraper::cache::TransitLayers;
    use transit_map_scraper::config::ProviderConfig;
    use transit_map_scraper::refresh::Scraper;

    use super::*;
    use crate::configure;

    const CSV: &str = "\
Date,Hour,Route,Total Count,By SmartCard,By QR,Number Of Busses,Operator
2024-03-01,7,10,120,100,20,4,BakuBus
2024-03-01,8,10,200,150,50,5,BakuBus
2024-03-01,8,2,90,60,30,3,Sahil
2024-03-02,7,2,60,30,30,3,Sahil
";

    const ZONES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature",
             "properties": {"MICRO": 1, "MESO": "M1", "MACRO": "Nasimi", "population": 100, "tot_jobs": 10},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]]}},
            {"type": "Feature",
             "properties": {"MICRO": 2, "MESO": "M1", "MACRO": "Nasimi", "population": 50, "tot_jobs": 5},
             "geometry": {"type": "Polygon", "coordinates": [[[1,0],[2,0],[2,1],[1,1],[1,0]]]}}
        ]
    }"#;

    fn empty_state(dir: &std::path::Path) -> AppState {
        let scraper = Scraper::new(ProviderConfig::baku().unwrap()).unwrap();
        AppState::new(DataPaths::under(dir), scraper)
    }

    fn loaded_state(dir: &std::path::Path) -> AppState {
        let zones_path = dir.join("zones.geojson");
        std::fs::write(&zones_path, ZONES).unwrap();

        empty_state(dir)
            .with_ridership(RidershipTable::from_reader(CSV.as_bytes()).unwrap())
            .with_zones(ZoneTable::load(&zones_path).unwrap())
    }

    async fn get(state: AppState, uri: &str) -> (StatusCode, Value) {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure),
        )
        .await;
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        let status = resp.status();
        let body: Value = test::read_body_json(resp).await;
        (status, body)
    }

    #[actix_web::test]
    async fn health_reports_loaded_tables() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = get(empty_state(dir.path()), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["bus_data_loaded"], false);
        assert_eq!(body["geo_data_loaded"], false);
        assert!(body["timestamp"].is_string());
    }

    #[actix_web::test]
    async fn unloaded_tables_answer_503() {
        let dir = tempfile::tempdir().unwrap();
        for uri in [
            "/api/bus/stats",
            "/api/bus/registrations",
            "/api/bus/analytics",
            "/api/date-range",
            "/api/demographics/macro",
            "/api/demographics/stats/micro",
        ] {
            let (status, body) = get(empty_state(dir.path()), uri).await;
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{uri}");
            assert!(body["error"].as_str().unwrap().contains("not loaded"), "{uri}");
        }
    }

    #[actix_web::test]
    async fn registrations_filter_and_page() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = get(
            loaded_state(dir.path()),
            "/api/bus/registrations?route=10&limit=1&offset=1",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["Total Count"], 200);
        assert_eq!(data[0]["Date"], "2024-03-01T00:00:00");
    }

    #[actix_web::test]
    async fn bad_parameters_answer_400() {
        let dir = tempfile::tempdir().unwrap();
        for uri in [
            "/api/bus/registrations?limit=10001",
            "/api/bus/registrations?start_date=soon",
            "/api/bus/registrations?offset=-1",
            "/api/bus/analytics?hour_start=morning",
            "/api/demographics/district",
            "/api/demographics/stats/district",
        ] {
            let (status, body) = get(loaded_state(dir.path()), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert!(body["error"].is_string(), "{uri}");
        }
    }

    #[actix_web::test]
    async fn analytics_applies_filters() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = get(
            loaded_state(dir.path()),
            "/api/bus/analytics?companies=Sahil&hour_start=8",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["kpis"]["total_passengers"], 90);
        assert_eq!(body["kpis"]["peak_hour"], 8);
        assert_eq!(body["dropdowns"]["companies"], serde_json::json!(["Sahil"]));
    }

    #[actix_web::test]
    async fn volume_by_operator() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = get(loaded_state(dir.path()), "/api/bus/volume?group_by=operator").await;
        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Operator"], "BakuBus");
        assert_eq!(rows[0]["Total Count"], 320);
    }

    #[actix_web::test]
    async fn date_range_spans_table() {
        let dir = tempfile::tempdir().unwrap();
        let (_, body) = get(loaded_state(dir.path()), "/api/date-range").await;
        assert_eq!(body["start"], "2024-03-01T00:00:00");
        assert_eq!(body["end"], "2024-03-02T00:00:00");
    }

    #[actix_web::test]
    async fn demographics_dissolve_by_level() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = get(loaded_state(dir.path()), "/api/demographics/MACRO").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["type"], "FeatureCollection");
        let features = body["features"].as_array().unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0]["id"], 0);
        assert_eq!(features[0]["properties"]["region_name"], "Nasimi");
        assert_eq!(features[0]["properties"]["population"], 150.0);
        assert_eq!(features[0]["properties"]["region_type"], "macro");

        let (_, stats) = get(loaded_state(dir.path()), "/api/demographics/stats/micro").await;
        assert_eq!(stats["total_zones"], 2);
        assert_eq!(stats["population"]["max"], 100.0);
    }

    #[actix_web::test]
    async fn live_routes_need_a_cache() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = get(empty_state(dir.path()), "/api/routes/live").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().starts_with(LIVE_CACHE_HINT));
    }

    #[actix_web::test]
    async fn cached_routes_are_served() {
        let dir = tempfile::tempdir().unwrap();
        let state = empty_state(dir.path());
        state.cache().write(&TransitLayers::default()).unwrap();

        let (status, body) = get(state, "/api/routes/cached").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pois"], serde_json::json!([]));
        assert_eq!(body["route_paths"], serde_json::json!({}));
    }

    #[actix_web::test]
    async fn reload_picks_up_new_files() {
        let dir = tempfile::tempdir().unwrap();
        let state = empty_state(dir.path());
        std::fs::write(&state.paths().ridership_csv, CSV).unwrap();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::post().uri("/api/reload-data").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["bus_data_reloaded"], true);
        assert_eq!(body["geo_data_reloaded"], false);

        let req = test::TestRequest::get().uri("/api/bus/stats").to_request();
        let stats: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(stats["total_records"], 4);
        assert_eq!(stats["total_passengers"], 470);
    }

    /// Serves `list` at `/bus/list`, an empty tile array and one detail;
    /// anything else answers 404.
    async fn stub_provider(list: &'static str) -> ProviderConfig {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut buf = [0_u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&buf[..n]),
                        }
                    }
                    let head = String::from_utf8_lossy(&request);
                    let target = head.split_whitespace().nth(1).unwrap_or("/").to_string();
                    let (status, body) = if target.starts_with("/featureMaps") {
                        ("200 OK", "[]")
                    } else if target.starts_with("/bus/list") && !list.is_empty() {
                        ("200 OK", list)
                    } else if target.starts_with("/bus/detail?id=1") {
                        ("200 OK", r#"{"firstPoint": "A", "lastPoint": "B", "stops": []}"#)
                    } else {
                        ("404 Not Found", "{}")
                    };
                    let response = format!(
                        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\n\
                         Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        let toml_str = format!(
            r#"
name = "Stub"
projection_zoom = 23
center = {{ lat = 40.4, lon = 49.9 }}
bounds = {{ min_lat = 40.0, max_lat = 41.0, min_lon = 49.0, max_lon = 51.0 }}

[feature_maps]
endpoint = "http://{addr}/featureMaps"
map_id = "stub"
version = "1"
pb_suffix = ""
timeout_secs = 5
tiles = {{ zoom = 12, x_min = 2615, x_max = 2615, y_min = 1544, y_max = 1544 }}

[bus]
list_url = "http://{addr}/bus/list"
detail_url = "http://{addr}/bus/detail"
timeout_secs = 5
"#
        );
        ProviderConfig::from_toml(&toml_str).unwrap()
    }

    async fn post_refresh(data: web::Data<AppState>) -> (StatusCode, Value) {
        let app = test::init_service(App::new().app_data(data).configure(configure)).await;
        let req = test::TestRequest::post().uri("/api/routes/refresh").to_request();
        let resp = test::call_service(&app, req).await;
        let status = resp.status();
        let body: Value = test::read_body_json(resp).await;
        (status, body)
    }

    #[actix_web::test]
    async fn refresh_writes_cache_and_reports_failures() {
        let dir = tempfile::tempdir().unwrap();
        let list = r#"[{"id": 1, "number": "1"}, {"id": 2, "number": "2"}]"#;
        let provider = stub_provider(list).await;
        let state = AppState::new(DataPaths::under(dir.path()), Scraper::new(provider).unwrap());
        let data = web::Data::new(state);

        let (status, body) = post_refresh(data.clone()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["message"], "Route data refreshed with failures");
        assert_eq!(body["data"]["buses"], 1);
        assert_eq!(body["data"]["failed_buses"], 1);
        assert_eq!(body["data"]["poi_fetch_failed"], false);

        let live = data.cache().read_live().unwrap();
        assert_eq!(live.buses.len(), 1);
        assert_eq!(live.buses[0].last_point, "B");
    }

    #[actix_web::test]
    async fn refresh_without_bus_list_answers_500() {
        let dir = tempfile::tempdir().unwrap();
        let provider = stub_provider("").await;
        let state = AppState::new(DataPaths::under(dir.path()), Scraper::new(provider).unwrap());
        let data = web::Data::new(state);

        let (status, body) = post_refresh(data.clone()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().starts_with("Error: "));
        assert!(!data.cache().is_populated());
    }

    #[actix_web::test]
    async fn concurrent_refresh_answers_409() {
        let dir = tempfile::tempdir().unwrap();
        let data = web::Data::new(empty_state(dir.path()));
        let _running = data.refreshing.try_lock().unwrap();

        let (status, body) = post_refresh(data.clone()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("already running"));
    }
}
