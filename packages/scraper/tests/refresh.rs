//! Scrape runs against a local HTTP stand-in for the provider.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use transit_map_scraper::ScrapeError;
use transit_map_scraper::cache::CacheDir;
use transit_map_scraper::config::ProviderConfig;
use transit_map_scraper::progress::null_progress;
use transit_map_scraper::refresh::{Scraper, refresh};

const BUS_LIST: &str = r#"[{"id": 1, "number": "1"}, {"id": 2, "number": "2"}]"#;

const BUS_DETAIL: &str = r#"{
    "firstPoint": "28 May",
    "lastPoint": "Koroglu",
    "durationMinuts": 35,
    "stops": [
        {"stop": {"latitude": 40.3791, "longitude": 49.8483, "name": "28 May"}},
        {"stop": {"latitude": 40.4, "longitude": 49.9, "name": "Koroglu"}}
    ],
    "routes": [{"coordinatesList": [{"lat": 40.38, "lng": 49.85}]}]
}"#;

/// Serves canned responses keyed by request target until the test ends.
async fn serve(route: fn(&str) -> (u16, &'static str)) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
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
                let target = head.split_whitespace().nth(1).unwrap_or("/");
                let (status, body) = route(target);
                let reason = if status == 200 { "OK" } else { "Not Found" };
                let response = format!(
                    "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

fn provider(addr: SocketAddr) -> ProviderConfig {
    ProviderConfig::from_toml(&format!(
        r#"
name = "Local"
projection_zoom = 23

[center]
lat = 40.4093
lon = 49.8671

[bounds]
min_lat = 40.0
max_lat = 41.0
min_lon = 49.0
max_lon = 51.0

[feature_maps]
endpoint = "http://{addr}/featureMaps"
map_id = "local"
version = "1"
pb_suffix = ""
timeout_secs = 5

[feature_maps.tiles]
zoom = 12
x_min = 2615
x_max = 2615
y_min = 1544
y_max = 1544

[bus]
list_url = "http://{addr}/bus/list"
detail_url = "http://{addr}/bus/detail"
timeout_secs = 5
"#
    ))
    .unwrap()
}

fn partial_provider(target: &str) -> (u16, &'static str) {
    if target.starts_with("/bus/list") {
        (200, BUS_LIST)
    } else if target.starts_with("/bus/detail?id=1") {
        (200, BUS_DETAIL)
    } else {
        (404, "{}")
    }
}

fn missing_bus_list(target: &str) -> (u16, &'static str) {
    if target.starts_with("/featureMaps") {
        (200, "[]")
    } else {
        (404, "{}")
    }
}

#[tokio::test]
async fn failed_pois_and_detail_are_counted_and_skipped() {
    let addr = serve(partial_provider).await;
    let scraper = Scraper::new(provider(addr)).unwrap();

    let (layers, summary) = scraper.scrape(&null_progress()).await.unwrap();

    assert!(summary.poi_fetch_failed);
    assert_eq!(summary.failed_buses, 1);
    assert_eq!(summary.buses, 1);
    assert_eq!(summary.pois, 0);
    assert_eq!(summary.stops, 2);
    assert_eq!(summary.paths, 1);
    assert!(summary.is_partial());

    assert_eq!(layers.routes.len(), 1);
    assert_eq!(layers.routes[0].id, 1);
    assert_eq!(layers.routes[0].stops_count, 2);
}

#[tokio::test]
async fn partial_scrape_is_still_cached() {
    let addr = serve(partial_provider).await;
    let scraper = Scraper::new(provider(addr)).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let cache = CacheDir::new(dir.path());

    let summary = refresh(&scraper, &cache, &null_progress()).await.unwrap();
    assert!(summary.is_partial());

    let live = cache.read_live().unwrap();
    assert!(live.pois.is_empty());
    assert_eq!(live.buses.len(), 1);
    assert_eq!(live.stops.len(), 2);
}

#[tokio::test]
async fn missing_bus_list_fails_without_touching_cache() {
    let addr = serve(missing_bus_list).await;
    let scraper = Scraper::new(provider(addr)).unwrap();

    let result = scraper.scrape(&null_progress()).await;
    assert!(matches!(
        result,
        Err(ScrapeError::Status { status, .. }) if status.as_u16() == 404
    ));

    let dir = tempfile::tempdir().unwrap();
    let cache = CacheDir::new(dir.path());
    assert!(refresh(&scraper, &cache, &null_progress()).await.is_err());
    assert!(!cache.is_populated());
}
