use std::cell::Cell;
use std::time::Duration;

use geo_sheets::compat::MODERN;
use geo_sheets::config::GeocoderConfig;
use geo_sheets::geocode::{
    Geocoder, GeocodingGateway, HttpTransport, SearchQuery, Transport, TransportResponse,
};
use geo_sheets::{AppError, Result};
use reqwest::StatusCode;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Answers every request with the query it received, counting calls.
#[derive(Default)]
struct EchoTransport {
    calls: Cell<usize>,
}

impl Transport for EchoTransport {
    fn get(&self, _endpoint: &str, pairs: &[(String, String)]) -> Result<TransportResponse> {
        self.calls.set(self.calls.get() + 1);
        let body = serde_json::to_vec(&json!([{ "query": pairs }]))?;
        Ok(TransportResponse::new(StatusCode::OK, body))
    }
}

fn config_for(endpoint: String) -> GeocoderConfig {
    GeocoderConfig {
        endpoint,
        cooldown: Duration::ZERO,
        user_agent: "geo-sheets-tests/0.1".to_string(),
        ..GeocoderConfig::default()
    }
}

fn echo_geocoder() -> Geocoder<EchoTransport> {
    Geocoder::new(
        config_for("http://unused/search".to_string()),
        EchoTransport::default(),
    )
}

fn http_geocoder(config: GeocoderConfig) -> Result<Geocoder<HttpTransport>> {
    let transport = HttpTransport::with_environment(&config, &MODERN, &[])?;
    Ok(Geocoder::new(config, transport))
}

#[test]
fn identical_arguments_skip_the_network() {
    let mut geocoder = echo_geocoder();
    let query = SearchQuery::new("Kurfürstendamm 21, Berlin").param("countrycodes", "de");

    let first = geocoder.search(&query).unwrap();
    let second = geocoder.search(&query).unwrap();

    assert_eq!(first, second);
    assert_eq!(geocoder.transport().calls.get(), 1);
}

#[test]
fn different_arguments_are_cached_separately() {
    let mut geocoder = echo_geocoder();

    geocoder.search(&SearchQuery::new("Hamburg")).unwrap();
    geocoder.search(&SearchQuery::new("Hamburg").limit(5)).unwrap();
    geocoder.search(&SearchQuery::new("Hamburg").format("geojson")).unwrap();

    assert_eq!(geocoder.transport().calls.get(), 3);
    assert_eq!(geocoder.cached_len(), 3);
}

#[test]
fn least_recently_used_entries_are_refetched_past_capacity() {
    let config = config_for("http://unused/search".to_string());
    let capacity = config.cache_capacity;
    assert_eq!(capacity, 1000);
    let mut geocoder = Geocoder::new(config, EchoTransport::default());

    for i in 0..=capacity {
        geocoder.search(&SearchQuery::new(format!("street {i}"))).unwrap();
    }
    assert_eq!(geocoder.cached_len(), capacity);
    assert_eq!(geocoder.transport().calls.get(), capacity + 1);

    // The most recent entry is still cached, the very first one was evicted.
    geocoder.search(&SearchQuery::new(format!("street {capacity}"))).unwrap();
    assert_eq!(geocoder.transport().calls.get(), capacity + 1);

    geocoder.search(&SearchQuery::new("street 0")).unwrap();
    assert_eq!(geocoder.transport().calls.get(), capacity + 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn http_search_hits_endpoint_once_per_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Unter den Linden 1, Berlin"))
        .and(query_param("format", "json"))
        .and(query_param("limit", "1"))
        .and(query_param("accept-language", "en"))
        .and(header("user-agent", "geo-sheets-tests/0.1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "lat": "52.5170365", "lon": "13.3888599" }])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(format!("{}/search", server.uri()));
    let (first, second) = tokio::task::spawn_blocking(move || {
        let mut geocoder = http_geocoder(config)?;
        let query = geocoder
            .query("Unter den Linden 1, Berlin")
            .param("accept-language", "en");
        let first = geocoder.search(&query)?;
        let second = geocoder.search(&query)?;
        Ok::<_, AppError>((first, second))
    })
    .await
    .expect("blocking task")
    .expect("search succeeds");

    assert_eq!(first, second);
    assert_eq!(first[0]["lat"], "52.5170365");
}

#[tokio::test(flavor = "multi_thread")]
async fn gateway_resolves_coordinates_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Marienplatz, München"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "lat": "48.1373932", "lon": "11.5754485" }])),
        )
        .mount(&server)
        .await;

    let config = config_for(format!("{}/search", server.uri()));
    let point = tokio::task::spawn_blocking(move || {
        let mut geocoder = http_geocoder(config)?;
        geocoder.resolve_lat_lng("Marienplatz, München")
    })
    .await
    .expect("blocking task")
    .expect("lookup succeeds")
    .expect("coordinates present");

    assert!((point.0 - 48.137_393_2).abs() < 1e-9);
    assert!((point.1 - 11.575_448_5).abs() < 1e-9);
}

#[tokio::test(flavor = "multi_thread")]
async fn non_success_status_fails_with_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .expect(2)
        .mount(&server)
        .await;

    let config = config_for(format!("{}/search", server.uri()));
    let (first, second) = tokio::task::spawn_blocking(move || {
        let mut geocoder = http_geocoder(config).expect("geocoder");
        let query = SearchQuery::new("Atlantis");
        (geocoder.search(&query), geocoder.search(&query))
    })
    .await
    .expect("blocking task");

    for result in [first, second] {
        let err = result.expect_err("503 must fail");
        assert_eq!(err.http_status(), Some(StatusCode::SERVICE_UNAVAILABLE));
        match err {
            AppError::Http { body, .. } => assert_eq!(body, "overloaded"),
            other => panic!("unexpected error {other}"),
        }
    }
}
