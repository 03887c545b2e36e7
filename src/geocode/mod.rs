//! Cached thin wrapper around the Nominatim search API.
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/#parameters> for
//! the parameters accepted upstream.

use std::sync::{Mutex, OnceLock};
use std::thread;
use std::time::Duration;

use serde_json::Value;

use crate::cache::LruCache;
use crate::config::GeocoderConfig;
use crate::error::{AppError, Result};

pub mod query;
pub mod transport;

pub use query::SearchQuery;
pub use transport::{HttpTransport, Transport, TransportResponse};

/// Nominatim search with a bounded result cache and a cool-down after every
/// upstream call. Concurrent callers must share it behind a lock; identical
/// queries racing before the first one lands are both sent upstream.
#[derive(Debug)]
pub struct Geocoder<T> {
    config: GeocoderConfig,
    transport: T,
    cache: LruCache<SearchQuery, Value>,
}

impl Geocoder<HttpTransport> {
    pub fn from_config(config: GeocoderConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::new(config, transport))
    }
}

impl<T: Transport> Geocoder<T> {
    pub fn new(config: GeocoderConfig, transport: T) -> Self {
        let cache = LruCache::new(config.cache_capacity);
        Self {
            config,
            transport,
            cache,
        }
    }

    /// A query for `address` carrying this geocoder's default format and limit.
    pub fn query(&self, address: impl Into<String>) -> SearchQuery {
        SearchQuery::with_defaults(address, &self.config)
    }

    /// Run `query`, answering from the cache when the same query was seen before.
    ///
    /// A non-success status fails with [`AppError::Http`] and is not cached. A
    /// successful call sleeps for the configured cool-down before the body is
    /// decoded and cached.
    pub fn search(&mut self, query: &SearchQuery) -> Result<Value> {
        if let Some(hit) = self.cache.get(query) {
            log::debug!("cache hit for `{}`", query.address());
            return Ok(hit.clone());
        }

        log::info!("searching Nominatim for `{}`", query.address());
        let response = self
            .transport
            .get(&self.config.endpoint, &query.query_pairs())?;

        if !response.status.is_success() {
            return Err(AppError::Http {
                status: response.status,
                body: response.text(),
            });
        }

        cooldown(self.config.cooldown);

        let value = response.json()?;
        self.cache.insert(query.clone(), value.clone());
        Ok(value)
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

fn cooldown(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}

/// Address to coordinates lookup used by callers that only need a point.
pub trait GeocodingGateway {
    fn resolve_lat_lng(&mut self, address: &str) -> Result<Option<(f64, f64)>>;
}

impl<T: Transport> GeocodingGateway for Geocoder<T> {
    fn resolve_lat_lng(&mut self, address: &str) -> Result<Option<(f64, f64)>> {
        let query = self.query(address);
        let results = self.search(&query)?;
        Ok(results
            .as_array()
            .and_then(|places| places.first())
            .and_then(|place| Some((coordinate(place, "lat")?, coordinate(place, "lon")?))))
    }
}

// Nominatim sends coordinates as strings.
fn coordinate(place: &Value, key: &str) -> Option<f64> {
    match place.get(key)? {
        Value::String(text) => text.trim().parse().ok(),
        Value::Number(number) => number.as_f64(),
        _ => None,
    }
}

static SHARED_GEOCODER: OnceLock<Mutex<Geocoder<HttpTransport>>> = OnceLock::new();

/// Make `geocoder` the one behind [`nominatim_search`]. Fails once a shared
/// geocoder exists, including the builtin one created by an earlier search.
pub fn install_shared_geocoder(geocoder: Geocoder<HttpTransport>) -> Result<()> {
    SHARED_GEOCODER
        .set(Mutex::new(geocoder))
        .map_err(|_| AppError::message("Shared geocoder is already initialised"))
}

fn shared_geocoder() -> Result<&'static Mutex<Geocoder<HttpTransport>>> {
    if let Some(geocoder) = SHARED_GEOCODER.get() {
        return Ok(geocoder);
    }
    let geocoder = Geocoder::from_config(GeocoderConfig::default())?;
    Ok(SHARED_GEOCODER.get_or_init(|| Mutex::new(geocoder)))
}

/// Process-wide search sharing one cache. Uses builtin defaults unless a
/// geocoder was installed with [`install_shared_geocoder`].
pub fn nominatim_search(query: &SearchQuery) -> Result<Value> {
    let mut geocoder = shared_geocoder()?
        .lock()
        .map_err(|_| AppError::message("Failed to lock shared geocoder"))?;
    geocoder.search(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use std::cell::RefCell;
    use std::time::Instant;

    /// Replays canned responses and records every request it sees.
    #[derive(Default)]
    struct ScriptedTransport {
        responses: RefCell<Vec<TransportResponse>>,
        seen: RefCell<Vec<Vec<(String, String)>>>,
    }

    impl ScriptedTransport {
        fn replying(responses: Vec<TransportResponse>) -> Self {
            Self {
                responses: RefCell::new(responses),
                seen: RefCell::default(),
            }
        }

        fn calls(&self) -> usize {
            self.seen.borrow().len()
        }
    }

    impl Transport for ScriptedTransport {
        fn get(&self, _endpoint: &str, pairs: &[(String, String)]) -> Result<TransportResponse> {
            self.seen.borrow_mut().push(pairs.to_vec());
            let mut responses = self.responses.borrow_mut();
            if responses.is_empty() {
                return Err(AppError::message("no scripted response left"));
            }
            Ok(responses.remove(0))
        }
    }

    fn ok(body: &str) -> TransportResponse {
        TransportResponse::new(StatusCode::OK, body.as_bytes().to_vec())
    }

    fn quick_config() -> GeocoderConfig {
        GeocoderConfig {
            cooldown: Duration::ZERO,
            ..GeocoderConfig::default()
        }
    }

    #[test]
    fn sends_merged_query_pairs() {
        let transport = ScriptedTransport::replying(vec![ok("[]")]);
        let mut geocoder = Geocoder::new(quick_config(), transport);

        let query = geocoder.query("Alexanderplatz").param("countrycodes", "de");
        geocoder.search(&query).unwrap();

        let seen = geocoder.transport().seen.borrow();
        assert_eq!(seen[0], query.query_pairs());
    }

    #[test]
    fn failed_status_is_not_cached() {
        let transport = ScriptedTransport::replying(vec![
            TransportResponse::new(StatusCode::TOO_MANY_REQUESTS, b"slow down".to_vec()),
            ok(r#"[{"lat":"1","lon":"2"}]"#),
        ]);
        let mut geocoder = Geocoder::new(quick_config(), transport);
        let query = geocoder.query("Somewhere");

        let err = geocoder.search(&query).expect_err("429 must fail");
        assert_eq!(err.http_status(), Some(StatusCode::TOO_MANY_REQUESTS));
        assert!(err.to_string().contains("slow down"));
        assert_eq!(geocoder.cached_len(), 0);

        geocoder.search(&query).expect("second attempt succeeds");
        assert_eq!(geocoder.transport().calls(), 2);
    }

    #[test]
    fn cooldown_applies_to_network_calls_only() {
        let config = GeocoderConfig {
            cooldown: Duration::from_millis(60),
            ..GeocoderConfig::default()
        };
        let mut geocoder = Geocoder::new(config, ScriptedTransport::replying(vec![ok("[]")]));
        let query = geocoder.query("Lisbon");

        let started = Instant::now();
        geocoder.search(&query).unwrap();
        assert!(started.elapsed() >= Duration::from_millis(60));

        let started = Instant::now();
        geocoder.search(&query).unwrap();
        assert!(started.elapsed() < Duration::from_millis(60));
    }

    #[test]
    fn invalid_json_propagates() {
        let transport = ScriptedTransport::replying(vec![ok("<html>")]);
        let mut geocoder = Geocoder::new(quick_config(), transport);
        let query = geocoder.query("Oslo");

        let err = geocoder.search(&query).expect_err("html is not json");
        assert!(matches!(err, AppError::Json(_)));
        assert_eq!(geocoder.cached_len(), 0);
    }

    #[test]
    fn resolves_first_result_coordinates() {
        let body = r#"[{"lat":"52.5170365","lon":"13.3888599"},{"lat":"0","lon":"0"}]"#;
        let transport = ScriptedTransport::replying(vec![ok(body), ok("[]")]);
        let mut geocoder = Geocoder::new(quick_config(), transport);

        let point = geocoder.resolve_lat_lng("Berlin").unwrap().expect("point");
        assert!((point.0 - 52.517_036_5).abs() < 1e-9);
        assert!((point.1 - 13.388_859_9).abs() < 1e-9);

        assert_eq!(geocoder.resolve_lat_lng("Nowhere").unwrap(), None);
    }

    #[test]
    fn clear_cache_forces_refetch() {
        let mut geocoder = Geocoder::new(
            quick_config(),
            ScriptedTransport::replying(vec![ok("[1]"), ok("[2]")]),
        );
        let query = geocoder.query("Vienna");

        assert_eq!(geocoder.search(&query).unwrap(), serde_json::json!([1]));
        geocoder.clear_cache();
        assert_eq!(geocoder.search(&query).unwrap(), serde_json::json!([2]));
    }
}
