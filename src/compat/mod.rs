//! Static resolution table for the URL, proxy, charset and JSON helpers.
//!
//! Two fixed sets of bindings exist, one per [`Generation`]. The table is picked
//! once, from a configured runtime major version, and call sites read it through
//! [`bindings`] instead of branching on the generation themselves.

use std::sync::{Arc, OnceLock};

use reqwest::cookie::Jar;
use serde_json::Value;

use crate::error::{AppError, Result};

pub mod charset;
pub mod cookies;
pub mod proxies;
pub mod urls;

pub use charset::{Charset, CharsetDetector};
pub use proxies::ProxyMap;
pub use urls::UrlParts;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generation {
    Legacy,
    Modern,
}

impl Generation {
    /// Major `2` is the legacy generation, `3` and later the modern one.
    pub fn from_major(major: u32) -> Result<Self> {
        match major {
            2 => Ok(Generation::Legacy),
            m if m >= 3 => Ok(Generation::Modern),
            other => Err(AppError::UnsupportedRuntime(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonBackend {
    /// Numbers keep their exact textual value.
    ArbitraryPrecision,
    Standard,
}

const PREFERRED_JSON_BACKEND: Option<JsonBackend> = if cfg!(feature = "json-arbitrary-precision") {
    Some(JsonBackend::ArbitraryPrecision)
} else {
    None
};

#[cfg(feature = "charset-sniffing")]
const PREFERRED_CHARSET_DETECTOR: Option<CharsetDetector> = Some(CharsetDetector::Sniffing);
#[cfg(not(feature = "charset-sniffing"))]
const PREFERRED_CHARSET_DETECTOR: Option<CharsetDetector> = None;

const fn json_backend_or(preferred: Option<JsonBackend>, fallback: JsonBackend) -> JsonBackend {
    match preferred {
        Some(backend) => backend,
        None => fallback,
    }
}

const fn charset_detector_or(
    preferred: Option<CharsetDetector>,
    fallback: CharsetDetector,
) -> CharsetDetector {
    match preferred {
        Some(detector) => detector,
        None => fallback,
    }
}

pub const JSON_BACKEND: JsonBackend =
    json_backend_or(PREFERRED_JSON_BACKEND, JsonBackend::Standard);
pub const CHARSET_DETECTOR: CharsetDetector =
    charset_detector_or(PREFERRED_CHARSET_DETECTOR, CharsetDetector::Plain);

fn decode_json(text: &str) -> serde_json::Result<Value> {
    serde_json::from_str(text)
}

/// One generation's worth of helpers. Both tables expose the same names.
#[derive(Debug)]
pub struct Bindings {
    pub generation: Generation,
    pub quote: fn(&str, &str) -> String,
    pub quote_plus: fn(&str) -> String,
    pub unquote: fn(&str) -> String,
    pub unquote_plus: fn(&str) -> String,
    pub urlencode: fn(&[(String, String)]) -> String,
    pub urljoin: fn(&str, &str) -> Result<String>,
    pub urldefrag: fn(&str) -> (String, String),
    pub urlparse: fn(&str) -> Result<UrlParts>,
    pub urlsplit: fn(&str) -> Result<UrlParts>,
    pub urlunparse: fn(&UrlParts) -> String,
    pub parse_http_list: fn(&str) -> Vec<String>,
    pub getproxies_environment: fn(&[(String, String)]) -> ProxyMap,
    pub proxy_bypass_environment: fn(&str, &ProxyMap) -> bool,
    pub json_backend: JsonBackend,
    pub decode_json: fn(&str) -> serde_json::Result<Value>,
    pub charset_detector: CharsetDetector,
    pub cookie_jar: fn() -> Arc<Jar>,
}

pub static LEGACY: Bindings = Bindings {
    generation: Generation::Legacy,
    quote: urls::quote_legacy,
    quote_plus: urls::quote_plus_legacy,
    unquote: urls::unquote,
    unquote_plus: urls::unquote_plus,
    urlencode: urls::urlencode_legacy,
    urljoin: urls::urljoin,
    urldefrag: urls::urldefrag,
    urlparse: urls::urlparse,
    urlsplit: urls::urlsplit,
    urlunparse: urls::urlunparse,
    parse_http_list: urls::parse_http_list,
    getproxies_environment: proxies::getproxies_legacy,
    proxy_bypass_environment: proxies::proxy_bypass_legacy,
    json_backend: JSON_BACKEND,
    decode_json,
    charset_detector: CHARSET_DETECTOR,
    cookie_jar: cookies::cookie_jar,
};

pub static MODERN: Bindings = Bindings {
    generation: Generation::Modern,
    quote: urls::quote_modern,
    quote_plus: urls::quote_plus_modern,
    unquote: urls::unquote,
    unquote_plus: urls::unquote_plus,
    urlencode: urls::urlencode_modern,
    urljoin: urls::urljoin,
    urldefrag: urls::urldefrag,
    urlparse: urls::urlparse,
    urlsplit: urls::urlsplit,
    urlunparse: urls::urlunparse,
    parse_http_list: urls::parse_http_list,
    getproxies_environment: proxies::getproxies_modern,
    proxy_bypass_environment: proxies::proxy_bypass_modern,
    json_backend: JSON_BACKEND,
    decode_json,
    charset_detector: CHARSET_DETECTOR,
    cookie_jar: cookies::cookie_jar,
};

impl Bindings {
    pub fn for_generation(generation: Generation) -> &'static Bindings {
        match generation {
            Generation::Legacy => &LEGACY,
            Generation::Modern => &MODERN,
        }
    }

    pub fn for_major(major: u32) -> Result<&'static Bindings> {
        Generation::from_major(major).map(Self::for_generation)
    }

    /// Process environment as `(name, value)` pairs, for the proxy helpers.
    pub fn environment() -> Vec<(String, String)> {
        std::env::vars().collect()
    }
}

static ACTIVE: OnceLock<&'static Bindings> = OnceLock::new();

/// Resolve the process-wide table from `major`. Only the first call decides;
/// later calls get the already bound table back.
pub fn init(major: u32) -> Result<&'static Bindings> {
    let wanted = Bindings::for_major(major)?;
    let active = *ACTIVE.get_or_init(|| wanted);
    if active.generation != wanted.generation {
        log::warn!(
            "compat bindings already resolved to {:?}; ignoring request for {:?}",
            active.generation,
            wanted.generation
        );
    }
    Ok(active)
}

/// The process-wide table, defaulting to the modern generation when [`init`]
/// was never called.
pub fn bindings() -> &'static Bindings {
    ACTIVE.get_or_init(|| &MODERN)
}
