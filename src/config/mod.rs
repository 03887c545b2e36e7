use std::time::Duration;

use crate::cache::DEFAULT_CACHE_CAPACITY;

pub mod loader;
pub mod validator;

pub use loader::{apply_overrides, load_config};

pub const NOMINATIM_SEARCH_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";
pub const DEFAULT_FORMAT: &str = "json";
pub const DEFAULT_LIMIT: u32 = 1;
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(1);
pub const DEFAULT_RUNTIME_MAJOR: u32 = 3;

/// Settings for the Nominatim search wrapper.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocoderConfig {
    pub endpoint: String,
    pub default_format: String,
    pub default_limit: u32,
    /// Pause after every upstream call; cache hits skip it.
    pub cooldown: Duration,
    pub cache_capacity: usize,
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompatConfig {
    pub runtime_major: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub geocoder: GeocoderConfig,
    pub compat: CompatConfig,
}

impl Config {
    pub fn builtin() -> Self {
        Self {
            geocoder: GeocoderConfig::default(),
            compat: CompatConfig {
                runtime_major: DEFAULT_RUNTIME_MAJOR,
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            endpoint: NOMINATIM_SEARCH_ENDPOINT.to_string(),
            default_format: DEFAULT_FORMAT.to_string(),
            default_limit: DEFAULT_LIMIT,
            cooldown: DEFAULT_COOLDOWN,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        }
    }
}
