use std::collections::BTreeMap;

use crate::config::{GeocoderConfig, DEFAULT_FORMAT, DEFAULT_LIMIT};

/// Arguments of one search call. Doubles as the cache key, so two queries with
/// the same address, format, limit and extra parameters hit the same entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchQuery {
    address: String,
    format: String,
    limit: u32,
    extra: BTreeMap<String, String>,
}

impl SearchQuery {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            format: DEFAULT_FORMAT.to_string(),
            limit: DEFAULT_LIMIT,
            extra: BTreeMap::new(),
        }
    }

    /// Start from the configured default format and limit.
    pub fn with_defaults(address: impl Into<String>, config: &GeocoderConfig) -> Self {
        Self::new(address)
            .format(config.default_format.clone())
            .limit(config.default_limit)
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Any other Nominatim search parameter (`countrycodes`, `accept-language`, ...).
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Query string pairs in wire order: `q`, `format`, `limit`, then extras
    /// sorted by name. An extra named like one of the first three replaces its
    /// value in place instead of being sent twice.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("q".to_string(), self.address.clone()),
            ("format".to_string(), self.format.clone()),
            ("limit".to_string(), self.limit.to_string()),
        ];

        for (name, value) in &self.extra {
            match pairs.iter_mut().find(|(existing, _)| existing == name) {
                Some(slot) => slot.1 = value.clone(),
                None => pairs.push((name.clone(), value.clone())),
            }
        }

        pairs
    }
}
