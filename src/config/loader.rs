use std::{fs, path::Path, time::Duration};

use serde::Deserialize;

use crate::error::{AppError, Context, Result};

use super::{validator, Config};

pub const ENV_ENDPOINT: &str = "GEO_SHEETS_ENDPOINT";
pub const ENV_USER_AGENT: &str = "GEO_SHEETS_USER_AGENT";
pub const ENV_COMPAT_MAJOR: &str = "GEO_SHEETS_COMPAT_MAJOR";

/// Build the effective configuration: builtin defaults, then the optional JSON
/// file, then environment overrides. The result is validated before returning.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = Config::builtin();

    if let Some(path) = path {
        let raw = read_raw_config(path)?;
        raw.merge_into(&mut config);
    }

    apply_overrides(&mut config, |name| std::env::var(name).ok())?;
    validator::validate_config(&config)?;

    Ok(config)
}

/// Apply `GEO_SHEETS_*` overrides using `lookup` to resolve variable names.
pub fn apply_overrides<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(endpoint) = lookup(ENV_ENDPOINT) {
        config.geocoder.endpoint = endpoint;
    }
    if let Some(agent) = lookup(ENV_USER_AGENT) {
        config.geocoder.user_agent = agent;
    }
    if let Some(major) = lookup(ENV_COMPAT_MAJOR) {
        config.compat.runtime_major = major.trim().parse().map_err(|_| {
            AppError::message(format!(
                "{ENV_COMPAT_MAJOR} must be an unsigned integer, found `{major}`"
            ))
        })?;
    }
    Ok(())
}

fn read_raw_config(path: &Path) -> Result<RawConfig> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read config JSON at {}", path.display()))?;

    let raw = serde_json::from_str(&json)
        .with_context(|| format!("failed to parse config JSON at {}", path.display()))?;

    Ok(raw)
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    geocoder: RawGeocoderConfig,
    #[serde(default)]
    compat: RawCompatConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawGeocoderConfig {
    endpoint: Option<String>,
    format: Option<String>,
    limit: Option<u32>,
    cooldown_ms: Option<u64>,
    cache_capacity: Option<usize>,
    user_agent: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCompatConfig {
    runtime_major: Option<u32>,
}

impl RawConfig {
    fn merge_into(self, config: &mut Config) {
        let geocoder = &mut config.geocoder;
        let raw = self.geocoder;

        if let Some(endpoint) = raw.endpoint {
            geocoder.endpoint = endpoint;
        }
        if let Some(format) = raw.format {
            geocoder.default_format = format;
        }
        if let Some(limit) = raw.limit {
            geocoder.default_limit = limit;
        }
        if let Some(ms) = raw.cooldown_ms {
            geocoder.cooldown = Duration::from_millis(ms);
        }
        if let Some(capacity) = raw.cache_capacity {
            geocoder.cache_capacity = capacity;
        }
        if let Some(agent) = raw.user_agent {
            geocoder.user_agent = agent;
        }
        if let Some(major) = self.compat.runtime_major {
            config.compat.runtime_major = major;
        }
    }
}
