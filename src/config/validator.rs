use url::Url;

use crate::error::{AppError, Result};

use super::{CompatConfig, Config, GeocoderConfig};

/// Validate the effective configuration and surface every problem at once.
pub fn validate_config(config: &Config) -> Result<()> {
    let mut issues = Vec::new();

    validate_geocoder(&config.geocoder, &mut issues);
    validate_compat(&config.compat, &mut issues);

    if issues.is_empty() {
        Ok(())
    } else {
        Err(AppError::message(format!(
            "configuration invalid:\n  - {}",
            issues.join("\n  - ")
        )))
    }
}

fn validate_geocoder(geocoder: &GeocoderConfig, issues: &mut Vec<String>) {
    match Url::parse(&geocoder.endpoint) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => issues.push(format!(
            "geocoder endpoint must use http or https, found `{}`",
            url.scheme()
        )),
        Err(err) => issues.push(format!(
            "geocoder endpoint `{}` is not a valid URL: {err}",
            geocoder.endpoint
        )),
    }

    if geocoder.default_format.trim().is_empty() {
        issues.push("geocoder format must not be empty".to_string());
    }

    if geocoder.cache_capacity == 0 {
        issues.push("geocoder cache capacity must be greater than zero".to_string());
    }

    // Nominatim rejects anonymous clients.
    if geocoder.user_agent.trim().is_empty() {
        issues.push("geocoder user agent must not be empty".to_string());
    }
}

fn validate_compat(compat: &CompatConfig, issues: &mut Vec<String>) {
    if compat.runtime_major < 2 {
        issues.push(format!(
            "compat runtime major {} is not supported (expected 2 or later)",
            compat.runtime_major
        ));
    }
}
