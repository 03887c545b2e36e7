use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Proxy, StatusCode};
use serde_json::Value;
use url::Url;

use crate::compat::charset::{self, Charset};
use crate::compat::{self, Bindings};
use crate::config::GeocoderConfig;
use crate::error::{Context, Result};

/// Raw upstream answer, before any status handling.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
    /// Charset declared by the `Content-Type` header, if any.
    pub charset: Option<Charset>,
}

impl TransportResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
            charset: None,
        }
    }

    /// Body text in the declared charset, or the detected one when undeclared.
    pub fn text(&self) -> String {
        let charset = self
            .charset
            .unwrap_or_else(|| compat::bindings().charset_detector.detect(&self.body));
        charset::decode(charset, &self.body)
    }

    pub fn json(&self) -> Result<Value> {
        Ok((compat::bindings().decode_json)(&self.text())?)
    }
}

/// Network seam of the geocoder: one GET with the given query pairs.
pub trait Transport {
    fn get(&self, endpoint: &str, pairs: &[(String, String)]) -> Result<TransportResponse>;
}

/// Blocking reqwest transport. Proxies come from the environment through the
/// compat table instead of reqwest's own lookup.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    bindings: &'static Bindings,
}

impl HttpTransport {
    pub fn new(config: &GeocoderConfig) -> Result<Self> {
        Self::with_bindings(config, compat::bindings())
    }

    pub fn with_bindings(config: &GeocoderConfig, bindings: &'static Bindings) -> Result<Self> {
        Self::with_environment(config, bindings, &Bindings::environment())
    }

    /// Like [`HttpTransport::with_bindings`], reading proxy settings from `env`
    /// instead of the process environment.
    pub fn with_environment(
        config: &GeocoderConfig,
        bindings: &'static Bindings,
        env: &[(String, String)],
    ) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint)?;

        let mut builder = Client::builder()
            .user_agent(config.user_agent.clone())
            .cookie_provider((bindings.cookie_jar)())
            .no_proxy();
        if let Some(proxy) = resolve_proxy(&endpoint, bindings, env)? {
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .context("Failed to construct blocking HTTP client")?;

        Ok(Self { client, bindings })
    }
}

impl Transport for HttpTransport {
    fn get(&self, endpoint: &str, pairs: &[(String, String)]) -> Result<TransportResponse> {
        let mut url = Url::parse(endpoint)?;
        url.set_query(Some(&(self.bindings.urlencode)(pairs)));

        log::debug!("GET {url}");
        let response = self
            .client
            .get(url.as_str())
            .send()
            .with_context(|| format!("Request to {} failed", url.host_str().unwrap_or("?")))?;

        let status = response.status();
        let charset = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(charset_from_content_type);
        let body = response
            .bytes()
            .context("Failed to read response body")?
            .to_vec();

        Ok(TransportResponse {
            status,
            body,
            charset,
        })
    }
}

fn resolve_proxy(
    endpoint: &Url,
    bindings: &Bindings,
    env: &[(String, String)],
) -> Result<Option<Proxy>> {
    let proxies = (bindings.getproxies_environment)(env);
    if proxies.is_empty() {
        return Ok(None);
    }

    let host = match (endpoint.host_str(), endpoint.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => return Ok(None),
    };

    if (bindings.proxy_bypass_environment)(&host, &proxies) {
        log::debug!("{host} matches no_proxy, connecting directly");
        return Ok(None);
    }

    let Some(proxy_url) = proxies
        .get(endpoint.scheme())
        .or_else(|| proxies.get("all"))
    else {
        return Ok(None);
    };

    let proxy = Proxy::all(proxy_url.as_str())
        .with_context(|| format!("Invalid proxy URL for {}: {}", endpoint.scheme(), proxy_url))?;
    log::info!("Using proxy {proxy_url} for {host}");
    Ok(Some(proxy))
}

fn charset_from_content_type(content_type: &str) -> Option<Charset> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if name.trim().eq_ignore_ascii_case("charset") {
            charset::charset_for_label(value)
        } else {
            None
        }
    })
}
