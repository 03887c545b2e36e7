use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

use crate::error::Result;

/// Escaped by the legacy generation: everything but ASCII alphanumerics and `_.-`.
pub const LEGACY_ESCAPED: &AsciiSet = &NON_ALPHANUMERIC.remove(b'_').remove(b'.').remove(b'-');
/// The modern generation follows RFC 3986 and leaves `~` alone as well.
pub const MODERN_ESCAPED: &AsciiSet = &LEGACY_ESCAPED.remove(b'~');

fn quote_with(text: &str, safe: &str, escaped: &AsciiSet) -> String {
    // `_` is never escaped, so removing it again only copies the set.
    let set = safe
        .bytes()
        .filter(u8::is_ascii)
        .fold(escaped.remove(b'_'), |set, byte| set.remove(byte));
    // `utf8_percent_encode` requires a `&'static AsciiSet`.
    let set: &'static AsciiSet = Box::leak(Box::new(set));
    utf8_percent_encode(text, set).to_string()
}

fn quote_plus_with(text: &str, escaped: &AsciiSet) -> String {
    if text.contains(' ') {
        quote_with(text, " ", escaped).replace(' ', "+")
    } else {
        quote_with(text, "", escaped)
    }
}

fn urlencode_with(pairs: &[(String, String)], escaped: &AsciiSet) -> String {
    pairs
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                quote_plus_with(key, escaped),
                quote_plus_with(value, escaped)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

pub fn quote_legacy(text: &str, safe: &str) -> String {
    quote_with(text, safe, LEGACY_ESCAPED)
}

pub fn quote_modern(text: &str, safe: &str) -> String {
    quote_with(text, safe, MODERN_ESCAPED)
}

pub fn quote_plus_legacy(text: &str) -> String {
    quote_plus_with(text, LEGACY_ESCAPED)
}

pub fn quote_plus_modern(text: &str) -> String {
    quote_plus_with(text, MODERN_ESCAPED)
}

pub fn urlencode_legacy(pairs: &[(String, String)]) -> String {
    urlencode_with(pairs, LEGACY_ESCAPED)
}

pub fn urlencode_modern(pairs: &[(String, String)]) -> String {
    urlencode_with(pairs, MODERN_ESCAPED)
}

/// Malformed escapes are kept verbatim, invalid UTF-8 becomes U+FFFD.
pub fn unquote(text: &str) -> String {
    percent_decode_str(text).decode_utf8_lossy().into_owned()
}

pub fn unquote_plus(text: &str) -> String {
    unquote(&text.replace('+', " "))
}

pub fn urljoin(base: &str, reference: &str) -> Result<String> {
    let joined = Url::parse(base)?.join(reference)?;
    Ok(joined.into())
}

/// Split `url` into the part before `#` and the fragment (empty when absent).
pub fn urldefrag(url: &str) -> (String, String) {
    match url.split_once('#') {
        Some((head, fragment)) => (head.to_string(), fragment.to_string()),
        None => (url.to_string(), String::new()),
    }
}

/// Components of a URL. `params` is the `;`-suffix of the last path segment
/// and stays empty for [`urlsplit`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlParts {
    pub scheme: String,
    pub netloc: String,
    pub path: String,
    pub params: String,
    pub query: String,
    pub fragment: String,
}

/// Split an absolute URL into scheme, netloc, path, query and fragment. The
/// URL is normalized on the way (lowercase host, default port dropped, `/` path
/// for hierarchical URLs).
pub fn urlsplit(url: &str) -> Result<UrlParts> {
    let parsed = Url::parse(url)?;
    Ok(UrlParts {
        scheme: parsed.scheme().to_string(),
        netloc: netloc(&parsed),
        path: parsed.path().to_string(),
        params: String::new(),
        query: parsed.query().unwrap_or_default().to_string(),
        fragment: parsed.fragment().unwrap_or_default().to_string(),
    })
}

/// Like [`urlsplit`], with `;params` of the last path segment split off.
pub fn urlparse(url: &str) -> Result<UrlParts> {
    let mut parts = urlsplit(url)?;
    let (path, params) = split_params(&parts.path);
    let (path, params) = (path.to_string(), params.to_string());
    parts.path = path;
    parts.params = params;
    Ok(parts)
}

const USES_NETLOC: &[&str] = &[
    "", "ftp", "http", "https", "file", "ws", "wss", "sftp", "git", "git+ssh", "svn",
    "svn+ssh", "rsync", "nfs", "telnet", "imap", "rtsp",
];

/// Put [`urlparse`] output back together.
pub fn urlunparse(parts: &UrlParts) -> String {
    let mut url = parts.path.clone();
    if !parts.params.is_empty() {
        url = format!("{url};{}", parts.params);
    }

    let wants_netloc = !parts.scheme.is_empty()
        && USES_NETLOC.contains(&parts.scheme.as_str())
        && !url.starts_with("//");
    if !parts.netloc.is_empty() || wants_netloc {
        if !url.is_empty() && !url.starts_with('/') {
            url.insert(0, '/');
        }
        url = format!("//{}{url}", parts.netloc);
    }
    if !parts.scheme.is_empty() {
        url = format!("{}:{url}", parts.scheme);
    }
    if !parts.query.is_empty() {
        url.push('?');
        url.push_str(&parts.query);
    }
    if !parts.fragment.is_empty() {
        url.push('#');
        url.push_str(&parts.fragment);
    }
    url
}

fn netloc(url: &Url) -> String {
    let mut netloc = String::new();
    if !url.username().is_empty() || url.password().is_some() {
        netloc.push_str(url.username());
        if let Some(password) = url.password() {
            netloc.push(':');
            netloc.push_str(password);
        }
        netloc.push('@');
    }
    if let Some(host) = url.host_str() {
        netloc.push_str(host);
    }
    if let Some(port) = url.port() {
        netloc.push(':');
        netloc.push_str(&port.to_string());
    }
    netloc
}

fn split_params(path: &str) -> (&str, &str) {
    let last_segment = path.rfind('/').unwrap_or(0);
    match path[last_segment..].find(';') {
        Some(offset) => {
            let at = last_segment + offset;
            (&path[..at], &path[at + 1..])
        }
        None => (path, ""),
    }
}

/// Split a comma-separated header list, keeping commas inside quoted strings.
/// A backslash inside quotes escapes the next character and is dropped.
pub fn parse_http_list(header: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut part = String::new();
    let mut escape = false;
    let mut quoted = false;

    for c in header.chars() {
        if escape {
            part.push(c);
            escape = false;
            continue;
        }
        if quoted {
            match c {
                '\\' => {
                    escape = true;
                    continue;
                }
                '"' => quoted = false,
                _ => {}
            }
            part.push(c);
            continue;
        }
        match c {
            ',' => items.push(std::mem::take(&mut part)),
            '"' => {
                quoted = true;
                part.push(c);
            }
            _ => part.push(c),
        }
    }
    if !part.is_empty() {
        items.push(part);
    }

    items.into_iter().map(|item| item.trim().to_string()).collect()
}
