use std::collections::BTreeMap;

/// Scheme (lowercase, `no` for the bypass list) to proxy URL.
pub type ProxyMap = BTreeMap<String, String>;

const SUFFIX: &str = "_proxy";

fn scheme_of(lowercase_name: &str) -> Option<&str> {
    lowercase_name.strip_suffix(SUFFIX)
}

/// Every `<scheme>_proxy` variable regardless of case; later entries win.
pub fn getproxies_legacy(env: &[(String, String)]) -> ProxyMap {
    let mut proxies = ProxyMap::new();
    for (name, value) in env {
        let name = name.to_lowercase();
        if value.is_empty() {
            continue;
        }
        if let Some(scheme) = scheme_of(&name) {
            proxies.insert(scheme.to_string(), value.clone());
        }
    }
    proxies
}

/// Lowercase variables take precedence over uppercase ones, an empty lowercase
/// variable unsets the scheme, and `HTTP_PROXY` is ignored under CGI
/// (`REQUEST_METHOD` present) since a client can inject it as a header.
pub fn getproxies_modern(env: &[(String, String)]) -> ProxyMap {
    let mut proxies = getproxies_legacy(env);

    if env.iter().any(|(name, _)| name == "REQUEST_METHOD") {
        proxies.remove("http");
    }

    for (name, value) in env {
        if !name.ends_with(SUFFIX) {
            continue;
        }
        let name = name.to_lowercase();
        let Some(scheme) = scheme_of(&name) else {
            continue;
        };
        if value.is_empty() {
            proxies.remove(scheme);
        } else {
            proxies.insert(scheme.to_string(), value.clone());
        }
    }
    proxies
}

/// Strip a trailing `:<digits>` port.
fn split_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        Some((hostonly, port)) if port.bytes().all(|b| b.is_ascii_digit()) => hostonly,
        _ => host,
    }
}

fn no_proxy_entries(proxies: &ProxyMap) -> Option<&str> {
    proxies.get("no").map(String::as_str)
}

/// Each entry is matched as `(.+\.)?<entry>$`, case-insensitively, against the
/// host with and without its port: the host itself or any of its subdomains.
/// A leading dot in an entry is kept literally, so `.example.org` matches nothing
/// but hosts with an empty label.
pub fn proxy_bypass_legacy(host: &str, proxies: &ProxyMap) -> bool {
    let Some(no_proxy) = no_proxy_entries(proxies) else {
        return false;
    };
    if no_proxy == "*" {
        return true;
    }

    let host = host.to_lowercase();
    let hostonly = split_port(&host);

    let matches = |candidate: &str, name: &str| {
        candidate == name
            || (candidate.len() > name.len() + 1
                && candidate.ends_with(name)
                && candidate[..candidate.len() - name.len()].ends_with('.'))
    };

    no_proxy
        .split(',')
        .map(|entry| entry.trim().to_lowercase())
        .filter(|entry| !entry.is_empty())
        .any(|name| matches(hostonly, &name) || matches(&host, &name))
}

/// Entries are trimmed, leading dots dropped, then matched against the exact
/// host or a dot-bounded suffix. `*` bypasses everything.
pub fn proxy_bypass_modern(host: &str, proxies: &ProxyMap) -> bool {
    let Some(no_proxy) = no_proxy_entries(proxies) else {
        return false;
    };
    if no_proxy == "*" {
        return true;
    }

    let host = host.to_lowercase();
    let hostonly = split_port(&host);

    for entry in no_proxy.split(',') {
        let name = entry.trim().trim_start_matches('.').to_lowercase();
        if name.is_empty() {
            continue;
        }
        if hostonly == name || host == name {
            return true;
        }
        let dotted = format!(".{name}");
        if hostonly.ends_with(&dotted) || host.ends_with(&dotted) {
            return true;
        }
    }
    false
}
