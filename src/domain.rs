//! URL normalization and registrable-domain extraction.

use tracing::debug;
use url::{Host, Url};

/// Prefix `https://` unless the input already carries an http(s) scheme
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

/// Registrable domain (second-level label + public suffix) of a URL.
///
/// Subdomains, scheme, userinfo, port and path are dropped. IP literals and
/// hosts without a registrable part (`localhost`) come back unchanged, and
/// input that does not parse as a URL yields an empty string.
pub fn extract_domain(url: &str) -> String {
    let parsed = match Url::parse(&normalize_url(url)) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!(url, error = %e, "unparseable URL, no domain extracted");
            return String::new();
        }
    };

    match parsed.host() {
        Some(Host::Domain(host)) => registrable_domain(host),
        Some(Host::Ipv4(addr)) => addr.to_string(),
        Some(Host::Ipv6(addr)) => addr.to_string(),
        None => String::new(),
    }
}

/// Reduce a hostname to its registrable domain using the public suffix list
pub fn registrable_domain(host: &str) -> String {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    if let Some(domain) = psl::domain_str(&host) {
        return domain.to_string();
    }
    host
}

/// True when the URL's host is IDNA-encoded, whether it was typed as
/// `xn--` or as raw Unicode that the URL parser converted.
pub fn has_punycode_host(url: &str) -> bool {
    Url::parse(&normalize_url(url))
        .ok()
        .and_then(|parsed| parsed.host_str().map(|host| host.contains("xn--")))
        .unwrap_or(false)
}
