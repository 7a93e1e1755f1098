//! Request-derived cache key generation.

use sha2::{Digest, Sha256};

use crate::request::Request;

/// Compute the cache key for a method, canonical URL and rendered vary headers.
pub fn compute_cache_key(method: &str, url: &str, vary_headers: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hasher.update(b"\n");
    hasher.update(vary_headers.as_bytes());
    hex::encode(hasher.finalize())
}

/// Render the subset of request headers that participate in the key.
///
/// Names are matched case-insensitively; absent headers are skipped so a
/// request without them keys the same as before the header was configured.
pub fn vary_headers(request: &Request, key_headers: &[String]) -> String {
    let mut names: Vec<String> = key_headers.iter().map(|h| h.to_ascii_lowercase()).collect();
    names.sort();
    names.dedup();

    names
        .iter()
        .filter_map(|name| request.header(name).map(|value| format!("{name}={value}")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Cache key for a request, including any configured key headers.
///
/// The fragment never reaches the origin, so it is not part of the key.
pub fn request_cache_key(request: &Request, key_headers: &[String]) -> String {
    let mut url = request.url.clone();
    url.set_fragment(None);
    compute_cache_key(&request.method, url.as_str(), &vary_headers(request, key_headers))
}
