//! HTTP response header extraction.

use std::collections::BTreeMap;

use hyper::HeaderMap;

/// Canonical MIME form of a header name: `x-request-id` becomes `X-Request-Id`.
pub fn canonical_header_key(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => {
                    first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Collect response headers into a map keyed by canonical name.
///
/// Repeated headers are joined with `", "` in the order they were received.
pub fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut collected: BTreeMap<String, String> = BTreeMap::new();

    for (name, value) in headers {
        let key = canonical_header_key(name.as_str());
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        match collected.get_mut(&key) {
            Some(existing) => {
                existing.push_str(", ");
                existing.push_str(&value);
            }
            None => {
                collected.insert(key, value);
            }
        }
    }

    collected
}
