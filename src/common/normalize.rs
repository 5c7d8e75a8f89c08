//! URL normalization, same-domain testing, and document-id derivation.
//!
//! These three helpers are shared by the frontier/visited set, the
//! crawl engine's link resolution, and the index gateway's doc-id
//! derivation, so normalization stays consistent across the whole
//! crawl-to-index path.

use sha2::{Digest, Sha256};
use url::Url;

/// Strip the fragment, strip one trailing slash (except on the root
/// path), and lowercase the host. Scheme and query are preserved.
pub fn normalize(url: &Url) -> String {
    let mut u = url.clone();
    u.set_fragment(None);
    if let Some(host) = u.host_str() {
        let lower = host.to_lowercase();
        let _ = u.set_host(Some(&lower));
    }

    let mut s = u.to_string();
    if s.ends_with('/') {
        let path_is_root = u.path() == "/" && u.query().is_none();
        if !path_is_root {
            s.pop();
        }
    }
    s
}

/// Parse-then-normalize convenience wrapper. Returns `None` on parse
/// failure so callers can skip unparseable links without panicking.
pub fn normalize_str(raw: &str) -> Option<String> {
    Url::parse(raw).ok().map(|u| normalize(&u))
}

/// True if `host` is `domain` itself or a subdomain of it, both
/// compared case-insensitively.
pub fn is_same_domain(host: &str, domain: &str) -> bool {
    let host = host.to_lowercase();
    let domain = domain.to_lowercase();
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// Lowercased `host:port`-free domain extracted from a URL, or `None`
/// if the URL has no host (e.g. `data:` URIs).
pub fn host_of(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Deterministic document id: the first 24 hex characters of
/// `sha256(normalized_url)`. Stable under re-normalization, so
/// re-crawling a URL always upserts the same document.
pub fn doc_id(normalized_url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized_url.trim().as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest).chars().take(24).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fragment() {
        let u = Url::parse("https://Example.com/a#frag").unwrap();
        assert_eq!(normalize(&u), "https://example.com/a");
    }

    #[test]
    fn strips_one_trailing_slash() {
        let u = Url::parse("https://example.com/a/").unwrap();
        assert_eq!(normalize(&u), "https://example.com/a");
    }

    #[test]
    fn keeps_root_slash() {
        let u = Url::parse("https://example.com/").unwrap();
        assert_eq!(normalize(&u), "https://example.com/");
    }

    #[test]
    fn lowercases_host_only() {
        let u = Url::parse("https://EXAMPLE.com/A/B").unwrap();
        assert_eq!(normalize(&u), "https://example.com/A/B");
    }

    #[test]
    fn preserves_query() {
        let u = Url::parse("https://example.com/a?x=1#f").unwrap();
        assert_eq!(normalize(&u), "https://example.com/a?x=1");
    }

    #[test]
    fn normalization_is_idempotent() {
        let u = Url::parse("https://Example.com/a/#f").unwrap();
        let once = normalize(&u);
        let twice = normalize(&Url::parse(&once).unwrap());
        assert_eq!(once, twice);
    }

    #[test]
    fn variants_collapse_to_same_normal_form() {
        let a = normalize(&Url::parse("https://X.com/a#f").unwrap());
        let b = normalize(&Url::parse("https://x.com/a/").unwrap());
        assert_eq!(a, b);
        assert_eq!(a, "https://x.com/a");
    }

    #[test]
    fn same_domain_matches_exact_and_subdomain() {
        assert!(is_same_domain("example.com", "example.com"));
        assert!(is_same_domain("sub.example.com", "example.com"));
        assert!(!is_same_domain("otherexample.com", "example.com"));
        assert!(!is_same_domain("example.com.evil.com", "example.com"));
    }

    #[test]
    fn doc_id_is_stable_and_distinguishing() {
        assert_eq!(doc_id("https://example.com/a"), doc_id("https://example.com/a"));
        assert_ne!(doc_id("https://example.com/a"), doc_id("https://example.com/b"));
        assert_eq!(doc_id(" https://example.com/a ".trim()), doc_id("https://example.com/a"));
    }

    #[test]
    fn doc_id_collapses_normalized_variants() {
        let a = normalize(&Url::parse("https://example.com/a#top").unwrap());
        let b = normalize(&Url::parse("https://example.com/a/").unwrap());
        assert_eq!(doc_id(&a), doc_id(&b));
    }
}
