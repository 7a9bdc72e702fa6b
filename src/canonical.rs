//! Canonical source URLs for notes.
//!
//! Notes carry the page they were written about. Two submissions of "the same
//! page" must store the same string so that "more from this site" lookups and
//! per-site counts group them together.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Source URL stored on notes posted without a page of their own.
pub const DEFAULT_NOTE_URL: &str = "https://cellophane.ai/pwa";

static SCHEME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^https?://").expect("valid scheme regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteCount {
    pub domain: String,
    pub count: usize,
}

/// Normalizes a user-supplied source URL.
///
/// The hostname is lowercased, the fragment dropped, default ports removed and
/// trailing slashes trimmed from any path longer than `/`. Path and query keep
/// their case. A `www.` prefix is kept exactly as given.
///
/// Input without an `http://` or `https://` scheme gets `https://`. If the
/// result still does not parse, the scheme-prefixed trimmed input is returned
/// as-is; this function never fails.
pub fn canonicalize(raw: &str) -> String {
    let trimmed = raw.trim();
    let prefixed = if SCHEME_RE.is_match(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let mut url = match Url::parse(&prefixed) {
        Ok(url) => url,
        Err(err) => {
            tracing::debug!(input = %prefixed, error = %err, "canonicalize: keeping unparseable url");
            return prefixed;
        }
    };

    if let Some(host) = url.host_str() {
        if host.chars().any(|c| c.is_ascii_uppercase()) {
            let lower = host.to_ascii_lowercase();
            url.set_host(Some(&lower)).ok();
        }
    }

    url.set_fragment(None);

    if matches!(
        (url.scheme(), url.port()),
        ("https", Some(443)) | ("http", Some(80))
    ) {
        url.set_port(None).ok();
    }

    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        // Trimmed to a fixed point so a second pass changes nothing.
        let stripped = path.trim_end_matches('/');
        let stripped = if stripped.is_empty() { "/" } else { stripped }.to_string();
        url.set_path(&stripped);
    }

    url.to_string()
}

/// Source URL to store on a new note.
pub fn note_source_url(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        None | Some("") => DEFAULT_NOTE_URL.to_string(),
        Some(DEFAULT_NOTE_URL) => DEFAULT_NOTE_URL.to_string(),
        Some(url) => canonicalize(url),
    }
}

/// Host used for "more from this site" lookups, without a leading `www.`.
pub fn site_domain(url: &str) -> String {
    match parse_domain(url) {
        Some(domain) => domain,
        None => url.to_string(),
    }
}

fn parse_domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    Some(host.to_ascii_lowercase())
}

/// Counts note URLs per site, most popular first.
pub fn top_sites<'a, I>(urls: I, limit: usize) -> Vec<SiteCount>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    for url in urls {
        if url.to_ascii_lowercase().contains("cellophane.ai/pwa") {
            continue;
        }
        if let Some(domain) = parse_domain(url) {
            *counts.entry(domain).or_insert(0) += 1;
        }
    }

    let mut sites: Vec<SiteCount> = counts
        .into_iter()
        .map(|(domain, count)| SiteCount { domain, count })
        .collect();
    sites.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.domain.cmp(&b.domain)));
    sites.truncate(limit);
    sites
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_host_and_keeps_path_case() {
        let out = canonicalize("HTTP://Example.COM/Path");
        assert_eq!(out, "http://example.com/Path");
        let parsed = Url::parse(&out).unwrap();
        assert_eq!(parsed.host_str(), Some("example.com"));
        assert_eq!(parsed.path(), "/Path");
    }

    #[test]
    fn keeps_query_case() {
        assert_eq!(
            canonicalize("https://Example.com/a?Q=Value"),
            "https://example.com/a?Q=Value"
        );
    }

    #[test]
    fn strips_default_ports_only() {
        assert_eq!(
            canonicalize("https://example.com:443/x"),
            "https://example.com/x"
        );
        assert_eq!(canonicalize("http://example.com:80/x"), "http://example.com/x");
        assert_eq!(
            canonicalize("https://example.com:8443/x"),
            "https://example.com:8443/x"
        );
        assert_eq!(
            canonicalize("http://example.com:443/x"),
            "http://example.com:443/x"
        );
    }

    #[test]
    fn drops_fragment() {
        assert_eq!(
            canonicalize("https://example.com/x#section"),
            "https://example.com/x"
        );
    }

    #[test]
    fn trailing_slash() {
        assert_eq!(canonicalize("https://example.com/x/"), "https://example.com/x");
        assert_eq!(canonicalize("https://example.com/"), "https://example.com/");
        assert_eq!(canonicalize("https://example.com/x//"), "https://example.com/x");
        assert_eq!(
            canonicalize("https://example.com/x/?a=1"),
            "https://example.com/x?a=1"
        );
    }

    #[test]
    fn never_injects_or_strips_www() {
        let bare = canonicalize("https://example.com");
        assert!(!bare.contains("www."), "got {bare}");
        assert_eq!(
            canonicalize("https://WWW.Example.com/a"),
            "https://www.example.com/a"
        );
    }

    #[test]
    fn infers_https_scheme() {
        assert_eq!(canonicalize("example.com/path"), "https://example.com/path");
        assert_eq!(
            canonicalize("  example.com/path  "),
            "https://example.com/path"
        );
    }

    #[test]
    fn malformed_input_falls_back() {
        assert_eq!(
            canonicalize("not a url at all!!"),
            "https://not a url at all!!"
        );
        assert_eq!(canonicalize(""), "https://");
    }

    #[test]
    fn idempotent_over_assorted_inputs() {
        let inputs = [
            "HTTP://Example.COM/Path",
            "https://example.com:443/x/",
            "example.com",
            "https://example.com/x//#frag",
            "not a url at all!!",
            "",
            "   ",
            "https://www.Example.com:8080/A/b/?q=1#top",
            "ftp://example.com/file",
            "http://[::1]:80/",
            "https://例え.jp/パス/",
        ];
        for input in inputs {
            let once = canonicalize(input);
            assert_eq!(canonicalize(&once), once, "input {input:?}");
        }
    }

    #[test]
    fn note_source_url_uses_sentinel() {
        assert_eq!(note_source_url(None), DEFAULT_NOTE_URL);
        assert_eq!(note_source_url(Some("   ")), DEFAULT_NOTE_URL);
        assert_eq!(note_source_url(Some(DEFAULT_NOTE_URL)), DEFAULT_NOTE_URL);
        assert_eq!(
            note_source_url(Some("Example.com/a/")),
            "https://example.com/a"
        );
    }

    #[test]
    fn site_domain_strips_www() {
        assert_eq!(site_domain("https://www.example.com/a"), "example.com");
        assert_eq!(site_domain("https://news.example.com/"), "news.example.com");
        assert_eq!(site_domain("garbage"), "garbage");
    }

    #[test]
    fn top_sites_counts_and_orders() {
        let urls = [
            "https://www.a.com/1",
            "https://a.com/2",
            "https://b.com/1",
            "https://c.com/1",
            "https://c.com/2",
            DEFAULT_NOTE_URL,
            "https://Cellophane.AI/pwa",
            "nope",
        ];
        let sites = top_sites(urls, 2);
        assert_eq!(
            sites,
            vec![
                SiteCount {
                    domain: "a.com".into(),
                    count: 2
                },
                SiteCount {
                    domain: "c.com".into(),
                    count: 2
                },
            ]
        );
    }
}
