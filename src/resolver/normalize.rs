use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use super::errors::ResolveError;

static SCHEME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").expect("Failed to compile scheme regex")
});

/// A resolver input after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUrl {
    /// The input, trimmed and prefixed with `https://` when it had no scheme.
    pub raw: String,
    pub url: Url,
    /// Whether the scheme was added by normalization.
    pub scheme_added: bool,
}

/// Normalize raw user input into an `http(s)` URL.
///
/// - Trims surrounding whitespace
/// - Converts protocol-relative URLs to https
/// - Prefixes `https://` when no scheme is present
///
/// Input that already carries a scheme is kept verbatim in `raw`.
pub fn normalize_input(input: &str) -> Result<NormalizedUrl, ResolveError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ResolveError::InvalidUrl);
    }

    let (raw, scheme_added) = if input.starts_with("//") {
        (format!("https:{input}"), true)
    } else if SCHEME_REGEX.is_match(input) {
        (input.to_string(), false)
    } else {
        (format!("https://{input}"), true)
    };

    let url = Url::parse(&raw).map_err(|_| ResolveError::InvalidUrl)?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ResolveError::InvalidUrl);
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return Err(ResolveError::InvalidUrl),
    }

    Ok(NormalizedUrl {
        raw,
        url,
        scheme_added,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_kept_verbatim() {
        let input = "https://WWW.YouTube.com/watch?v=abc";
        let n = normalize_input(input).unwrap();
        assert_eq!(n.raw, input);
        assert!(!n.scheme_added);
        assert_eq!(n.url.host_str(), Some("www.youtube.com"));
    }

    #[test]
    fn test_http_kept() {
        let n = normalize_input("http://example.com/a").unwrap();
        assert_eq!(n.raw, "http://example.com/a");
    }

    #[test]
    fn test_missing_scheme_prefixed() {
        let n = normalize_input("vimeo.com/123").unwrap();
        assert_eq!(n.raw, "https://vimeo.com/123");
        assert!(n.scheme_added);
    }

    #[test]
    fn test_bare_filename() {
        let n = normalize_input("video.mp4").unwrap();
        assert_eq!(n.raw, "https://video.mp4");
        assert_eq!(n.url.host_str(), Some("video.mp4"));
    }

    #[test]
    fn test_protocol_relative_url() {
        let n = normalize_input("//example.com/page").unwrap();
        assert_eq!(n.raw, "https://example.com/page");
    }

    #[test]
    fn test_whitespace_trimmed() {
        let n = normalize_input("  https://example.com/x \n").unwrap();
        assert_eq!(n.raw, "https://example.com/x");
    }

    #[test]
    fn test_not_a_url() {
        assert_eq!(normalize_input("not a url"), Err(ResolveError::InvalidUrl));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize_input("   "), Err(ResolveError::InvalidUrl));
    }

    #[test]
    fn test_non_http_scheme_rejected() {
        assert_eq!(normalize_input("ftp://example.com/a.mp4"), Err(ResolveError::InvalidUrl));
        assert_eq!(normalize_input("file:///tmp/a.mp4"), Err(ResolveError::InvalidUrl));
    }
}
