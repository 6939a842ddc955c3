use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use url::Url;

use super::{CachedFetch, MetadataFetcher};
use crate::metadata::types::{FetchOutcome, Metadata};
use crate::resolver::classify::Classified;

pub const NAME: &str = "oEmbed";

static IFRAME_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("iframe[src]").expect("Failed to parse iframe selector"));

/// Known endpoints: `(name, endpoint, scheme globs)`. Schemes are written
/// for https; http inputs are matched as if they were https.
const PROVIDERS: &[(&str, &str, &[&str])] = &[
    (
        "youtube",
        "https://www.youtube.com/oembed",
        &[
            "https://*.youtube.com/watch*",
            "https://youtube.com/watch*",
            "https://*.youtube.com/shorts/*",
            "https://youtube.com/shorts/*",
            "https://*.youtube.com/live/*",
            "https://*.youtube.com/v/*",
            "https://youtu.be/*",
        ],
    ),
    (
        "vimeo",
        "https://vimeo.com/api/oembed.json",
        &[
            "https://vimeo.com/*",
            "https://*.vimeo.com/*",
            "https://player.vimeo.com/video/*",
        ],
    ),
    (
        "dailymotion",
        "https://www.dailymotion.com/services/oembed",
        &[
            "https://www.dailymotion.com/video/*",
            "https://dailymotion.com/video/*",
            "https://dai.ly/*",
        ],
    ),
    (
        "soundcloud",
        "https://soundcloud.com/oembed",
        &[
            "https://soundcloud.com/*",
            "https://*.soundcloud.com/*",
            "https://on.soundcloud.com/*",
        ],
    ),
    (
        "tiktok",
        "https://www.tiktok.com/oembed",
        &[
            "https://www.tiktok.com/*",
            "https://tiktok.com/*",
            "https://vm.tiktok.com/*",
        ],
    ),
    (
        "twitter",
        "https://publish.twitter.com/oembed",
        &[
            "https://twitter.com/*/status/*",
            "https://*.twitter.com/*/status/*",
            "https://x.com/*/status/*",
            "https://*.x.com/*/status/*",
        ],
    ),
];

/// oEmbed response. Every field is optional; absence is a normal state.
#[derive(Debug, Clone, Default, Deserialize)]
struct OembedResponse {
    #[serde(rename = "type")]
    oembed_type: Option<String>,
    title: Option<String>,
    author_name: Option<String>,
    provider_name: Option<String>,
    thumbnail_url: Option<String>,
    html: Option<String>,
    description: Option<String>,
}

struct CompiledProvider {
    name: &'static str,
    endpoint: &'static str,
    schemes: Vec<Regex>,
}

/// Glob-style matching: `*` matches anything, everything else is literal.
fn compile_scheme(scheme: &str) -> Result<Regex, regex::Error> {
    let pattern = scheme
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{pattern}$"))
}

fn compile_providers() -> Vec<CompiledProvider> {
    PROVIDERS
        .iter()
        .map(|&(name, endpoint, schemes)| CompiledProvider {
            name,
            endpoint,
            schemes: schemes
                .iter()
                .filter_map(|s| match compile_scheme(s) {
                    Ok(re) => Some(re),
                    Err(e) => {
                        log::warn!("oembed scheme '{s}' for {name} skipped: {e}");
                        None
                    }
                })
                .collect(),
        })
        .collect()
}

/// First `<iframe src>` in an oEmbed `html` snippet.
fn iframe_src(html: &str) -> Option<String> {
    let fragment = Html::parse_fragment(html);
    let src = fragment
        .select(&IFRAME_SELECTOR)
        .next()?
        .attr("src")?
        .trim();

    if src.is_empty() {
        return None;
    }
    if let Some(rest) = src.strip_prefix("//") {
        return Some(format!("https://{rest}"));
    }
    Url::parse(src)
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https"))
        .map(|u| u.to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl OembedResponse {
    fn into_metadata(self, provider: &str) -> Metadata {
        let author = non_empty(self.author_name);
        let provider_label = non_empty(self.provider_name);

        let title = non_empty(self.title).or_else(|| match (&author, &provider_label) {
            (Some(author), Some(label)) => Some(format!("{author} - {label}")),
            (Some(author), None) => Some(author.clone()),
            _ => None,
        });

        let html = non_empty(self.html);
        let embed_url = html.as_deref().and_then(iframe_src);
        // markup without a frame is only useful as inline html
        let embed_html = if embed_url.is_none() { html } else { None };

        if let Some(kind) = &self.oembed_type {
            log::trace!("oembed provider={provider} type={kind}");
        }

        Metadata {
            title,
            description: non_empty(self.description),
            thumbnail_url: non_empty(self.thumbnail_url),
            embed_url,
            embed_html,
            provider_name: Some(provider.to_string()),
            ..Default::default()
        }
    }
}

/// Queries the provider's oEmbed endpoint for hosts that publish one.
pub struct OembedFetcher {
    fetch: CachedFetch,
    providers: Vec<CompiledProvider>,
}

impl OembedFetcher {
    pub fn new(fetch: CachedFetch) -> Self {
        Self {
            fetch,
            providers: compile_providers(),
        }
    }

    /// `(provider name, endpoint)` for a URL, if any provider claims it.
    fn find_endpoint(&self, url: &Url) -> Option<(&'static str, &'static str)> {
        let candidate = match url.scheme() {
            "http" => format!("https{}", &url.as_str()["http".len()..]),
            _ => url.to_string(),
        };

        self.providers
            .iter()
            .find(|p| p.schemes.iter().any(|re| re.is_match(&candidate)))
            .map(|p| (p.name, p.endpoint))
    }

    fn request_url(endpoint: &str, target: &str) -> Result<Url, url::ParseError> {
        Url::parse_with_params(endpoint, [("url", target), ("format", "json")])
    }
}

#[async_trait]
impl MetadataFetcher for OembedFetcher {
    async fn fetch(&self, target: &Classified) -> FetchOutcome {
        let Some((name, endpoint)) = self.find_endpoint(&target.url) else {
            return FetchOutcome::NotFound("no oembed provider".into());
        };

        let request = match Self::request_url(endpoint, &target.raw) {
            Ok(url) => url,
            Err(e) => return FetchOutcome::Transient(format!("parse-error: {e}")),
        };

        log::debug!("oembed provider={name} endpoint={request}");

        let value = match self.fetch.json(request.as_str()).await {
            Ok(value) => value,
            Err(e) => return FetchOutcome::Transient(format!("{}: {e}", e.kind())),
        };

        let response: OembedResponse = match serde_json::from_value(value) {
            Ok(r) => r,
            Err(e) => return FetchOutcome::Transient(format!("parse-error: {e}")),
        };

        let meta = response.into_metadata(name);
        if meta.has_any_data() {
            FetchOutcome::Found(meta)
        } else {
            FetchOutcome::NotFound("empty oembed response".into())
        }
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn priority(&self) -> u8 {
        1
    }
}
