use url::Url;

use super::errors::ResolveError;
use super::normalize::{normalize_input, NormalizedUrl};
use super::types::Provider;
use crate::rules::{CompiledSiteRule, SiteRule};

pub const DIRECT_EXTENSIONS: [&str; 7] = [".mp4", ".webm", ".ogg", ".mov", ".avi", ".mkv", ".m4v"];

/// Whether a path (or bare file name) ends in a playable video extension.
pub fn is_direct_video_path(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    DIRECT_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// `host` is `domain` or one of its subdomains.
fn host_is(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|rest| rest.ends_with('.'))
}

fn segments(url: &Url) -> Vec<&str> {
    url.path_segments()
        .map(|s| s.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

/// Segment following the first occurrence of any of `markers`.
fn segment_after<'a>(segments: &[&'a str], markers: &[&str]) -> Option<&'a str> {
    segments
        .windows(2)
        .find(|w| markers.contains(&w[0]))
        .map(|w| w[1])
}

fn is_video_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn is_numeric(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_digit())
}

/// What a rule decided about the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub provider: Provider,
    pub video_id: Option<String>,
    /// Embed URL synthesized by a site rewrite rule.
    pub rewrite: Option<String>,
}

impl RuleMatch {
    fn with_id(provider: Provider, id: &str) -> Self {
        Self {
            provider,
            video_id: Some(id.to_string()),
            rewrite: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub provider: Provider,
    /// Normalized input, verbatim when it already had a scheme.
    pub raw: String,
    pub url: Url,
    pub video_id: Option<String>,
    pub rewrite: Option<String>,
}

/// Classifier input handed to every rule.
pub struct Target<'a> {
    pub input: &'a NormalizedUrl,
    pub host: &'a str,
}

impl Target<'_> {
    fn url(&self) -> &Url {
        &self.input.url
    }
}

/// One entry of the ordered decision list.
///
/// `applies` is the cheap host/path predicate; `classify` extracts the
/// provider data and may still decline (e.g. no video ID), in which case the
/// next rule is tried.
pub trait ClassifyRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn applies(&self, target: &Target) -> bool;

    fn classify(&self, target: &Target) -> Option<RuleMatch>;
}

struct DirectFileRule;

impl ClassifyRule for DirectFileRule {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn applies(&self, _target: &Target) -> bool {
        true
    }

    fn classify(&self, target: &Target) -> Option<RuleMatch> {
        let file = match segments(target.url()).last() {
            Some(last) => *last,
            // "video.mp4" became "https://video.mp4"; the file name is the host
            None if target.input.scheme_added => target.host,
            None => return None,
        };

        is_direct_video_path(file).then(|| RuleMatch {
            provider: Provider::Direct,
            video_id: None,
            rewrite: None,
        })
    }
}

struct SiteRewriteRule {
    rules: Vec<CompiledSiteRule>,
}

impl ClassifyRule for SiteRewriteRule {
    fn name(&self) -> &'static str {
        "site-rewrite"
    }

    fn applies(&self, target: &Target) -> bool {
        self.rules.iter().any(|rule| rule.matches_host(target.host))
    }

    fn classify(&self, target: &Target) -> Option<RuleMatch> {
        self.rules
            .iter()
            .find_map(|rule| rule.rewrite(target.url()))
            .map(|rewrite| RuleMatch {
                provider: Provider::Parsed,
                video_id: Some(rewrite.id),
                rewrite: Some(rewrite.embed_url),
            })
    }
}

struct YoutubeRule;

impl ClassifyRule for YoutubeRule {
    fn name(&self) -> &'static str {
        "youtube"
    }

    fn applies(&self, target: &Target) -> bool {
        host_is(target.host, "youtube.com") || host_is(target.host, "youtu.be")
    }

    fn classify(&self, target: &Target) -> Option<RuleMatch> {
        let segments = segments(target.url());

        let id = if host_is(target.host, "youtu.be") {
            segments.first().map(|s| s.to_string())
        } else {
            target
                .url()
                .query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.into_owned())
                .or_else(|| {
                    segment_after(&segments, &["shorts", "embed", "live", "v"]).map(Into::into)
                })
        }?;

        is_video_id(&id).then(|| RuleMatch::with_id(Provider::Youtube, &id))
    }
}

struct VimeoRule;

impl ClassifyRule for VimeoRule {
    fn name(&self) -> &'static str {
        "vimeo"
    }

    fn applies(&self, target: &Target) -> bool {
        host_is(target.host, "vimeo.com")
    }

    fn classify(&self, target: &Target) -> Option<RuleMatch> {
        // /channels/x/ID, /groups/x/videos/ID, /album/x/video/ID, /video/ID, /ID/unlisted-hash
        segments(target.url())
            .into_iter()
            .rev()
            .find(|s| is_numeric(s))
            .map(|id| RuleMatch::with_id(Provider::Vimeo, id))
    }
}

struct InstagramRule;

impl ClassifyRule for InstagramRule {
    fn name(&self) -> &'static str {
        "instagram"
    }

    fn applies(&self, target: &Target) -> bool {
        host_is(target.host, "instagram.com") || host_is(target.host, "instagr.am")
    }

    fn classify(&self, target: &Target) -> Option<RuleMatch> {
        segment_after(&segments(target.url()), &["p", "reel", "reels", "tv"])
            .filter(|id| is_video_id(id))
            .map(|id| RuleMatch::with_id(Provider::Instagram, id))
    }
}

struct TiktokRule;

impl ClassifyRule for TiktokRule {
    fn name(&self) -> &'static str {
        "tiktok"
    }

    fn applies(&self, target: &Target) -> bool {
        host_is(target.host, "tiktok.com")
    }

    fn classify(&self, target: &Target) -> Option<RuleMatch> {
        segment_after(&segments(target.url()), &["video"])
            .filter(|id| is_numeric(id))
            .map(|id| RuleMatch::with_id(Provider::Tiktok, id))
    }
}

struct TwitchRule;

impl ClassifyRule for TwitchRule {
    fn name(&self) -> &'static str {
        "twitch"
    }

    fn applies(&self, target: &Target) -> bool {
        host_is(target.host, "twitch.tv")
    }

    fn classify(&self, target: &Target) -> Option<RuleMatch> {
        // only past broadcasts have an embeddable ID; channels fall through
        segment_after(&segments(target.url()), &["videos"])
            .map(|id| id.trim_start_matches('v'))
            .filter(|id| is_numeric(id))
            .map(|id| RuleMatch::with_id(Provider::Twitch, id))
    }
}

struct DailymotionRule;

impl ClassifyRule for DailymotionRule {
    fn name(&self) -> &'static str {
        "dailymotion"
    }

    fn applies(&self, target: &Target) -> bool {
        host_is(target.host, "dailymotion.com") || host_is(target.host, "dai.ly")
    }

    fn classify(&self, target: &Target) -> Option<RuleMatch> {
        let segments = segments(target.url());

        let id = if host_is(target.host, "dai.ly") {
            segments.first().copied()
        } else {
            segment_after(&segments, &["video"]).and_then(|s| s.split('_').next())
        }?;

        is_video_id(id).then(|| RuleMatch::with_id(Provider::Dailymotion, id))
    }
}

/// Ordered decision list mapping an input URL to exactly one provider.
pub struct Classifier {
    rules: Vec<Box<dyn ClassifyRule>>,
}

impl Classifier {
    pub fn new(site_rules: &[SiteRule]) -> Result<Self, regex::Error> {
        let compiled = site_rules
            .iter()
            .map(SiteRule::compile)
            .collect::<Result<Vec<_>, _>>()?;

        // priority order, first match wins
        let rules: Vec<Box<dyn ClassifyRule>> = vec![
            Box::new(DirectFileRule),
            Box::new(SiteRewriteRule { rules: compiled }),
            Box::new(YoutubeRule),
            Box::new(VimeoRule),
            Box::new(InstagramRule),
            Box::new(TiktokRule),
            Box::new(TwitchRule),
            Box::new(DailymotionRule),
        ];

        Ok(Self { rules })
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn classify(&self, input: &str) -> Result<Classified, ResolveError> {
        normalize_input(input).map(|normalized| self.classify_normalized(normalized))
    }

    pub fn classify_normalized(&self, input: NormalizedUrl) -> Classified {
        let host = input.url.host_str().unwrap_or_default().to_string();
        let target = Target {
            input: &input,
            host: &host,
        };

        let matched = self.rules.iter().find_map(|rule| {
            if !rule.applies(&target) {
                return None;
            }
            let matched = rule.classify(&target);
            if matched.is_none() {
                log::debug!("rule={} outcome=fallthrough url={}", rule.name(), input.raw);
            }
            matched
        });

        let matched = matched.unwrap_or(RuleMatch {
            provider: Provider::Unknown,
            video_id: None,
            rewrite: None,
        });

        log::debug!("classified url={} provider={}", input.raw, matched.provider);

        Classified {
            provider: matched.provider,
            raw: input.raw,
            url: input.url,
            video_id: matched.video_id,
            rewrite: matched.rewrite,
        }
    }
}
