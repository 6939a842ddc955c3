use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// Site-specific path rewrite rule.
///
/// `host` is a plain string (case-insensitive substring match) or `r/<regex>/`.
/// No host means the rule applies to every site.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SiteRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    pub pattern: SitePattern,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SitePattern {
    /// `/videos/<slug>-<id>/` → `/embed/<id>`, where `<id>` contains a digit
    SlugId,
    /// `/view_video.php?viewkey=<key>` → `/embed/<key>`
    ViewKey,
}

/// A rewrite produced by a matching rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rewrite {
    pub id: String,
    pub embed_url: String,
}

#[derive(Debug)]
enum HostMatcher {
    Any,
    Contains(String),
    Regex(Regex),
}

#[derive(Debug)]
pub struct CompiledSiteRule {
    host: HostMatcher,
    pattern: SitePattern,
}

impl SiteRule {
    pub fn builtin() -> Vec<SiteRule> {
        vec![
            SiteRule {
                host: None,
                pattern: SitePattern::SlugId,
                comment: Some("/videos/<slug>-<id>/ pages".into()),
            },
            SiteRule {
                host: None,
                pattern: SitePattern::ViewKey,
                comment: Some("view_video.php?viewkey= pages".into()),
            },
        ]
    }

    pub fn compile(&self) -> Result<CompiledSiteRule, regex::Error> {
        let host = match &self.host {
            None => HostMatcher::Any,
            Some(query) => match regex_query(query) {
                Some(expr) => HostMatcher::Regex(Regex::new(expr)?),
                None => HostMatcher::Contains(query.to_lowercase()),
            },
        };

        Ok(CompiledSiteRule {
            host,
            pattern: self.pattern,
        })
    }
}

/// Strip the `r/` prefix and `/` suffix of a regex query.
fn regex_query(query: &str) -> Option<&str> {
    query
        .strip_prefix("r/")
        .and_then(|rest| rest.strip_suffix('/'))
}

impl CompiledSiteRule {
    pub fn matches_host(&self, host: &str) -> bool {
        match &self.host {
            HostMatcher::Any => true,
            HostMatcher::Contains(needle) => host.to_lowercase().contains(needle),
            HostMatcher::Regex(regex) => regex.is_match(host),
        }
    }

    pub fn rewrite(&self, url: &Url) -> Option<Rewrite> {
        if !self.matches_host(url.host_str().unwrap_or_default()) {
            return None;
        }

        match self.pattern {
            SitePattern::SlugId => rewrite_slug_id(url),
            SitePattern::ViewKey => rewrite_view_key(url),
        }
    }
}

fn rewrite_slug_id(url: &Url) -> Option<Rewrite> {
    let segments: Vec<&str> = url.path_segments()?.collect();
    let idx = segments.iter().position(|s| *s == "videos")?;
    let slug = segments.get(idx + 1)?;

    // ids carry a digit; a trailing plain word is an article title
    let (_, id) = slug.rsplit_once('-')?;
    if !id.chars().all(|c| c.is_ascii_alphanumeric()) || !id.chars().any(|c| c.is_ascii_digit())
    {
        return None;
    }

    let prefix = segments[..idx].join("/");
    let path = if prefix.is_empty() {
        format!("/embed/{id}")
    } else {
        format!("/{prefix}/embed/{id}")
    };

    Some(Rewrite {
        id: id.to_string(),
        embed_url: with_path(url, &path),
    })
}

fn rewrite_view_key(url: &Url) -> Option<Rewrite> {
    let path = url.path();
    let prefix = path.strip_suffix("/view_video.php")?;

    let key = url
        .query_pairs()
        .find(|(k, _)| k == "viewkey")
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())?;

    Some(Rewrite {
        embed_url: with_path(url, &format!("{prefix}/embed/{key}")),
        id: key,
    })
}

fn with_path(url: &Url, path: &str) -> String {
    let mut rewritten = url.clone();
    rewritten.set_path(path);
    rewritten.set_query(None);
    rewritten.set_fragment(None);
    rewritten.to_string()
}
