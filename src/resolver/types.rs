use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

use super::errors::ResolveError;

/// iframe `allow` attribute handed out with every frame embed.
pub const FRAME_ALLOW: &str =
    "autoplay; fullscreen; encrypted-media; picture-in-picture; clipboard-write";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Provider {
    Direct,
    Youtube,
    Vimeo,
    Instagram,
    Tiktok,
    Twitch,
    Dailymotion,
    Oembed(String),
    Parsed,
    Unknown,
}

impl Provider {
    /// Providers whose embed URL follows from the classified URL alone.
    pub fn has_embed_template(&self) -> bool {
        matches!(
            self,
            Provider::Youtube
                | Provider::Vimeo
                | Provider::Instagram
                | Provider::Tiktok
                | Provider::Twitch
                | Provider::Dailymotion
                | Provider::Parsed
        )
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Direct => f.write_str("direct"),
            Provider::Youtube => f.write_str("youtube"),
            Provider::Vimeo => f.write_str("vimeo"),
            Provider::Instagram => f.write_str("instagram"),
            Provider::Tiktok => f.write_str("tiktok"),
            Provider::Twitch => f.write_str("twitch"),
            Provider::Dailymotion => f.write_str("dailymotion"),
            Provider::Oembed(name) => write!(f, "oembed:{name}"),
            Provider::Parsed => f.write_str("parsed"),
            Provider::Unknown => f.write_str("unknown"),
        }
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let provider = match s {
            "direct" => Provider::Direct,
            "youtube" => Provider::Youtube,
            "vimeo" => Provider::Vimeo,
            "instagram" => Provider::Instagram,
            "tiktok" => Provider::Tiktok,
            "twitch" => Provider::Twitch,
            "dailymotion" => Provider::Dailymotion,
            "parsed" => Provider::Parsed,
            "unknown" => Provider::Unknown,
            other => match other.strip_prefix("oembed:") {
                Some(name) if !name.is_empty() => Provider::Oembed(name.to_string()),
                _ => return Err(format!("unknown provider '{other}'")),
            },
        };
        Ok(provider)
    }
}

impl Serialize for Provider {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Provider {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedKind {
    /// Provider player loaded in an iframe.
    Frame,
    /// Inline HTML snippet from an oEmbed response.
    Html,
    /// Native media element pointed at a video file.
    Media,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    pub kind: EmbedKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow: Option<String>,
}

impl Embed {
    pub fn frame(url: String) -> Self {
        Self {
            kind: EmbedKind::Frame,
            url: Some(url),
            html: None,
            allow: Some(FRAME_ALLOW.to_string()),
        }
    }

    pub fn html(html: String) -> Self {
        Self {
            kind: EmbedKind::Html,
            url: None,
            html: Some(html),
            allow: None,
        }
    }

    pub fn media(url: String) -> Self {
        Self {
            kind: EmbedKind::Media,
            url: Some(url),
            html: None,
            allow: None,
        }
    }
}

/// Payload of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub url: String,
    pub provider: Provider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub embed: Embed,
    pub media: Vec<String>,
}

impl Resolution {
    pub fn is_playable(&self) -> bool {
        self.embed.url.is_some() || self.embed.html.is_some() || !self.media.is_empty()
    }
}

/// Uniform `{ ok, ... }` envelope returned by `resolve`.
///
/// On failure only `ok` and `error` are present; on success the resolution
/// fields are flattened next to `ok`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolveResult {
    pub ok: bool,
    #[serde(flatten)]
    pub resolution: Option<Resolution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResolveResult {
    /// Wrap a resolution, refusing one with nothing to play.
    pub fn success(resolution: Resolution) -> Self {
        if !resolution.is_playable() {
            return Self::failure(ResolveError::NoEmbeddableMedia);
        }
        Self {
            ok: true,
            resolution: Some(resolution),
            error: None,
        }
    }

    pub fn failure(err: ResolveError) -> Self {
        Self {
            ok: false,
            resolution: None,
            error: Some(err.to_string()),
        }
    }

    pub fn provider(&self) -> Option<&Provider> {
        self.resolution.as_ref().map(|r| &r.provider)
    }

    pub fn embed_url(&self) -> Option<&str> {
        self.resolution.as_ref().and_then(|r| r.embed.url.as_deref())
    }
}
