use url::Url;

use super::classify::Classified;
use super::types::Provider;

#[derive(Debug, Clone, Default)]
pub struct EmbedOptions {
    /// Hostname of the page hosting the players (Twitch `parent`).
    pub parent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedTarget {
    pub url: Option<String>,
    /// Play through a native media element rather than a provider frame.
    pub is_direct: bool,
}

impl EmbedTarget {
    fn frame(url: String) -> Self {
        Self {
            url: Some(url),
            is_direct: false,
        }
    }

    fn none() -> Self {
        Self {
            url: None,
            is_direct: false,
        }
    }
}

/// Original URL without query, fragment or trailing slash.
fn bare_url(url: &Url) -> String {
    let mut bare = url.clone();
    bare.set_query(None);
    bare.set_fragment(None);
    bare.as_str().trim_end_matches('/').to_string()
}

/// Build the playable target for a classified URL.
///
/// Providers without a deterministic template get no URL here; their target
/// comes from metadata enrichment.
pub fn build_embed(classified: &Classified, opts: &EmbedOptions) -> EmbedTarget {
    let id = classified.video_id.as_deref();

    match (&classified.provider, id) {
        (Provider::Direct, _) => EmbedTarget {
            url: Some(classified.raw.clone()),
            is_direct: true,
        },
        (Provider::Youtube, Some(id)) => EmbedTarget::frame(format!(
            "https://www.youtube.com/embed/{id}?autoplay=1&enablejsapi=1"
        )),
        (Provider::Vimeo, Some(id)) => {
            EmbedTarget::frame(format!("https://player.vimeo.com/video/{id}?autoplay=1"))
        }
        (Provider::Instagram, Some(_)) => {
            EmbedTarget::frame(format!("{}/embed", bare_url(&classified.url)))
        }
        (Provider::Tiktok, Some(_)) => EmbedTarget::frame(format!(
            "https://www.tiktok.com/embed/v2/{}",
            classified.raw
        )),
        (Provider::Twitch, Some(id)) => {
            let mut url = format!("https://player.twitch.tv/?video={id}");
            if let Some(parent) = &opts.parent {
                url.push_str("&parent=");
                url.push_str(parent);
            }
            EmbedTarget::frame(url)
        }
        (Provider::Dailymotion, Some(id)) => {
            EmbedTarget::frame(format!("https://www.dailymotion.com/embed/video/{id}"))
        }
        (Provider::Parsed, _) => match &classified.rewrite {
            Some(rewrite) => EmbedTarget::frame(rewrite.clone()),
            None => EmbedTarget::none(),
        },
        _ => EmbedTarget::none(),
    }
}
