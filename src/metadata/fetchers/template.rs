use async_trait::async_trait;

use super::MetadataFetcher;
use crate::metadata::types::{FetchOutcome, Metadata};
use crate::resolver::classify::Classified;
use crate::resolver::embed::{build_embed, EmbedOptions};
use crate::resolver::types::Provider;

/// Deterministic embed URL (and thumbnail where the provider publishes a
/// stable one), computed without any network access.
pub struct TemplateFetcher {
    opts: EmbedOptions,
}

impl TemplateFetcher {
    pub fn new(opts: EmbedOptions) -> Self {
        Self { opts }
    }
}

/// Thumbnail published at a stable per-ID location.
pub fn thumbnail_for(target: &Classified) -> Option<String> {
    let id = target.video_id.as_deref()?;
    match target.provider {
        Provider::Youtube => Some(format!("https://i.ytimg.com/vi/{id}/hqdefault.jpg")),
        Provider::Dailymotion => Some(format!("https://www.dailymotion.com/thumbnail/video/{id}")),
        _ => None,
    }
}

#[async_trait]
impl MetadataFetcher for TemplateFetcher {
    async fn fetch(&self, target: &Classified) -> FetchOutcome {
        if !target.provider.has_embed_template() {
            return FetchOutcome::NotFound(format!("no template for {}", target.provider));
        }

        let embed = build_embed(target, &self.opts);
        let Some(embed_url) = embed.url else {
            return FetchOutcome::NotFound("template produced no url".into());
        };

        FetchOutcome::Found(Metadata {
            embed_url: Some(embed_url),
            thumbnail_url: thumbnail_for(target),
            ..Default::default()
        })
    }

    fn name(&self) -> &'static str {
        "Template"
    }

    fn priority(&self) -> u8 {
        0
    }
}
