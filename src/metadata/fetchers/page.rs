use async_trait::async_trait;

use super::{CachedFetch, MetadataFetcher};
use crate::metadata::types::FetchOutcome;
use crate::resolver::classify::Classified;
use crate::scrape::page::extract_video_page;

/// Last resort: fetch the page itself and scrape meta tags, frames and
/// video elements.
pub struct PageFetcher {
    fetch: CachedFetch,
}

impl PageFetcher {
    pub fn new(fetch: CachedFetch) -> Self {
        Self { fetch }
    }
}

#[async_trait]
impl MetadataFetcher for PageFetcher {
    async fn fetch(&self, target: &Classified) -> FetchOutcome {
        let html = match self.fetch.html(&target.raw).await {
            Ok(html) => html,
            Err(e) => return FetchOutcome::Transient(format!("{}: {e}", e.kind())),
        };

        let meta = extract_video_page(&html, &target.url);
        if meta.has_any_data() {
            FetchOutcome::Found(meta)
        } else {
            FetchOutcome::NotFound("nothing on page".into())
        }
    }

    fn name(&self) -> &'static str {
        "Page"
    }

    fn priority(&self) -> u8 {
        2
    }
}
