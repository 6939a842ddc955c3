pub mod oembed;
pub mod page;
pub mod template;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

use crate::cache::{Payload, ResolutionCache};
use crate::metadata::types::{EnrichReport, FetchOutcome, FetcherReport, FetcherStatus, Metadata};
use crate::resolver::classify::Classified;
use crate::resolver::embed::EmbedOptions;
use crate::scrape::{Accept, FetchError, HttpFetch};

/// HTTP access for fetchers, routed through the resolution cache.
///
/// Cache keys are the exact URLs fetched. Only successful, well-formed
/// payloads are stored.
#[derive(Clone)]
pub struct CachedFetch {
    cache: ResolutionCache,
    http: Arc<dyn HttpFetch>,
}

impl CachedFetch {
    pub fn new(cache: ResolutionCache, http: Arc<dyn HttpFetch>) -> Self {
        Self { cache, http }
    }

    pub async fn html(&self, url: &str) -> Result<String, FetchError> {
        if let Some(Payload::Html(html)) = self.cache.get(url) {
            return Ok(html);
        }

        let html = self.http.get_text(url, Accept::Html).await?;
        self.cache.put(url, Payload::Html(html.clone()));
        Ok(html)
    }

    pub async fn json(&self, url: &str) -> Result<serde_json::Value, FetchError> {
        if let Some(Payload::Json(value)) = self.cache.get(url) {
            return Ok(value);
        }

        let body = self.http.get_text(url, Accept::Json).await?;
        let value: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| FetchError::Parse(e.to_string()))?;
        self.cache.put(url, Payload::Json(value.clone()));
        Ok(value)
    }
}

/// Trait for different metadata fetching strategies
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    /// Attempt to enrich a classified URL. Never fails hard: network and
    /// parse problems come back as `FetchOutcome::Transient`.
    async fn fetch(&self, target: &Classified) -> FetchOutcome;

    /// Get the name of this fetcher for logging/debugging
    fn name(&self) -> &'static str;

    /// Priority for merge ordering. Lower = higher priority (picked first).
    fn priority(&self) -> u8;
}

/// Enrichment layers in priority order.
pub struct FetcherRegistry {
    fetchers: Vec<Box<dyn MetadataFetcher>>,
}

impl FetcherRegistry {
    pub fn new(fetch: CachedFetch, embed_opts: EmbedOptions) -> Self {
        let mut fetchers: Vec<Box<dyn MetadataFetcher>> = vec![
            Box::new(template::TemplateFetcher::new(embed_opts)),
            Box::new(oembed::OembedFetcher::new(fetch.clone())),
            Box::new(page::PageFetcher::new(fetch)),
        ];
        fetchers.sort_by_key(|f| f.priority());

        Self { fetchers }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.fetchers.iter().map(|f| f.name()).collect()
    }

    /// Run layers in order, merging each result into what earlier layers
    /// found, and stop once nothing is missing.
    pub async fn enrich(&self, target: &Classified) -> (Metadata, EnrichReport) {
        let started = Instant::now();
        let mut merged = Metadata::default();
        let mut report = EnrichReport::default();

        for fetcher in &self.fetchers {
            let name = fetcher.name();

            if merged.is_complete() {
                log::debug!("fetcher={name} outcome=skip reason=complete");
                report.fetchers.push(FetcherReport {
                    name: name.into(),
                    priority: fetcher.priority(),
                    status: FetcherStatus::Skip("metadata complete".into()),
                    duration_ms: 0,
                });
                continue;
            }

            let fetch_started = Instant::now();
            let outcome = fetcher.fetch(target).await;

            let status = match outcome {
                FetchOutcome::Found(m) => {
                    log::debug!("fetcher={name} outcome=success fields=[{}]", describe_fields(&m));
                    merged.merge_from(m, name);
                    FetcherStatus::Success
                }
                FetchOutcome::NotFound(reason) => {
                    log::debug!("fetcher={name} outcome=skip reason={reason}");
                    FetcherStatus::Skip(reason)
                }
                FetchOutcome::Transient(err) => {
                    log::debug!("fetcher={name} outcome=error err={err}");
                    FetcherStatus::Error(err)
                }
            };

            report.fetchers.push(FetcherReport {
                name: name.into(),
                priority: fetcher.priority(),
                status,
                duration_ms: fetch_started.elapsed().as_millis() as u64,
            });
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        (merged, report)
    }
}

/// Describe which fields are present in metadata (for logging)
fn describe_fields(m: &Metadata) -> String {
    let mut fields = Vec::new();
    if m.title.is_some() { fields.push("title"); }
    if m.description.is_some() { fields.push("description"); }
    if m.thumbnail_url.is_some() { fields.push("thumbnail"); }
    if m.embed_url.is_some() { fields.push("embed"); }
    if m.embed_html.is_some() { fields.push("embed_html"); }
    if !m.media.is_empty() { fields.push("media"); }
    fields.join(",")
}
