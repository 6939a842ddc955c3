pub mod classify;
pub mod embed;
pub mod errors;
pub mod normalize;
pub mod types;

use futures::{stream, StreamExt};
use std::sync::Arc;

use crate::cache::ResolutionCache;
use crate::config::{Config, ConfigError};
use crate::metadata::fetchers::{oembed, template};
use crate::metadata::{CachedFetch, EnrichReport, FetcherRegistry, Metadata};
use crate::scrape::HttpFetch;

use classify::{Classified, Classifier};
use embed::{build_embed, EmbedOptions};
pub use errors::ResolveError;
pub use types::{Embed, EmbedKind, Provider, Resolution, ResolveResult};

/// Per-call overrides of the configured behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Enrich providers whose embed URL is already known from the URL alone.
    /// Unknown and oEmbed-only URLs are always enriched.
    pub fetch_metadata: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            fetch_metadata: true,
        }
    }
}

/// Turns arbitrary user input into a playable target.
///
/// Calls are independent of each other; the cache is the only state they
/// share.
pub struct Resolver {
    classifier: Classifier,
    registry: FetcherRegistry,
    cache: ResolutionCache,
    embed_opts: EmbedOptions,
    defaults: ResolveOptions,
    batch_concurrency: usize,
}

impl Resolver {
    pub fn new(
        config: &Config,
        cache: ResolutionCache,
        http: Arc<dyn HttpFetch>,
    ) -> Result<Self, ConfigError> {
        let classifier = Classifier::new(&config.site_rules)
            .map_err(|e| ConfigError::Invalid(format!("site rule: {e}")))?;

        let embed_opts = EmbedOptions {
            parent: config.embed_parent.clone(),
        };
        let registry = FetcherRegistry::new(CachedFetch::new(cache.clone(), http), embed_opts.clone());

        log::debug!(
            "resolver rules=[{}] fetchers=[{}]",
            classifier.rule_names().join(","),
            registry.names().join(",")
        );

        Ok(Self {
            classifier,
            registry,
            cache,
            embed_opts,
            defaults: ResolveOptions {
                fetch_metadata: config.fetch_metadata,
            },
            batch_concurrency: config.batch_concurrency.max(1),
        })
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn default_options(&self) -> ResolveOptions {
        self.defaults
    }

    pub async fn resolve(&self, raw: &str) -> ResolveResult {
        self.resolve_with(raw, self.defaults).await
    }

    pub async fn resolve_with(&self, raw: &str, opts: ResolveOptions) -> ResolveResult {
        self.resolve_with_report(raw, opts).await.0
    }

    /// Resolve and also return the enrichment report, when enrichment ran.
    pub async fn resolve_with_report(
        &self,
        raw: &str,
        opts: ResolveOptions,
    ) -> (ResolveResult, Option<EnrichReport>) {
        let classified = match self.classifier.classify(raw) {
            Ok(c) => c,
            Err(err) => {
                log::debug!("resolve input={raw:?} outcome={err}");
                return (ResolveResult::failure(err), None);
            }
        };

        if classified.provider == Provider::Direct {
            return (Self::direct(classified), None);
        }

        let template = build_embed(&classified, &self.embed_opts);
        if !opts.fetch_metadata {
            if let Some(url) = template.url {
                let resolution = Resolution {
                    thumbnail: template::thumbnail_for(&classified),
                    url: classified.raw,
                    provider: classified.provider,
                    title: None,
                    description: None,
                    embed: Embed::frame(url),
                    media: Vec::new(),
                };
                return (ResolveResult::success(resolution), None);
            }
        }

        let (meta, report) = self.registry.enrich(&classified).await;
        let result = Self::assemble(classified, meta);

        match &result.error {
            Some(err) => log::debug!("resolve outcome={err} took={}ms", report.duration_ms),
            None => log::debug!(
                "resolve outcome=ok provider={} took={}ms",
                result.provider().map(ToString::to_string).unwrap_or_default(),
                report.duration_ms
            ),
        }

        (result, Some(report))
    }

    /// Resolve a batch with bounded concurrency. Output order matches input.
    pub async fn resolve_many(&self, urls: &[String]) -> Vec<ResolveResult> {
        self.resolve_many_with(urls, self.defaults).await
    }

    pub async fn resolve_many_with(
        &self,
        urls: &[String],
        opts: ResolveOptions,
    ) -> Vec<ResolveResult> {
        stream::iter(urls.iter().cloned())
            .map(|url| async move { self.resolve_with(&url, opts).await })
            .buffered(self.batch_concurrency)
            .collect()
            .await
    }

    fn direct(classified: Classified) -> ResolveResult {
        ResolveResult::success(Resolution {
            embed: Embed::media(classified.raw.clone()),
            media: vec![classified.raw.clone()],
            url: classified.raw,
            provider: Provider::Direct,
            title: None,
            description: None,
            thumbnail: None,
        })
    }

    fn assemble(classified: Classified, meta: Metadata) -> ResolveResult {
        let embed = if let Some(url) = &meta.embed_url {
            Embed::frame(url.clone())
        } else if let Some(html) = &meta.embed_html {
            Embed::html(html.clone())
        } else if let Some(first) = meta.media.first() {
            Embed::media(first.clone())
        } else {
            return ResolveResult::failure(ResolveError::NoEmbeddableMedia);
        };

        let embed_source = match embed.kind {
            EmbedKind::Frame => meta.source_of("embed"),
            EmbedKind::Html => meta.source_of("embed_html"),
            EmbedKind::Media => meta.source_of("media"),
        };

        let provider = match (&classified.provider, embed_source, &meta.provider_name) {
            (Provider::Unknown, Some(oembed::NAME), Some(name)) => Provider::Oembed(name.clone()),
            (provider, _, _) => provider.clone(),
        };

        ResolveResult::success(Resolution {
            url: classified.raw,
            provider,
            title: meta.title,
            description: meta.description,
            thumbnail: meta.thumbnail_url,
            embed,
            media: meta.media,
        })
    }
}
