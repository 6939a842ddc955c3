use anyhow::{Context, Result};
use serde_json::json;
use std::sync::Arc;

use crate::{
    cache::ResolutionCache,
    config::Config,
    resolver::{
        classify::Classifier,
        embed::{build_embed, EmbedOptions},
        ResolveOptions, Resolver,
    },
    scrape::{HttpClient, HttpFetch},
    search::SearchClient,
    web,
};

fn http_client(config: &Config) -> Result<Arc<dyn HttpFetch>> {
    let client = HttpClient::new(&config.http).context("failed to build http client")?;
    Ok(Arc::new(client))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn handle_resolve(
    config: &Config,
    urls: Vec<String>,
    no_metadata: bool,
    report: bool,
) -> Result<()> {
    let cache = ResolutionCache::new(config.cache.max_entries, config.cache.ttl());
    let resolver = Resolver::new(config, cache, http_client(config)?)?;

    let mut opts = resolver.default_options();
    if no_metadata {
        opts.fetch_metadata = false;
    }

    let results = if report {
        let mut results = Vec::with_capacity(urls.len());
        for url in &urls {
            let (result, report) = resolver.resolve_with_report(url, opts).await;
            match report {
                Some(report) => eprintln!("{}", serde_json::to_string_pretty(&report)?),
                None => eprintln!("{url}: resolved without enrichment"),
            }
            results.push(result);
        }
        results
    } else {
        resolver.resolve_many_with(&urls, opts).await
    };

    match results.as_slice() {
        [single] => print_json(single),
        many => print_json(&many),
    }
}

pub fn handle_classify(config: &Config, url: String, verbose: bool) -> Result<()> {
    let classifier = Classifier::new(&config.site_rules)?;

    if verbose {
        eprintln!("rules: {}", classifier.rule_names().join(" > "));
    }

    let classified = classifier.classify(&url)?;
    let embed = build_embed(
        &classified,
        &EmbedOptions {
            parent: config.embed_parent.clone(),
        },
    );

    print_json(&json!({
        "url": classified.raw,
        "provider": classified.provider,
        "video_id": classified.video_id,
        "embed": embed.url,
        "direct": embed.is_direct,
    }))
}

pub async fn handle_search(config: &Config, query: String, limit: Option<u32>) -> Result<()> {
    let client = SearchClient::new(http_client(config)?, config.youtube_api_key.clone());
    let response = client.search(&query, limit).await;
    print_json(&response)
}

pub async fn handle_daemon(config: Config, listen: Option<String>) -> Result<()> {
    web::start_daemon(config, listen).await
}
