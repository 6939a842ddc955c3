use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::cache::ResolutionCache;
use crate::config::Config;
use crate::resolver::Resolver;
use crate::scrape::{Accept, FetchError, HttpFetch};

/// In-memory `HttpFetch` that serves canned bodies and counts requests.
/// Unregistered URLs fail with a network error.
#[derive(Default)]
pub struct FakeHttp {
    routes: Mutex<HashMap<String, Result<String, FetchError>>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl FakeHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Ok(body.to_string()));
    }

    pub fn fail(&self, url: &str, err: FetchError) {
        self.routes.lock().unwrap().insert(url.to_string(), Err(err));
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl HttpFetch for FakeHttp {
    async fn get_text(&self, url: &str, _accept: Accept) -> Result<String, FetchError> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;

        self.routes
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(FetchError::Network(format!("no route to {url}"))))
    }
}

pub fn resolver_with(config: &Config, fake: &Arc<FakeHttp>) -> Resolver {
    let cache = ResolutionCache::new(config.cache.max_entries, config.cache.ttl());
    Resolver::new(config, cache, fake.clone()).unwrap()
}

pub fn resolver(fake: &Arc<FakeHttp>) -> Resolver {
    resolver_with(&Config::default(), fake)
}

/// oEmbed request URL the resolver builds for `target`.
pub fn oembed_url(endpoint: &str, target: &str) -> String {
    url::Url::parse_with_params(endpoint, [("url", target), ("format", "json")])
        .unwrap()
        .to_string()
}
