use crate::{
    cache::ResolutionCache,
    config::Config,
    resolver::{ResolveOptions, ResolveResult, Resolver},
    scrape::{HttpClient, HttpFetch},
    search::{SearchClient, SearchResponse},
};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        DefaultBodyLimit, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tokio::signal;

/// Largest accepted `/api/resolve/batch` request.
const MAX_BATCH: usize = 200;
const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct SharedState {
    resolver: Arc<Resolver>,
    search: Arc<SearchClient>,
}

impl SharedState {
    pub fn new(resolver: Arc<Resolver>, search: Arc<SearchClient>) -> Self {
        Self { resolver, search }
    }

    fn options(&self, metadata: Option<bool>) -> ResolveOptions {
        let mut opts = self.resolver.default_options();
        if let Some(fetch_metadata) = metadata {
            opts.fetch_metadata = fetch_metadata;
        }
        opts
    }
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/resolve", get(resolve_query).post(resolve_body))
        .route("/api/resolve/batch", post(resolve_batch))
        .route("/api/search", get(search))
        .route("/api/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(Arc::new(state))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                log::error!("failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::warn!("shutting down");
}

/// Expired entries are otherwise only dropped when looked up again.
fn spawn_cache_purge(cache: ResolutionCache) {
    let period = cache.ttl().max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let purged = cache.purge_expired();
            if purged > 0 {
                log::debug!("cache=purge removed={purged} remaining={}", cache.len());
            }
        }
    });
}

pub async fn start_daemon(config: Config, listen: Option<String>) -> anyhow::Result<()> {
    let listen = listen.unwrap_or_else(|| config.listen.clone());

    let http: Arc<dyn HttpFetch> = Arc::new(HttpClient::new(&config.http)?);
    let cache = ResolutionCache::new(config.cache.max_entries, config.cache.ttl());
    log::info!(
        "cache max_entries={} ttl={}s",
        cache.capacity(),
        cache.ttl().as_secs()
    );
    spawn_cache_purge(cache.clone());

    let resolver = Arc::new(Resolver::new(&config, cache, http.clone())?);
    let search = Arc::new(SearchClient::new(http, config.youtube_api_key.clone()));

    if !search.is_available() {
        log::warn!("youtube_api_key is not set, /api/search will answer search-unavailable");
    }

    let app = router(SharedState::new(resolver, search));

    let listener = tokio::net::TcpListener::bind(&listen).await?;
    log::info!("listening on {listen}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Json(#[from] JsonRejection),

    #[error("{0}")]
    Query(#[from] QueryRejection),

    #[error("batch of {0} urls exceeds limit of {MAX_BATCH}")]
    BatchTooLarge(usize),
}

#[derive(Debug)]
struct HttpError(ApiError);

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            ApiError::Json(rejection) => rejection.status(),
            ApiError::Query(rejection) => rejection.status(),
            ApiError::BatchTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        };

        log::debug!("request rejected status={status} err={}", self.0);

        (status, Json(json!({"ok": false, "error": self.0.to_string()}))).into_response()
    }
}

impl<E> From<E> for HttpError
where
    E: Into<ApiError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub url: String,

    /// Override the configured `fetch_metadata` for this call.
    pub metadata: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub urls: Vec<String>,
    pub metadata: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub q: String,
    pub limit: Option<u32>,
}

async fn resolve_query(
    State(state): State<Arc<SharedState>>,
    payload: Result<Query<ResolveRequest>, QueryRejection>,
) -> Result<Json<ResolveResult>, HttpError> {
    let Query(payload) = payload?;
    let opts = state.options(payload.metadata);
    Ok(Json(state.resolver.resolve_with(&payload.url, opts).await))
}

async fn resolve_body(
    State(state): State<Arc<SharedState>>,
    payload: Result<Json<ResolveRequest>, JsonRejection>,
) -> Result<Json<ResolveResult>, HttpError> {
    let Json(payload) = payload?;
    let opts = state.options(payload.metadata);
    Ok(Json(state.resolver.resolve_with(&payload.url, opts).await))
}

async fn resolve_batch(
    State(state): State<Arc<SharedState>>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Json<Vec<ResolveResult>>, HttpError> {
    let Json(payload) = payload?;

    if payload.urls.len() > MAX_BATCH {
        return Err(ApiError::BatchTooLarge(payload.urls.len()).into());
    }

    log::debug!("batch size={}", payload.urls.len());

    let opts = state.options(payload.metadata);
    Ok(Json(
        state.resolver.resolve_many_with(&payload.urls, opts).await,
    ))
}

async fn search(
    State(state): State<Arc<SharedState>>,
    payload: Result<Query<SearchRequest>, QueryRejection>,
) -> Result<Json<SearchResponse>, HttpError> {
    let Query(payload) = payload?;
    Ok(Json(state.search.search(&payload.q, payload.limit).await))
}

async fn health(State(state): State<Arc<SharedState>>) -> impl IntoResponse {
    Json(json!({
        "ok": true,
        "cache_entries": state.resolver.cache().len(),
    }))
}
