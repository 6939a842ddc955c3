use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

use crate::scrape::{Accept, FetchError, HttpFetch};

const SEARCH_ENDPOINT: &str = "https://www.googleapis.com/youtube/v3/search";
pub const DEFAULT_LIMIT: u32 = 10;
const MAX_LIMIT: u32 = 50;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("search-unavailable")]
    Unavailable,

    #[error("empty-query")]
    EmptyQuery,

    #[error("{}", .0.kind())]
    Fetch(FetchError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub url: String,
}

/// `{ ok, results?, error? }` envelope returned to search callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<SearchHit>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Result<Vec<SearchHit>, SearchError>> for SearchResponse {
    fn from(result: Result<Vec<SearchHit>, SearchError>) -> Self {
        match result {
            Ok(results) => Self {
                ok: true,
                results: Some(results),
                error: None,
            },
            Err(err) => Self {
                ok: false,
                results: None,
                error: Some(err.to_string()),
            },
        }
    }
}

// YouTube Data API v3 payload, every level optional.

#[derive(Debug, Default, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    items: Vec<ApiItem>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiItem {
    #[serde(default)]
    id: ApiId,
    #[serde(default)]
    snippet: ApiSnippet,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiId {
    video_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiSnippet {
    title: Option<String>,
    #[serde(default)]
    thumbnails: ApiThumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct ApiThumbnails {
    high: Option<ApiThumbnail>,
    medium: Option<ApiThumbnail>,
    default: Option<ApiThumbnail>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiThumbnail {
    url: Option<String>,
}

impl ApiItem {
    fn into_hit(self) -> Option<SearchHit> {
        let id = self.id.video_id.filter(|id| !id.is_empty())?;
        let thumbs = self.snippet.thumbnails;
        let thumbnail = [thumbs.high, thumbs.medium, thumbs.default]
            .into_iter()
            .flatten()
            .find_map(|t| t.url);

        Some(SearchHit {
            url: format!("https://www.youtube.com/watch?v={id}"),
            title: self.snippet.title.unwrap_or_default(),
            thumbnail,
            id,
        })
    }
}

/// Keyed YouTube video search. Independent of the resolver.
pub struct SearchClient {
    http: Arc<dyn HttpFetch>,
    api_key: Option<String>,
}

impl SearchClient {
    pub fn new(http: Arc<dyn HttpFetch>, api_key: Option<String>) -> Self {
        Self { http, api_key }
    }

    pub fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn search(&self, query: &str, limit: Option<u32>) -> SearchResponse {
        self.try_search(query, limit).await.into()
    }

    async fn try_search(&self, query: &str, limit: Option<u32>) -> Result<Vec<SearchHit>, SearchError> {
        let key = self.api_key.as_deref().ok_or(SearchError::Unavailable)?;

        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT).to_string();
        let url = Url::parse_with_params(
            SEARCH_ENDPOINT,
            [
                ("part", "snippet"),
                ("type", "video"),
                ("maxResults", limit.as_str()),
                ("q", query),
                ("key", key),
            ],
        )
        .map_err(|e| SearchError::Fetch(FetchError::Parse(e.to_string())))?;

        log::debug!("search q={query:?} limit={limit}");

        let body = self
            .http
            .get_text(url.as_str(), Accept::Json)
            .await
            .map_err(SearchError::Fetch)?;

        let response: ApiResponse = serde_json::from_str(&body)
            .map_err(|e| SearchError::Fetch(FetchError::Parse(e.to_string())))?;

        let hits: Vec<SearchHit> = response
            .items
            .into_iter()
            .filter_map(ApiItem::into_hit)
            .collect();

        log::debug!("search q={query:?} results={}", hits.len());
        Ok(hits)
    }
}
