use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What one enrichment layer (or the merge of several) learned about a video.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Metadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    /// Player URL suitable for an iframe.
    pub embed_url: Option<String>,
    /// Inline player markup (oEmbed `html` without a frame `src`).
    pub embed_html: Option<String>,
    /// Direct video file URLs, in discovery order.
    #[serde(default)]
    pub media: Vec<String>,
    /// Lowercased oEmbed provider name, when an oEmbed endpoint answered.
    pub provider_name: Option<String>,
    /// Which fetcher provided each field (field_name → fetcher_name)
    #[serde(skip_serializing, skip_deserializing)]
    pub sources: HashMap<String, String>,
}

impl Metadata {
    /// Returns true if any useful field is present
    pub fn has_any_data(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.thumbnail_url.is_some()
            || self.has_playable_target()
    }

    pub fn has_playable_target(&self) -> bool {
        self.embed_url.is_some() || self.embed_html.is_some() || !self.media.is_empty()
    }

    /// Nothing left for a lower-priority layer to add.
    pub fn is_complete(&self) -> bool {
        self.has_playable_target() && self.title.is_some() && self.thumbnail_url.is_some()
    }

    pub fn source_of(&self, field: &str) -> Option<&str> {
        self.sources.get(field).map(String::as_str)
    }

    /// Merge `other` into self, filling only missing fields. Never overwrites
    /// existing values; media lists are unioned.
    pub fn merge_from(&mut self, other: Metadata, source: &str) {
        fn fill(
            slot: &mut Option<String>,
            value: Option<String>,
            field: &str,
            source: &str,
            sources: &mut HashMap<String, String>,
        ) {
            if slot.is_none() && value.is_some() {
                *slot = value;
                sources.insert(field.to_string(), source.to_string());
            }
        }

        fill(&mut self.title, other.title, "title", source, &mut self.sources);
        fill(
            &mut self.description,
            other.description,
            "description",
            source,
            &mut self.sources,
        );
        fill(
            &mut self.thumbnail_url,
            other.thumbnail_url,
            "thumbnail",
            source,
            &mut self.sources,
        );
        fill(&mut self.embed_url, other.embed_url, "embed", source, &mut self.sources);
        fill(
            &mut self.embed_html,
            other.embed_html,
            "embed_html",
            source,
            &mut self.sources,
        );
        fill(
            &mut self.provider_name,
            other.provider_name,
            "provider_name",
            source,
            &mut self.sources,
        );

        for url in other.media {
            if !self.media.contains(&url) {
                self.media.push(url);
                self.sources
                    .entry("media".to_string())
                    .or_insert_with(|| source.to_string());
            }
        }
    }
}

/// Result of a single enrichment layer.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Found(Metadata),
    /// The layer does not apply or produced nothing usable.
    NotFound(String),
    /// Network or parse failure; the next layer is tried.
    Transient(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EnrichReport {
    pub fetchers: Vec<FetcherReport>,
    pub duration_ms: u64,
}

impl EnrichReport {
    pub fn status_of(&self, name: &str) -> Option<&FetcherStatus> {
        self.fetchers.iter().find(|f| f.name == name).map(|f| &f.status)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherReport {
    pub name: String,
    pub priority: u8,
    pub status: FetcherStatus,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", content = "detail")]
pub enum FetcherStatus {
    Success,
    Skip(String),
    Error(String),
}
