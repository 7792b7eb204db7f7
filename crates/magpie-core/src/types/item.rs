//! Content item types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{MagpieError, MagpieResult};

/// Sources whose items are treated as academic: papers stay relevant longer
/// and satisfy the academic selection quota.
pub const ACADEMIC_SOURCES: &[&str] = &["arxiv", "semantic_scholar", "semanticscholar", "openreview"];

/// A normalized content unit (paper, article, post) handed in by a source
/// connector and persisted in the seen-item log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    /// Stable URL. Globally unique key in the seen-item log.
    pub url: String,
    /// Item title.
    pub title: String,
    /// Name of the source that produced this item.
    pub source: String,
    /// Short excerpt or abstract.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    /// Full body text, when the source provides it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Opaque per-source metadata: `tier`, `priority`, engagement counters.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub source_metadata: HashMap<String, serde_json::Value>,
    /// Publication timestamp, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_date: Option<DateTime<Utc>>,
    /// Raw author string as reported by the source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Coarse category label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Ordered tag list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Item {
    /// Create a new item with the required fields.
    pub fn new(url: impl Into<String>, title: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            source: source.into(),
            snippet: None,
            content: None,
            source_metadata: HashMap::new(),
            published_date: None,
            author: None,
            category: None,
            tags: Vec::new(),
        }
    }

    /// Set the snippet.
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }

    /// Set the full content.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Set the author string.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set the publication date.
    pub fn with_published_date(mut self, date: DateTime<Utc>) -> Self {
        self.published_date = Some(date);
        self
    }

    /// Set a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.source_metadata.insert(key.into(), value);
        self
    }

    /// Check the intake contract: `url` must parse as a URL, and `title`
    /// and `source` must be non-empty.
    pub fn validate(&self) -> MagpieResult<()> {
        url::Url::parse(&self.url)
            .map_err(|e| MagpieError::validation(format!("invalid url '{}': {}", self.url, e)))?;
        if self.title.trim().is_empty() {
            return Err(MagpieError::validation("item title is empty"));
        }
        if self.source.trim().is_empty() {
            return Err(MagpieError::validation("item source is empty"));
        }
        Ok(())
    }

    /// The editorial tier from source metadata, when present.
    pub fn tier(&self) -> Option<i64> {
        self.source_metadata.get("tier").and_then(|v| v.as_i64())
    }

    /// Whether this item comes from an academic source.
    pub fn is_academic(&self) -> bool {
        let source = self.source.to_lowercase();
        ACADEMIC_SOURCES.iter().any(|s| source.contains(s))
    }

    /// Title and snippet joined for keyword-style matching.
    pub fn title_and_snippet(&self) -> String {
        match &self.snippet {
            Some(snippet) => format!("{} {}", self.title, snippet),
            None => self.title.clone(),
        }
    }

    /// The richest available body text: content, falling back to snippet.
    pub fn body(&self) -> &str {
        self.content
            .as_deref()
            .or(self.snippet.as_deref())
            .unwrap_or("")
    }

    /// An integer engagement counter from source metadata.
    pub fn metadata_count(&self, key: &str) -> Option<i64> {
        self.source_metadata.get(key).and_then(|v| v.as_i64())
    }
}
