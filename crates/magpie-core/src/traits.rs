//! Trait seams between components.

use serde::{Deserialize, Serialize};

use crate::error::MagpieResult;

/// A stored title matched by the fuzzy similarity primitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleMatch {
    /// Seen-item id of the matched row.
    pub id: i64,
    /// Stored title.
    pub title: String,
    /// Stored URL.
    pub url: String,
    /// Normalized similarity in (0, 1]; higher is more similar.
    pub score: f64,
}

/// Fuzzy title lookup over the persisted corpus.
///
/// Implemented by the store's full-text index; consumed by the
/// deduplication engine and by the scorer's novelty signal.
pub trait SimilarityIndex {
    /// Find stored titles similar to `title`, best first, keeping only
    /// matches at or above `threshold`.
    fn similar_titles(
        &self,
        title: &str,
        threshold: f64,
        limit: usize,
    ) -> MagpieResult<Vec<TitleMatch>>;
}
