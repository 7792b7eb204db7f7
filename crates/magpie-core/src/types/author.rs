//! Author performance types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-author performance statistics, maintained by the author tracker.
///
/// Rows are created lazily on first observation of an author and updated on
/// every inclusion/exclusion event plus a periodic score-refresh pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorStats {
    /// Canonical author key ("Last, F." form).
    pub author_name: String,
    /// Papers observed from this author.
    pub total_papers: i64,
    /// Papers that made it into a digest.
    pub included_papers: i64,
    /// `included_papers / total_papers`.
    pub inclusion_rate: f64,
    /// Exponential decay over days since last inclusion.
    pub recency_score: f64,
    /// Papers per month over the author's active window.
    pub recent_velocity: f64,
    /// First observation.
    pub first_seen: DateTime<Utc>,
    /// Most recent observation.
    pub last_seen: DateTime<Utc>,
    /// Most recent inclusion, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_included: Option<DateTime<Utc>>,
}

impl AuthorStats {
    /// Blended score used to prioritize future author tracking.
    pub fn composite_score(&self) -> f64 {
        0.5 * self.inclusion_rate + 0.3 * self.recency_score + 0.2 * self.recent_velocity.min(1.0)
    }
}
