//! Weighted multi-signal relevance scoring.
//!
//! Six normalized signals (keyword, source tier, engagement, recency,
//! novelty, quality) combine in a weighted sum; a post-hoc multiplicative
//! boost from the priority roster is applied afterwards and is not part of
//! the sum.

use chrono::{TimeZone, Utc};
use ordered_float::OrderedFloat;
use serde::Serialize;

use magpie_core::text::extract_title_date;
use magpie_core::{detect_slop, Item, MagpieResult, ScoringConfig, SimilarityIndex};

use crate::boost::PriorityRoster;

// Fallback source weights when no tier metadata is present.
const SOURCE_WEIGHTS: &[(&str, f64)] = &[
    ("arxiv", 1.0),
    ("anthropic", 1.0),
    ("openai", 1.0),
    ("deepmind", 1.0),
    ("hackernews", 0.8),
    ("rss", 0.7),
    ("blog", 0.7),
];

/// Weight of an unknown, untagged source.
const UNKNOWN_SOURCE_WEIGHT: f64 = 0.5;

/// Minimum final score for items by critical-priority authors.
const CRITICAL_FLOOR: f64 = 0.95;

/// An item with its computed relevance score.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredItem {
    pub item: Item,
    pub score: f64,
}

/// Multi-signal relevance scorer.
///
/// Consults the store's fuzzy-match primitive (via [`SimilarityIndex`])
/// for the novelty signal; everything else is computed from the item.
pub struct RelevanceScorer<'a> {
    config: ScoringConfig,
    roster: PriorityRoster,
    index: &'a dyn SimilarityIndex,
}

impl<'a> RelevanceScorer<'a> {
    /// Create a scorer. Fails when the configured weights do not sum
    /// to 1.0.
    pub fn new(
        config: ScoringConfig,
        roster: PriorityRoster,
        index: &'a dyn SimilarityIndex,
    ) -> MagpieResult<Self> {
        config
            .weights
            .validate()
            .map_err(magpie_core::MagpieError::configuration)?;
        Ok(Self {
            config,
            roster,
            index,
        })
    }

    /// Compute the relevance score for one item.
    pub fn score(&self, item: &Item) -> MagpieResult<f64> {
        let weights = &self.config.weights;

        let weighted = self.keyword_score(item) * weights.keyword
            + self.source_tier_score(item) * weights.source_tier
            + self.engagement_score(item) * weights.engagement
            + self.recency_score(item) * weights.recency
            + self.novelty_score(item)? * weights.novelty
            + self.quality_score(item) * weights.quality;

        let boost = self.roster.evaluate(item);
        let mut score = weighted * boost.multiplier;
        if boost.critical {
            score = score.max(CRITICAL_FLOOR);
        }

        Ok(score)
    }

    /// Score a batch and return it sorted score-descending.
    pub fn rank(&self, items: Vec<Item>) -> MagpieResult<Vec<ScoredItem>> {
        let mut scored = Vec::with_capacity(items.len());
        for item in items {
            let score = self.score(&item)?;
            scored.push(ScoredItem { item, score });
        }
        scored.sort_by(|a, b| OrderedFloat(b.score).cmp(&OrderedFloat(a.score)));
        Ok(scored)
    }

    /// Curated-term matches in title+snippet, /3, capped at 1.0, plus up
    /// to +0.2 for impact-claim terms.
    fn keyword_score(&self, item: &Item) -> f64 {
        let text = item.title_and_snippet().to_lowercase();

        let matches = self
            .config
            .high_value_keywords
            .iter()
            .filter(|k| text.contains(k.as_str()))
            .count();
        let base = (matches as f64 / 3.0).min(1.0);

        let impact_matches = self
            .config
            .impact_keywords
            .iter()
            .filter(|k| text.contains(k.as_str()))
            .count();
        let bonus = (impact_matches as f64 * 0.1).min(0.2);

        base + bonus
    }

    /// Academic sources score 1.0 outright; tagged tiers map through a
    /// fixed table; untagged sources fall back to substring matching.
    fn source_tier_score(&self, item: &Item) -> f64 {
        if item.is_academic() {
            return 1.0;
        }

        if let Some(tier) = item.tier() {
            match tier {
                2 => return 1.0,
                1 => return 0.9,
                3 => return 0.6,
                5 => return 0.7,
                _ => {}
            }
        }

        let source = item.source.to_lowercase();
        SOURCE_WEIGHTS
            .iter()
            .find(|(name, _)| source.contains(name))
            .map(|(_, weight)| *weight)
            .unwrap_or(UNKNOWN_SOURCE_WEIGHT)
    }

    /// Log-scaled citation count or engagement points, capped at 1.0,
    /// plus up to +0.2 for influential citations.
    fn engagement_score(&self, item: &Item) -> f64 {
        let base = if let Some(citations) = item.metadata_count("citations") {
            let n = citations.max(0) as f64;
            ((n + 1.0).ln() / (self.config.citation_cap as f64).ln()).min(1.0)
        } else if let Some(points) = item.metadata_count("points") {
            let n = points.max(0) as f64;
            ((n + 1.0).ln() / (self.config.points_cap as f64).ln()).min(1.0)
        } else if let Some(score) = item.metadata_count("score") {
            (score.max(0) as f64 / 100.0).min(1.0)
        } else {
            // No engagement data at all
            return 0.5;
        };

        let bonus = item
            .metadata_count("influential_citations")
            .map(|n| (n.max(0) as f64 / 10.0).min(1.0) * 0.2)
            .unwrap_or(0.0);

        base + bonus
    }

    /// Exponential decay over item age; academic sources decay slower.
    /// Items with no determinable timestamp get a fixed low score so
    /// undated stale content is not promoted.
    fn recency_score(&self, item: &Item) -> f64 {
        let published = item.published_date.or_else(|| {
            extract_title_date(&item.title)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| Utc.from_utc_datetime(&naive))
        });

        let Some(published) = published else {
            return self.config.undated_recency_score;
        };

        let age_hours = (Utc::now() - published).num_seconds().max(0) as f64 / 3600.0;
        let tau = if item.is_academic() {
            self.config.academic_recency_tau_hours
        } else {
            self.config.recency_tau_hours
        };

        (-age_hours / tau).exp()
    }

    /// One minus the best fuzzy similarity to the stored corpus; items
    /// with no similar stored title are maximally novel.
    fn novelty_score(&self, item: &Item) -> MagpieResult<f64> {
        let similar = self
            .index
            .similar_titles(&item.title, self.config.novelty_threshold, 5)?;

        let max_similarity = similar
            .iter()
            .map(|m| OrderedFloat(m.score))
            .max()
            .map(|s| s.into_inner())
            .unwrap_or(0.0);

        Ok(1.0 - max_similarity)
    }

    /// Inverse slop density over title + body.
    fn quality_score(&self, item: &Item) -> f64 {
        let text = format!("{} {}", item.title, item.body());
        1.0 - detect_slop(&text).score
    }
}
