//! Pre-synthesis quality gate.
//!
//! Computes freshness, source-diversity, and over-representation metrics
//! over the selected subset and classifies the result. Threshold breaches
//! downgrade to warnings and the cycle proceeds; only the configured
//! hard-fail bound escalates.

use chrono::{Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::Display;

use magpie_core::text::extract_title_date;
use magpie_core::QualityGateConfig;
use magpie_ranking::ScoredItem;

/// Gate classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum QualityStatus {
    Pass,
    Warning,
    Failed,
}

/// Serializable quality-gate report, persisted with the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    pub status: QualityStatus,
    /// Blended gate score in [0, 1].
    pub score: f64,
    /// Share of selected items with a known date inside the freshness
    /// window.
    pub fresh_share: f64,
    /// Distinct sources in the selection.
    pub distinct_sources: usize,
    /// Largest share held by any single source.
    pub max_source_share: f64,
    /// Human-readable breach descriptions.
    pub warnings: Vec<String>,
}

/// Quality gate over a selected subset.
pub struct QualityGate {
    config: QualityGateConfig,
}

impl QualityGate {
    /// Create a gate with the given thresholds.
    pub fn new(config: QualityGateConfig) -> Self {
        Self { config }
    }

    /// Evaluate the selection.
    pub fn evaluate(&self, selected: &[ScoredItem]) -> QualityReport {
        if selected.is_empty() {
            return QualityReport {
                status: QualityStatus::Warning,
                score: 0.0,
                fresh_share: 0.0,
                distinct_sources: 0,
                max_source_share: 0.0,
                warnings: vec!["selection is empty".to_string()],
            };
        }

        let total = selected.len() as f64;
        let cutoff = Utc::now() - Duration::days(self.config.freshness_days);

        let fresh = selected
            .iter()
            .filter(|s| {
                let date = s.item.published_date.or_else(|| {
                    extract_title_date(&s.item.title)
                        .and_then(|d| d.and_hms_opt(0, 0, 0))
                        .map(|naive| Utc.from_utc_datetime(&naive))
                });
                date.map_or(false, |d| d >= cutoff)
            })
            .count();
        let fresh_share = fresh as f64 / total;

        let mut source_counts: HashMap<&str, usize> = HashMap::new();
        for s in selected {
            *source_counts.entry(s.item.source.as_str()).or_insert(0) += 1;
        }
        let distinct_sources = source_counts.len();
        let max_source_share = source_counts
            .values()
            .map(|&n| n as f64 / total)
            .fold(0.0, f64::max);

        let mut warnings = Vec::new();
        if fresh_share < self.config.min_fresh_share {
            warnings.push(format!(
                "freshness below threshold: {:.2} < {:.2}",
                fresh_share, self.config.min_fresh_share
            ));
        }
        if distinct_sources < self.config.min_distinct_sources {
            warnings.push(format!(
                "source diversity below threshold: {} < {}",
                distinct_sources, self.config.min_distinct_sources
            ));
        }
        if max_source_share > self.config.max_source_share {
            warnings.push(format!(
                "source over-representation: {:.2} > {:.2}",
                max_source_share, self.config.max_source_share
            ));
        }

        let freshness_component = (fresh_share / self.config.min_fresh_share).min(1.0);
        let diversity_component =
            (distinct_sources as f64 / self.config.min_distinct_sources as f64).min(1.0);
        let concentration_component = if max_source_share <= self.config.max_source_share {
            1.0
        } else {
            self.config.max_source_share / max_source_share
        };
        let score = (freshness_component + diversity_component + concentration_component) / 3.0;

        let status = match self.config.hard_fail_below {
            Some(bound) if score < bound => QualityStatus::Failed,
            _ if warnings.is_empty() => QualityStatus::Pass,
            _ => QualityStatus::Warning,
        };

        for warning in &warnings {
            tracing::warn!(gate = %status, "{}", warning);
        }

        QualityReport {
            status,
            score,
            fresh_share,
            distinct_sources,
            max_source_share,
            warnings,
        }
    }
}
