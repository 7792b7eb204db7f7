//! Configuration system for magpie.
//!
//! All knobs are explicit typed fields with documented defaults, resolved
//! once at load time. Decay constants and thresholds encode editorial
//! policy, so every one of them is a named field here rather than a literal
//! buried in component code.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{MagpieError, MagpieResult};

/// Main configuration for the curation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MagpieConfig {
    /// Directory holding the database and other working files.
    pub data_dir: PathBuf,
    /// Research-cycle sizing.
    pub research: ResearchConfig,
    /// Deduplication thresholds.
    pub dedup: DedupConfig,
    /// Relevance scoring weights and decay constants.
    pub scoring: ScoringConfig,
    /// Diversity selection quotas.
    pub selection: SelectionConfig,
    /// Author performance tracking constants.
    pub authors: AuthorTrackingConfig,
    /// Pre-synthesis quality gate thresholds.
    pub quality_gate: QualityGateConfig,
    /// Source collection retry policy.
    pub collector: CollectorConfig,
}

impl Default for MagpieConfig {
    fn default() -> Self {
        let data_dir = dirs::home_dir()
            .map(|h| h.join(".magpie"))
            .unwrap_or_else(|| PathBuf::from(".magpie"));

        Self {
            data_dir,
            research: ResearchConfig::default(),
            dedup: DedupConfig::default(),
            scoring: ScoringConfig::default(),
            selection: SelectionConfig::default(),
            authors: AuthorTrackingConfig::default(),
            quality_gate: QualityGateConfig::default(),
            collector: CollectorConfig::default(),
        }
    }
}

impl MagpieConfig {
    /// Path of the state database inside the data directory.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("state.db")
    }

    /// Load configuration from a file (TOML, JSON, or YAML).
    ///
    /// A `.env` file next to the config file is loaded first, so values
    /// referenced via the environment are available.
    pub fn from_file(path: impl AsRef<Path>) -> MagpieResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
            }
        }

        let content = std::fs::read_to_string(path)?;
        let ext = path.extension().and_then(|e| e.to_str());

        let config: Self = match ext {
            Some("toml") => toml::from_str(&content)
                .map_err(|e| MagpieError::Configuration(e.to_string()))?,
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| MagpieError::Configuration(e.to_string()))?,
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| MagpieError::Configuration(e.to_string()))?,
            _ => {
                return Err(MagpieError::Configuration(
                    "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
                ))
            }
        };

        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Validate cross-field constraints.
    pub fn validate(&self) -> MagpieResult<()> {
        self.scoring
            .weights
            .validate()
            .map_err(MagpieError::configuration)?;
        if self.research.min_items > self.research.max_items {
            return Err(MagpieError::configuration(
                "research.min_items exceeds research.max_items",
            ));
        }
        if !(0.0..=1.0).contains(&self.dedup.title_similarity_threshold) {
            return Err(MagpieError::configuration(
                "dedup.title_similarity_threshold must be within [0, 1]",
            ));
        }
        Ok(())
    }
}

/// Research-cycle sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// How many items a digest aims for. Default: 12.
    pub target_items: usize,
    /// Below this many new items, recent history supplements the pool.
    /// Default: 3.
    pub min_items: usize,
    /// Hard ceiling on digest size. Default: 18.
    pub max_items: usize,
    /// Lookback window (days of `first_seen`) for the supplement query.
    /// Default: 7.
    pub supplement_days: i64,
    /// Maximum supplement items pulled from history. Default: 20.
    pub supplement_limit: usize,
    /// Supplement items published longer ago than this are excluded.
    /// Default: 14.
    pub supplement_max_age_days: i64,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            target_items: 12,
            min_items: 3,
            max_items: 18,
            supplement_days: 7,
            supplement_limit: 20,
            supplement_max_age_days: 14,
        }
    }
}

/// Deduplication thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Normalized BM25 similarity above which two titles are the same
    /// item. Default: 0.85.
    pub title_similarity_threshold: f64,
    /// How many fuzzy candidates to examine per check. Default: 5.
    pub similar_title_limit: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            title_similarity_threshold: 0.85,
            similar_title_limit: 5,
        }
    }
}

/// Weights of the relevance score's signals. Must sum to 1.0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub keyword: f64,
    pub source_tier: f64,
    pub engagement: f64,
    pub recency: f64,
    pub novelty: f64,
    pub quality: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            keyword: 0.20,
            source_tier: 0.35,
            engagement: 0.15,
            recency: 0.10,
            novelty: 0.10,
            quality: 0.10,
        }
    }
}

impl ScoreWeights {
    /// Validate that weights are non-negative and sum to approximately 1.0.
    pub fn validate(&self) -> Result<(), &'static str> {
        let sum = self.keyword
            + self.source_tier
            + self.engagement
            + self.recency
            + self.novelty
            + self.quality;
        if (sum - 1.0).abs() > 0.01 {
            return Err("score weights should sum to 1.0");
        }
        if [
            self.keyword,
            self.source_tier,
            self.engagement,
            self.recency,
            self.novelty,
            self.quality,
        ]
        .iter()
        .any(|w| *w < 0.0)
        {
            return Err("score weights must be non-negative");
        }
        Ok(())
    }
}

/// Relevance scoring constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Signal weights.
    pub weights: ScoreWeights,
    /// Recency decay constant for ordinary sources, in hours. Default: 24.
    pub recency_tau_hours: f64,
    /// Recency decay constant for academic sources, papers stay relevant
    /// longer. Default: 72.
    pub academic_recency_tau_hours: f64,
    /// Recency sub-score assigned when no timestamp can be determined.
    /// Default: 0.1.
    pub undated_recency_score: f64,
    /// Fuzzy-similarity threshold for the novelty signal. Default: 0.7.
    pub novelty_threshold: f64,
    /// Citation count at which the engagement signal saturates.
    /// Default: 100.
    pub citation_cap: u64,
    /// Engagement-point count at which the signal saturates. Default: 500.
    pub points_cap: u64,
    /// Curated high-value terms matched against title+snippet.
    pub high_value_keywords: Vec<String>,
    /// Results-claim terms granting the keyword bonus.
    pub impact_keywords: Vec<String>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            recency_tau_hours: 24.0,
            academic_recency_tau_hours: 72.0,
            undated_recency_score: 0.1,
            novelty_threshold: 0.7,
            citation_cap: 100,
            points_cap: 500,
            high_value_keywords: [
                "multi-agent",
                "agent",
                "rlhf",
                "alignment",
                "prompt engineering",
                "tool use",
                "autonomous",
                "framework",
                "production",
                "benchmark",
                "claude",
                "gpt",
                "llm",
                "transformer",
                "in-context",
                "chain-of-thought",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            impact_keywords: [
                "state of the art",
                "sota",
                "outperforms",
                "breakthrough",
                "first to",
                "new record",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Diversity selection quotas and caps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Minimum tier-1 items (academic items count toward this). Default: 3.
    pub tier1_min: usize,
    /// Minimum tier-2 items. Default: 5.
    pub tier2_min: usize,
    /// Minimum tier-3 items. Default: 1.
    pub tier3_min: usize,
    /// Minimum tier-5 items. Default: 1.
    pub tier5_min: usize,
    /// Minimum academic-source items. Default: 4.
    pub academic_min: usize,
    /// Maximum items admitted per source. Default: 3.
    pub per_source_cap: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            tier1_min: 3,
            tier2_min: 5,
            tier3_min: 1,
            tier5_min: 1,
            academic_min: 4,
            per_source_cap: 3,
        }
    }
}

/// Author performance tracking constants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorTrackingConfig {
    /// Recency decay constant, in days since last inclusion. Default: 90.
    pub recency_decay_days: f64,
    /// Velocity window, in days per unit of velocity. Default: 30
    /// (papers per month).
    pub velocity_window_days: f64,
}

impl Default for AuthorTrackingConfig {
    fn default() -> Self {
        Self {
            recency_decay_days: 90.0,
            velocity_window_days: 30.0,
        }
    }
}

/// Pre-synthesis quality gate thresholds. Breaches produce warnings, not
/// failures, unless `hard_fail_below` is set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityGateConfig {
    /// An item counts as fresh when its known date is within this many
    /// days. Default: 7.
    pub freshness_days: i64,
    /// Minimum share of fresh items in the selection. Default: 0.3.
    pub min_fresh_share: f64,
    /// Minimum distinct sources in the selection. Default: 3.
    pub min_distinct_sources: usize,
    /// Maximum share any single source may hold. Default: 0.5.
    pub max_source_share: f64,
    /// When set, a gate score below this marks the run failed.
    /// Default: unset.
    pub hard_fail_below: Option<f64>,
}

impl Default for QualityGateConfig {
    fn default() -> Self {
        Self {
            freshness_days: 7,
            min_fresh_share: 0.3,
            min_distinct_sources: 3,
            max_source_share: 0.5,
            hard_fail_below: None,
        }
    }
}

/// Source collection retry policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Attempts per source before its items are dropped for the cycle.
    /// Default: 3.
    pub max_attempts: usize,
    /// Base delay for exponential backoff, in milliseconds. Default: 2000.
    pub backoff_base_ms: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_ms: 2000,
        }
    }
}
