//! Run history types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use strum::{Display, EnumString};

/// Outcome status of a research cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// The cycle completed and produced output.
    Success,
    /// The cycle completed without output (e.g. nothing collected).
    Partial,
    /// The cycle aborted; no partial state was persisted.
    Failed,
}

/// A recorded research run. Created once per cycle, immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// Database id.
    pub id: i64,
    /// When the cycle started.
    pub timestamp: DateTime<Utc>,
    /// Outcome status.
    pub status: RunStatus,
    /// Items collected across all sources.
    pub items_found: i64,
    /// Items that survived deduplication.
    pub items_new: i64,
    /// Items selected for the digest.
    pub items_included: i64,
    /// Where the digest was written, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    /// Wall-clock duration of the cycle.
    pub runtime_seconds: f64,
    /// Error detail for partial/failed runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_log: Option<String>,
    /// Quality-gate score, when the gate ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qc_score: Option<f64>,
    /// Serialized quality-gate report.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qc_report: Option<String>,
}

/// The run-result contract returned to the CLI/orchestrator after a cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleResult {
    /// When the cycle started.
    pub timestamp: DateTime<Utc>,
    /// Outcome status.
    pub status: RunStatus,
    /// Items collected across all sources.
    pub items_found: usize,
    /// Items that survived deduplication.
    pub items_new: usize,
    /// Items selected for the digest.
    pub items_included: usize,
    /// Where the digest was written, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    /// Wall-clock duration of the cycle.
    pub runtime_seconds: f64,
    /// Error detail for partial/failed runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_log: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_status_round_trips_as_text() {
        assert_eq!(RunStatus::Success.to_string(), "success");
        assert_eq!(RunStatus::from_str("partial").unwrap(), RunStatus::Partial);
        assert!(RunStatus::from_str("bogus").is_err());
    }
}
