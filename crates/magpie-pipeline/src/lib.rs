//! magpie-pipeline - Per-cycle orchestration for magpie.
//!
//! Wires the store, deduplication engine, scorer, and selector into one
//! research cycle: collect, dedup, (optionally) supplement from history,
//! score, select, gate, record, and refresh author statistics.

pub mod cycle;
pub mod prompts;
pub mod source;
pub mod telemetry;
pub mod validate;

pub use cycle::{CycleOutcome, Pipeline};
pub use prompts::PromptLibrary;
pub use source::{Collector, Source};
pub use telemetry::init_logging;
pub use validate::{QualityGate, QualityReport, QualityStatus};
