//! magpie-ranking - Relevance scoring and diversity selection.
//!
//! The scorer combines six normalized signals into a weighted sum and
//! applies the priority-roster boost; the selector turns the ranked list
//! into a bounded, quota-satisfying subset.

pub mod boost;
pub mod scorer;
pub mod selector;

pub use boost::{AuthorPriority, Boost, PriorityRoster};
pub use scorer::{RelevanceScorer, ScoredItem};
pub use selector::DiversitySelector;
