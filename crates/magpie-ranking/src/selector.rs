//! Diversity-constrained selection.
//!
//! Takes a score-ranked candidate list and produces a bounded subset that
//! meets per-tier minimum quotas and a per-source cap. Fixed-priority
//! greedy passes admit candidates in editorial order; a final fill pass
//! tops the set up to the target count. Sparse pools never fail; unmet
//! quotas are reported as warnings and the best achievable set returned.

use ordered_float::OrderedFloat;
use std::collections::{HashMap, HashSet};

use magpie_core::SelectionConfig;

use crate::scorer::ScoredItem;

/// Quota-based greedy selector.
pub struct DiversitySelector {
    config: SelectionConfig,
}

struct Admission {
    selected: Vec<ScoredItem>,
    seen_urls: HashSet<String>,
    source_counts: HashMap<String, usize>,
    tier_counts: HashMap<i64, usize>,
    academic_count: usize,
}

impl Admission {
    fn new() -> Self {
        Self {
            selected: Vec::new(),
            seen_urls: HashSet::new(),
            source_counts: HashMap::new(),
            tier_counts: HashMap::new(),
            academic_count: 0,
        }
    }

    fn tier_count(&self, tier: i64) -> usize {
        self.tier_counts.get(&tier).copied().unwrap_or(0)
    }

    fn source_has_room(&self, source: &str, cap: usize) -> bool {
        self.source_counts.get(source).copied().unwrap_or(0) < cap
    }

    fn admit(&mut self, candidate: &ScoredItem) {
        self.seen_urls.insert(candidate.item.url.clone());
        *self
            .source_counts
            .entry(candidate.item.source.clone())
            .or_insert(0) += 1;
        if let Some(tier) = candidate.item.tier() {
            *self.tier_counts.entry(tier).or_insert(0) += 1;
        }
        if candidate.item.is_academic() {
            self.academic_count += 1;
        }
        self.selected.push(candidate.clone());
    }
}

impl DiversitySelector {
    /// Create a selector with the given quotas.
    pub fn new(config: SelectionConfig) -> Self {
        Self { config }
    }

    /// Select up to `target_count` items from a score-descending candidate
    /// list, satisfying quotas and the per-source cap where the pool
    /// allows.
    ///
    /// The output is re-sorted by score descending; admission-pass order
    /// does not determine final order.
    pub fn select(&self, ranked: &[ScoredItem], target_count: usize) -> Vec<ScoredItem> {
        let mut admission = Admission::new();

        // Pass 1: tier-2, the highest editorial priority
        self.admit_while(ranked, target_count, &mut admission, |item, adm| {
            item.item.tier() == Some(2) && adm.tier_count(2) < self.config.tier2_min
        });

        // Pass 2: academic sources (may overlap tier-1)
        self.admit_while(ranked, target_count, &mut admission, |item, adm| {
            item.item.is_academic() && adm.academic_count < self.config.academic_min
        });

        // Pass 3: remaining tier-1; academic admissions already count
        // toward this quota
        self.admit_while(ranked, target_count, &mut admission, |item, adm| {
            item.item.tier() == Some(1) && adm.tier_count(1) < self.config.tier1_min
        });

        // Pass 4: tier-5
        self.admit_while(ranked, target_count, &mut admission, |item, adm| {
            item.item.tier() == Some(5) && adm.tier_count(5) < self.config.tier5_min
        });

        // Pass 5: tier-3
        self.admit_while(ranked, target_count, &mut admission, |item, adm| {
            item.item.tier() == Some(3) && adm.tier_count(3) < self.config.tier3_min
        });

        // Fill pass: anything under cap until the target is reached
        self.admit_while(ranked, target_count, &mut admission, |_, _| true);

        self.warn_on_shortfalls(&admission);

        let mut selected = admission.selected;
        selected.sort_by(|a, b| OrderedFloat(b.score).cmp(&OrderedFloat(a.score)));
        selected
    }

    fn admit_while<F>(
        &self,
        ranked: &[ScoredItem],
        target_count: usize,
        admission: &mut Admission,
        predicate: F,
    ) where
        F: Fn(&ScoredItem, &Admission) -> bool,
    {
        for candidate in ranked {
            if admission.selected.len() >= target_count {
                break;
            }
            if admission.seen_urls.contains(&candidate.item.url) {
                continue;
            }
            if !admission.source_has_room(&candidate.item.source, self.config.per_source_cap) {
                continue;
            }
            if !predicate(candidate, admission) {
                continue;
            }
            admission.admit(candidate);
        }
    }

    fn warn_on_shortfalls(&self, admission: &Admission) {
        let checks = [
            ("tier-1", admission.tier_count(1), self.config.tier1_min),
            ("tier-2", admission.tier_count(2), self.config.tier2_min),
            ("tier-3", admission.tier_count(3), self.config.tier3_min),
            ("tier-5", admission.tier_count(5), self.config.tier5_min),
            ("academic", admission.academic_count, self.config.academic_min),
        ];
        for (label, got, want) in checks {
            if got < want {
                tracing::warn!(quota = label, got, want, "selection quota unmet");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use magpie_core::Item;

    fn scored(url: &str, source: &str, tier: Option<i64>, score: f64) -> ScoredItem {
        let mut item = Item::new(url, format!("Item {}", url), source);
        if let Some(t) = tier {
            item = item.with_metadata("tier", serde_json::json!(t));
        }
        ScoredItem { item, score }
    }

    /// The mixed pool from the selection contract: 8 tier-2, 4 academic
    /// tier-1, 3 tier-1 other, 3 tier-5, 2 tier-3.
    fn mixed_pool() -> Vec<ScoredItem> {
        let mut pool = Vec::new();
        let mut score = 1.0;
        let mut push = |url: String, source: &str, tier: Option<i64>, pool: &mut Vec<ScoredItem>| {
            pool.push(scored(&url, source, tier, score));
            score -= 0.01;
        };

        for i in 0..4 {
            push(format!("https://x.org/t2a{}", i), "newsletter-a", Some(2), &mut pool);
        }
        for i in 0..4 {
            push(format!("https://x.org/t2b{}", i), "newsletter-b", Some(2), &mut pool);
        }
        for i in 0..2 {
            push(format!("https://arxiv.org/abs/{}", i), "arxiv", Some(1), &mut pool);
        }
        for i in 0..2 {
            push(format!("https://s2.org/p{}", i), "semantic_scholar", Some(1), &mut pool);
        }
        for i in 0..3 {
            push(format!("https://lab.org/b{}", i), "lab-blog", Some(1), &mut pool);
        }
        for i in 0..3 {
            push(format!("https://tools.org/c{}", i), "changelog", Some(5), &mut pool);
        }
        for i in 0..2 {
            push(format!("https://agg.org/n{}", i), "aggregator", Some(3), &mut pool);
        }
        pool
    }

    fn count_tier(selected: &[ScoredItem], tier: i64) -> usize {
        selected
            .iter()
            .filter(|s| s.item.tier() == Some(tier))
            .count()
    }

    #[test]
    fn test_quotas_and_caps_satisfied_over_mixed_pool() {
        let selector = DiversitySelector::new(SelectionConfig::default());
        let selected = selector.select(&mixed_pool(), 12);

        assert_eq!(selected.len(), 12);
        assert!(count_tier(&selected, 2) >= 5);
        assert!(selected.iter().filter(|s| s.item.is_academic()).count() >= 4);
        assert!(count_tier(&selected, 5) >= 1);
        assert!(count_tier(&selected, 3) >= 1);

        let mut per_source: HashMap<&str, usize> = HashMap::new();
        for s in &selected {
            *per_source.entry(s.item.source.as_str()).or_insert(0) += 1;
        }
        assert!(per_source.values().all(|&n| n <= 3));
    }

    #[test]
    fn test_output_sorted_by_score_descending() {
        let selector = DiversitySelector::new(SelectionConfig::default());
        let selected = selector.select(&mixed_pool(), 12);

        for pair in selected.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_empty_tier_pool_never_fails() {
        let selector = DiversitySelector::new(SelectionConfig::default());

        // Only tier-2 items: tier-5/tier-3/academic pools all empty
        let pool: Vec<ScoredItem> = (0..6)
            .map(|i| {
                scored(
                    &format!("https://x.org/{}", i),
                    &format!("src-{}", i),
                    Some(2),
                    1.0 - i as f64 * 0.01,
                )
            })
            .collect();

        let selected = selector.select(&pool, 6);
        assert_eq!(selected.len(), 6);
    }

    #[test]
    fn test_fill_pass_reaches_target_without_quota_pools() {
        let selector = DiversitySelector::new(SelectionConfig::default());

        // Untiered, unacademic items from many sources
        let pool: Vec<ScoredItem> = (0..10)
            .map(|i| {
                scored(
                    &format!("https://x.org/{}", i),
                    &format!("feed-{}", i % 5),
                    None,
                    1.0 - i as f64 * 0.01,
                )
            })
            .collect();

        let selected = selector.select(&pool, 8);
        assert_eq!(selected.len(), 8);
    }

    #[test]
    fn test_duplicate_url_in_input_admitted_once() {
        let selector = DiversitySelector::new(SelectionConfig::default());

        let pool = vec![
            scored("https://x.org/same", "feed-a", Some(2), 0.9),
            scored("https://x.org/same", "feed-b", Some(2), 0.8),
            scored("https://x.org/other", "feed-c", Some(2), 0.7),
        ];

        let selected = selector.select(&pool, 5);
        assert_eq!(selected.len(), 2);
        let urls: HashSet<&str> = selected.iter().map(|s| s.item.url.as_str()).collect();
        assert_eq!(urls.len(), 2);
    }

    #[test]
    fn test_per_source_cap_enforced_in_fill() {
        let selector = DiversitySelector::new(SelectionConfig::default());

        // Ten items, one source: cap 3 bounds the output regardless of
        // target
        let pool: Vec<ScoredItem> = (0..10)
            .map(|i| {
                scored(
                    &format!("https://x.org/{}", i),
                    "single-source",
                    None,
                    1.0 - i as f64 * 0.01,
                )
            })
            .collect();

        let selected = selector.select(&pool, 8);
        assert_eq!(selected.len(), 3);
    }

    #[test]
    fn test_target_zero_selects_nothing() {
        let selector = DiversitySelector::new(SelectionConfig::default());
        let selected = selector.select(&mixed_pool(), 0);
        assert!(selected.is_empty());
    }
}
