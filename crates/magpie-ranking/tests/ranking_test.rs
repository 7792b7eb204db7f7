//! Scorer and selector against a real store-backed similarity index.

use magpie_core::{Item, ScoringConfig, SelectionConfig};
use magpie_ranking::{DiversitySelector, PriorityRoster, RelevanceScorer};
use magpie_store::Store;

#[test]
fn novelty_drops_for_titles_already_in_the_corpus() {
    let store = Store::in_memory().unwrap();
    store
        .add_item_if_new(&Item::new(
            "https://x.org/stored",
            "Reinforcement learning from human feedback at scale",
            "arxiv",
        ))
        .unwrap();

    let scorer =
        RelevanceScorer::new(ScoringConfig::default(), PriorityRoster::empty(), &store).unwrap();

    let near_copy = Item::new(
        "https://mirror.example/copy",
        "Reinforcement Learning from Human Feedback at Scale",
        "rss",
    );
    let unrelated = Item::new("https://x.org/new", "Gossip protocols in databases", "rss");

    // Same source, no engagement data, no dates: novelty is the only
    // separating signal
    let copy_score = scorer.score(&near_copy).unwrap();
    let unrelated_score = scorer.score(&unrelated).unwrap();
    assert!(copy_score < unrelated_score);
}

#[test]
fn rank_then_select_produces_bounded_sorted_subset() {
    let store = Store::in_memory().unwrap();
    let scorer =
        RelevanceScorer::new(ScoringConfig::default(), PriorityRoster::empty(), &store).unwrap();

    let mut items = Vec::new();
    for i in 0..6 {
        items.push(
            Item::new(
                format!("https://papers.example/{}", i),
                format!("Benchmark study number {}", i),
                if i % 2 == 0 { "arxiv" } else { "semantic_scholar" },
            )
            .with_metadata("tier", serde_json::json!(1))
            .with_metadata("citations", serde_json::json!(10 * i)),
        );
    }
    for i in 0..6 {
        items.push(
            Item::new(
                format!("https://letters.example/{}", i),
                format!("Commentary issue {}", i),
                if i % 2 == 0 { "newsletter-a" } else { "newsletter-b" },
            )
            .with_metadata("tier", serde_json::json!(2)),
        );
    }

    let ranked = scorer.rank(items).unwrap();
    assert_eq!(ranked.len(), 12);

    let selector = DiversitySelector::new(SelectionConfig::default());
    let selected = selector.select(&ranked, 8);

    assert_eq!(selected.len(), 8);
    for pair in selected.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    // Per-source cap holds
    for source in ["arxiv", "semantic_scholar", "newsletter-a", "newsletter-b"] {
        let n = selected.iter().filter(|s| s.item.source == source).count();
        assert!(n <= 3, "{} appeared {} times", source, n);
    }
}
