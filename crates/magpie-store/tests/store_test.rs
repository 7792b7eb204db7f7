//! End-to-end tests over an on-disk store.

use chrono::{Duration, Utc};
use tempfile::tempdir;

use magpie_core::{DedupConfig, Item, RunStatus};
use magpie_store::{DedupEngine, DuplicateReason, Store};

fn item(url: &str, title: &str, source: &str) -> Item {
    Item::new(url, title, source)
}

#[test]
fn inserting_same_url_twice_leaves_one_row() {
    let dir = tempdir().unwrap();
    let store = Store::open(dir.path().join("state.db")).unwrap();

    let a = item("https://x.org/a", "An item about evaluation harnesses", "rss");
    store.add_item_if_new(&a).unwrap();
    store.add_item_if_new(&a).unwrap();

    let stats = store.get_database_stats().unwrap();
    assert_eq!(stats.total_items, 1);
}

#[test]
fn identical_normalized_content_flags_content_hash_duplicate() {
    let dir = tempdir().unwrap();
    let store = Store::open(dir.path().join("state.db")).unwrap();
    let engine = DedupEngine::new(&store, DedupConfig::default());

    let b = item("https://x.org/b", "Original announcement", "rss").with_content("hello world");
    store.add_item_if_new(&b).unwrap();

    let reason = engine
        .check("https://x.org/c", "Syndicated copy", Some("Hello World "))
        .unwrap();
    assert_eq!(reason, Some(DuplicateReason::ContentHash));
}

#[test]
fn store_survives_reopen_without_reapplying_migrations() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.db");

    {
        let store = Store::open(&path).unwrap();
        store
            .add_item_if_new(&item("https://x.org/a", "Persistent item", "rss"))
            .unwrap();
    }

    // Reopen against the existing file: only pending migrations (none)
    // apply, and prior data is intact.
    let store = Store::open(&path).unwrap();
    let stats = store.get_database_stats().unwrap();
    assert_eq!(stats.total_items, 1);
    assert!(store.find_by_url("https://x.org/a").unwrap().is_some());
}

#[test]
fn record_run_then_query_run_history() {
    let dir = tempdir().unwrap();
    let store = Store::open(dir.path().join("state.db")).unwrap();

    let a = item("https://x.org/a", "Included item one", "arxiv");
    let b = item("https://x.org/b", "Included item two", "hackernews");
    let c = item("https://x.org/c", "Left out item", "rss");
    let found = vec![a.clone(), b.clone(), c.clone()];
    let included = vec![a.clone(), b.clone()];

    let run_id = store
        .record_run(
            &found,
            &found,
            &included,
            Some(std::path::Path::new("/tmp/digest.md")),
            12.5,
            RunStatus::Success,
            None,
            Some((0.9, "{\"status\":\"pass\"}")),
        )
        .unwrap();
    assert!(run_id > 0);

    let runs = store.get_recent_runs(5).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].items_found, 3);
    assert_eq!(runs[0].items_included, 2);
    assert_eq!(runs[0].status, RunStatus::Success);
    assert_eq!(runs[0].qc_score, Some(0.9));

    let stats = store.get_database_stats().unwrap();
    assert_eq!(stats.total_items, 3);
    assert_eq!(stats.total_runs, 1);
}

#[test]
fn recent_items_filter_by_extracted_title_date() {
    let dir = tempdir().unwrap();
    let store = Store::open(dir.path().join("state.db")).unwrap();

    // Explicit fresh date: kept
    store
        .add_item_if_new(
            &item("https://x.org/fresh", "Fresh result", "rss")
                .with_published_date(Utc::now() - Duration::days(1)),
        )
        .unwrap();
    // Explicit stale date: excluded
    store
        .add_item_if_new(
            &item("https://x.org/stale", "Stale result", "rss")
                .with_published_date(Utc::now() - Duration::days(120)),
        )
        .unwrap();
    // No date anywhere: kept as unknown
    store
        .add_item_if_new(&item("https://x.org/undated", "Undated analysis", "rss"))
        .unwrap();
    // Date only in the title, stale: excluded
    store
        .add_item_if_new(&item(
            "https://x.org/title-dated",
            "Weekly roundup: January 5, 2020",
            "rss",
        ))
        .unwrap();

    let recent = store.get_recent_items(7, 20, 14).unwrap();
    let urls: Vec<&str> = recent.iter().map(|i| i.url.as_str()).collect();

    assert!(urls.contains(&"https://x.org/fresh"));
    assert!(urls.contains(&"https://x.org/undated"));
    assert!(!urls.contains(&"https://x.org/stale"));
    assert!(!urls.contains(&"https://x.org/title-dated"));
}

#[test]
fn full_text_search_ranks_and_highlights() {
    let dir = tempdir().unwrap();
    let store = Store::open(dir.path().join("state.db")).unwrap();

    store
        .add_item_if_new(
            &item("https://x.org/a", "Retrieval augmented generation survey", "arxiv")
                .with_content("A survey of retrieval augmented generation methods."),
        )
        .unwrap();
    store
        .add_item_if_new(
            &item("https://x.org/b", "Kernel scheduling improvements", "rss")
                .with_content("Notes on CPU scheduling."),
        )
        .unwrap();

    let hits = store.search_full_text("retrieval", 10).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].url, "https://x.org/a");
    assert!(hits[0].snippet.contains("<mark>retrieval</mark>"));
}

#[test]
fn metadata_and_tags_round_trip_through_recent_items() {
    let dir = tempdir().unwrap();
    let store = Store::open(dir.path().join("state.db")).unwrap();

    let mut original = item("https://x.org/a", "Tagged item", "hackernews")
        .with_metadata("tier", serde_json::json!(2))
        .with_metadata("points", serde_json::json!(420));
    original.tags = vec!["agents".to_string(), "infra".to_string()];
    store.add_item_if_new(&original).unwrap();

    let recent = store.get_recent_items(7, 10, 365).unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].tier(), Some(2));
    assert_eq!(recent[0].metadata_count("points"), Some(420));
    assert_eq!(recent[0].tags, vec!["agents", "infra"]);
}
