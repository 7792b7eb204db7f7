//! Cascading duplicate detection against the persisted store.
//!
//! Three checks, cheapest first, short-circuiting on the first hit:
//! exact URL, normalized content hash, fuzzy title similarity. Duplicates
//! are data, not errors.

use sha2::{Digest, Sha256};

use magpie_core::{DedupConfig, Item, MagpieResult};

use crate::store::Store;

/// Why an item was judged a duplicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateReason {
    /// The URL is already in the seen-item log.
    ExactUrl,
    /// Different URL, identical normalized content.
    ContentHash,
    /// The title fuzzy-matches a stored item above the threshold.
    SimilarTitle {
        /// Seen-item id of the matched row.
        id: i64,
    },
}

impl DuplicateReason {
    /// Stable label for logs and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicateReason::ExactUrl => "exact_url",
            DuplicateReason::ContentHash => "content_hash",
            DuplicateReason::SimilarTitle { .. } => "similar_title",
        }
    }
}

/// SHA-256 of the lower-cased, whitespace-trimmed content body.
pub fn hash_content(content: &str) -> String {
    let normalized = content.to_lowercase();
    let mut hasher = Sha256::new();
    hasher.update(normalized.trim().as_bytes());
    hex::encode(hasher.finalize())
}

/// Cascading duplicate checker over a store.
pub struct DedupEngine<'a> {
    store: &'a Store,
    config: DedupConfig,
}

impl<'a> DedupEngine<'a> {
    /// Create an engine with the given thresholds.
    pub fn new(store: &'a Store, config: DedupConfig) -> Self {
        Self { store, config }
    }

    /// Check one candidate against the store.
    ///
    /// Returns `None` for a new item, or the reason it is a duplicate.
    pub fn check(
        &self,
        url: &str,
        title: &str,
        content: Option<&str>,
    ) -> MagpieResult<Option<DuplicateReason>> {
        if self.store.find_by_url(url)?.is_some() {
            return Ok(Some(DuplicateReason::ExactUrl));
        }

        if let Some(content) = content {
            if !content.is_empty()
                && self
                    .store
                    .find_by_content_hash(&hash_content(content))?
                    .is_some()
            {
                return Ok(Some(DuplicateReason::ContentHash));
            }
        }

        let similar = self.store.find_similar_titles(
            title,
            self.config.title_similarity_threshold,
            self.config.similar_title_limit,
        )?;
        if let Some(best) = similar.first() {
            return Ok(Some(DuplicateReason::SimilarTitle { id: best.id }));
        }

        Ok(None)
    }

    /// Check an item against the store.
    pub fn check_item(&self, item: &Item) -> MagpieResult<Option<DuplicateReason>> {
        self.check(&item.url, &item.title, item.content.as_deref())
    }

    /// Filter a batch down to items not yet in the store.
    ///
    /// Each item is checked sequentially against the persisted store only;
    /// items within the batch are not checked against each other. Same-URL
    /// batch twins collapse later at insert time.
    pub fn filter_new(&self, items: &[Item]) -> MagpieResult<Vec<Item>> {
        let mut new_items = Vec::new();

        for item in items {
            match self.check_item(item)? {
                None => new_items.push(item.clone()),
                Some(reason) => {
                    tracing::debug!(
                        url = %item.url,
                        reason = reason.as_str(),
                        "dropping duplicate item"
                    );
                }
            }
        }

        Ok(new_items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(store: &Store) -> DedupEngine<'_> {
        DedupEngine::new(store, DedupConfig::default())
    }

    #[test]
    fn test_hash_normalizes_case_and_whitespace() {
        assert_eq!(hash_content("hello world"), hash_content("Hello World  "));
        assert_ne!(hash_content("hello world"), hash_content("hello worlds"));
    }

    #[test]
    fn test_exact_url_duplicate() {
        let store = Store::in_memory().unwrap();
        store
            .add_item_if_new(&Item::new("https://x.org/a", "Some title", "rss"))
            .unwrap();

        let reason = engine(&store)
            .check("https://x.org/a", "Another title entirely", None)
            .unwrap();
        assert_eq!(reason, Some(DuplicateReason::ExactUrl));
    }

    #[test]
    fn test_content_hash_duplicate() {
        let store = Store::in_memory().unwrap();
        store
            .add_item_if_new(
                &Item::new("https://x.org/b", "Original posting", "rss")
                    .with_content("hello world"),
            )
            .unwrap();

        let reason = engine(&store)
            .check("https://x.org/c", "Republished elsewhere", Some("Hello World "))
            .unwrap();
        assert_eq!(reason, Some(DuplicateReason::ContentHash));
    }

    #[test]
    fn test_empty_content_skips_hash_stage() {
        let store = Store::in_memory().unwrap();
        store
            .add_item_if_new(&Item::new("https://x.org/b", "Original posting", "rss"))
            .unwrap();

        // Stored item has empty content too; an empty candidate must not
        // collide on the hash of ""
        let reason = engine(&store)
            .check("https://x.org/c", "Unrelated piece", Some(""))
            .unwrap();
        assert_eq!(reason, None);
    }

    #[test]
    fn test_similar_title_duplicate() {
        let store = Store::in_memory().unwrap();
        store
            .add_item_if_new(&Item::new(
                "https://x.org/a",
                "Scaling laws for neural language models",
                "arxiv",
            ))
            .unwrap();

        let reason = engine(&store)
            .check(
                "https://mirror.example/a",
                "Scaling Laws for Neural Language Models",
                None,
            )
            .unwrap();
        assert!(matches!(reason, Some(DuplicateReason::SimilarTitle { .. })));
    }

    #[test]
    fn test_new_item_passes() {
        let store = Store::in_memory().unwrap();
        let reason = engine(&store)
            .check("https://x.org/new", "Fresh unseen title", Some("body"))
            .unwrap();
        assert_eq!(reason, None);
    }

    #[test]
    fn test_filter_new_is_idempotent_once_persisted() {
        let store = Store::in_memory().unwrap();
        let items = vec![
            Item::new("https://x.org/a", "Agents in production systems", "rss")
                .with_content("body a"),
            Item::new("https://x.org/b", "Benchmarking retrieval pipelines", "rss")
                .with_content("body b"),
        ];

        let fresh = engine(&store).filter_new(&items).unwrap();
        assert_eq!(fresh.len(), 2);

        for item in &fresh {
            store.add_item_if_new(item).unwrap();
        }

        let again = engine(&store).filter_new(&items).unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn test_reason_labels() {
        assert_eq!(DuplicateReason::ExactUrl.as_str(), "exact_url");
        assert_eq!(DuplicateReason::ContentHash.as_str(), "content_hash");
        assert_eq!(DuplicateReason::SimilarTitle { id: 3 }.as_str(), "similar_title");
    }
}
