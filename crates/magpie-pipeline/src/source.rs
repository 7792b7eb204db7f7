//! Source trait and concurrent collection.
//!
//! Connectors live outside this crate; they only need to produce
//! standardized [`Item`]s. The collector fans out one fetch per source,
//! retries transient failures with exponential backoff, and aggregates
//! whatever succeeded. A failing source never aborts its siblings.

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use std::time::Duration;

use magpie_core::{CollectorConfig, Item, MagpieResult};

/// A content source connector.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Source: Send + Sync {
    /// Stable source name, recorded on every item.
    fn name(&self) -> &str;

    /// Fetch the current batch of items.
    async fn fetch(&self) -> MagpieResult<Vec<Item>>;
}

/// Concurrent collector over a set of enabled sources.
pub struct Collector {
    config: CollectorConfig,
}

impl Collector {
    /// Create a collector with the given retry policy.
    pub fn new(config: CollectorConfig) -> Self {
        Self { config }
    }

    /// Fetch from every source concurrently and aggregate the results.
    ///
    /// Items failing the intake contract are dropped with a warning.
    pub async fn collect_all(&self, sources: &[Box<dyn Source>]) -> Vec<Item> {
        if sources.is_empty() {
            tracing::warn!("no sources enabled");
            return Vec::new();
        }

        let fetches = sources.iter().map(|source| self.fetch_with_retry(source.as_ref()));
        let results = futures::future::join_all(fetches).await;

        let mut all_items = Vec::new();
        for (source, result) in sources.iter().zip(results) {
            match result {
                Ok(items) => {
                    tracing::info!(
                        source = source.name(),
                        count = items.len(),
                        "collected items"
                    );
                    for item in items {
                        match item.validate() {
                            Ok(()) => all_items.push(item),
                            Err(e) => {
                                tracing::warn!(source = source.name(), error = %e, "dropping malformed item");
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(source = source.name(), error = %e, "source failed, continuing without it");
                }
            }
        }

        tracing::info!(total = all_items.len(), "collection finished");
        all_items
    }

    async fn fetch_with_retry(&self, source: &dyn Source) -> MagpieResult<Vec<Item>> {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(self.config.backoff_base_ms))
            .with_max_times(self.config.max_attempts.saturating_sub(1));

        (|| source.fetch())
            .retry(backoff)
            .when(|e| e.is_transient())
            .notify(|e, delay| {
                tracing::warn!(error = %e, ?delay, "retrying source fetch");
            })
            .await
    }
}
