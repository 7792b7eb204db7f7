//! Per-cycle orchestration: dedup, supplement, score, select, gate,
//! record, refresh.

use chrono::Utc;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use magpie_core::authors::parse_author_string;
use magpie_core::{CycleResult, Item, MagpieConfig, MagpieResult, RunStatus};
use magpie_ranking::{DiversitySelector, PriorityRoster, RelevanceScorer, ScoredItem};
use magpie_store::{AuthorTracker, DedupEngine, Store};

use crate::prompts::PromptLibrary;
use crate::source::{Collector, Source};
use crate::validate::{QualityGate, QualityReport, QualityStatus};

/// Everything a cycle produced: the run-result contract plus the selected
/// items for downstream synthesis.
#[derive(Debug)]
pub struct CycleOutcome {
    /// The run-result contract returned to the orchestrator.
    pub result: CycleResult,
    /// Database id of the recorded run.
    pub run_id: Option<i64>,
    /// The selected subset, score-descending, for downstream presentation.
    pub selected: Vec<ScoredItem>,
    /// Quality-gate report, when the gate ran.
    pub quality: Option<QualityReport>,
}

/// The curation pipeline: one instance per process, one cycle at a time.
pub struct Pipeline {
    config: MagpieConfig,
    store: Store,
    tracker: AuthorTracker,
    roster: PriorityRoster,
    prompts: PromptLibrary,
}

impl Pipeline {
    /// Open the store at the configured path and build the pipeline.
    pub fn new(config: MagpieConfig) -> MagpieResult<Self> {
        let store = Store::open(config.db_path())?;
        Self::with_store(config, store)
    }

    /// Build the pipeline over an existing store.
    pub fn with_store(config: MagpieConfig, store: Store) -> MagpieResult<Self> {
        config.validate()?;
        let tracker = AuthorTracker::new(&store, config.authors);
        let prompts = PromptLibrary::new(config.data_dir.join("prompts"))?;
        Ok(Self {
            config,
            store,
            tracker,
            roster: PriorityRoster::default(),
            prompts,
        })
    }

    /// Replace the priority roster.
    pub fn with_roster(mut self, roster: PriorityRoster) -> Self {
        self.roster = roster;
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// The author tracker.
    pub fn tracker(&self) -> &AuthorTracker {
        &self.tracker
    }

    /// The prompt library.
    pub fn prompts(&self) -> &PromptLibrary {
        &self.prompts
    }

    /// Reload prompt texts from disk.
    pub fn reload_prompts(&mut self) -> MagpieResult<usize> {
        self.prompts.reload()
    }

    /// Collect from every source, then run a full cycle over the result.
    pub async fn run(
        &self,
        sources: &[Box<dyn Source>],
        output_path: Option<&Path>,
    ) -> MagpieResult<CycleOutcome> {
        let collector = Collector::new(self.config.collector);
        let items = collector.collect_all(sources).await;
        self.run_cycle(items, output_path)
    }

    /// Run one cycle over an already-collected batch.
    ///
    /// An empty batch records a partial run. Any internal failure rolls
    /// back whatever transaction was open, records a failed run, and is
    /// reported through the result contract rather than raised.
    pub fn run_cycle(
        &self,
        items: Vec<Item>,
        output_path: Option<&Path>,
    ) -> MagpieResult<CycleOutcome> {
        let started = Utc::now();
        let clock = Instant::now();

        if items.is_empty() {
            tracing::warn!("no items collected from any source");
            let error = "no items collected from any source";
            let runtime = clock.elapsed().as_secs_f64();
            let run_id = self.store.record_run(
                &[],
                &[],
                &[],
                None,
                runtime,
                RunStatus::Partial,
                Some(error),
                None,
            )?;
            return Ok(CycleOutcome {
                result: CycleResult {
                    timestamp: started,
                    status: RunStatus::Partial,
                    items_found: 0,
                    items_new: 0,
                    items_included: 0,
                    output_path: None,
                    runtime_seconds: runtime,
                    error_log: Some(error.to_string()),
                },
                run_id: Some(run_id),
                selected: Vec::new(),
                quality: None,
            });
        }

        match self.execute(&items, output_path, started, &clock) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                let message = e.to_string();
                tracing::error!(error = %message, "cycle failed");
                let runtime = clock.elapsed().as_secs_f64();
                let run_id = self.store.record_run(
                    &items,
                    &[],
                    &[],
                    None,
                    runtime,
                    RunStatus::Failed,
                    Some(&message),
                    None,
                )?;
                Ok(CycleOutcome {
                    result: CycleResult {
                        timestamp: started,
                        status: RunStatus::Failed,
                        items_found: items.len(),
                        items_new: 0,
                        items_included: 0,
                        output_path: None,
                        runtime_seconds: runtime,
                        error_log: Some(message),
                    },
                    run_id: Some(run_id),
                    selected: Vec::new(),
                    quality: None,
                })
            }
        }
    }

    fn execute(
        &self,
        items: &[Item],
        output_path: Option<&Path>,
        started: chrono::DateTime<Utc>,
        clock: &Instant,
    ) -> MagpieResult<CycleOutcome> {
        let research = &self.config.research;

        let engine = DedupEngine::new(&self.store, self.config.dedup.clone());
        let new_items = engine.filter_new(items)?;
        tracing::info!(found = items.len(), new = new_items.len(), "deduplicated batch");

        // Too few new items: supplement from recent history rather than
        // abort
        let mut pool = new_items.clone();
        if pool.len() < research.min_items {
            let known: HashSet<String> = pool.iter().map(|i| i.url.clone()).collect();
            let recent = self.store.get_recent_items(
                research.supplement_days,
                research.supplement_limit,
                research.supplement_max_age_days,
            )?;
            let before = pool.len();
            pool.extend(recent.into_iter().filter(|i| !known.contains(&i.url)));
            tracing::info!(
                supplemented = pool.len() - before,
                "supplemented thin cycle from recent history"
            );
        }

        let scorer =
            RelevanceScorer::new(self.config.scoring.clone(), self.roster.clone(), &self.store)?;
        let ranked = scorer.rank(pool)?;

        let target = research.target_items.min(research.max_items);
        let selector = DiversitySelector::new(self.config.selection);
        let selected = selector.select(&ranked, target);
        tracing::info!(selected = selected.len(), target, "selection complete");

        let gate = QualityGate::new(self.config.quality_gate);
        let report = gate.evaluate(&selected);
        let status = match report.status {
            QualityStatus::Failed => RunStatus::Failed,
            _ => RunStatus::Success,
        };
        let error_log = (status == RunStatus::Failed)
            .then(|| format!("quality gate failed: {}", report.warnings.join("; ")));

        let included: Vec<Item> = selected.iter().map(|s| s.item.clone()).collect();
        let qc_report = serde_json::to_string(&report)?;
        let runtime = clock.elapsed().as_secs_f64();

        let run_id = self.store.record_run(
            items,
            &new_items,
            &included,
            output_path,
            runtime,
            status,
            error_log.as_deref(),
            Some((report.score, &qc_report)),
        )?;

        // Every new item is an author observation; inclusion follows
        // selected-set membership
        let selected_urls: HashSet<&str> = included.iter().map(|i| i.url.as_str()).collect();
        for item in &new_items {
            if let Some(author) = &item.author {
                let was_included = selected_urls.contains(item.url.as_str());
                for name in parse_author_string(author) {
                    self.tracker
                        .record_inclusion(&name, was_included, item.published_date)?;
                }
            }
        }
        self.tracker.update_scores()?;

        Ok(CycleOutcome {
            result: CycleResult {
                timestamp: started,
                status,
                items_found: items.len(),
                items_new: new_items.len(),
                items_included: included.len(),
                output_path: output_path.map(PathBuf::from),
                runtime_seconds: clock.elapsed().as_secs_f64(),
                error_log,
            },
            run_id: Some(run_id),
            selected,
            quality: Some(report),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline() -> (tempfile::TempDir, Pipeline) {
        let dir = tempfile::tempdir().unwrap();
        let config = MagpieConfig {
            data_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let pipeline = Pipeline::with_store(config, Store::in_memory().unwrap()).unwrap();
        (dir, pipeline)
    }

    fn batch() -> Vec<Item> {
        let mut items = Vec::new();
        for i in 0..4 {
            items.push(
                Item::new(
                    format!("https://papers.example/{}", i),
                    format!("Benchmark analysis part {}", i),
                    "arxiv",
                )
                .with_author("Jane Doe")
                .with_published_date(Utc::now()),
            );
        }
        for i in 0..4 {
            items.push(
                Item::new(
                    format!("https://news.example/{}", i),
                    format!("Industry commentary issue {}", i),
                    if i % 2 == 0 { "newsletter-a" } else { "newsletter-b" },
                )
                .with_metadata("tier", serde_json::json!(2))
                .with_published_date(Utc::now()),
            );
        }
        items
    }

    #[test]
    fn test_empty_collection_records_partial_run() {
        let (_dir, pipeline) = pipeline();
        let outcome = pipeline.run_cycle(Vec::new(), None).unwrap();

        assert_eq!(outcome.result.status, RunStatus::Partial);
        assert_eq!(outcome.result.items_found, 0);
        assert!(outcome.result.error_log.is_some());

        let runs = pipeline.store().get_recent_runs(5).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, RunStatus::Partial);
    }

    #[test]
    fn test_cycle_persists_items_and_tracks_authors() {
        let (_dir, pipeline) = pipeline();
        let outcome = pipeline.run_cycle(batch(), None).unwrap();

        assert_eq!(outcome.result.status, RunStatus::Success);
        assert_eq!(outcome.result.items_found, 8);
        assert_eq!(outcome.result.items_new, 8);
        assert!(outcome.result.items_included > 0);
        assert!(outcome.quality.is_some());

        let stats = pipeline.store().get_database_stats().unwrap();
        assert_eq!(stats.total_items, 8);

        let author = pipeline.tracker().get_author_stats("Jane Doe").unwrap();
        assert!(author.is_some());
        assert_eq!(author.unwrap().total_papers, 4);
    }

    #[test]
    fn test_rerun_supplements_from_history() {
        let (_dir, pipeline) = pipeline();
        pipeline.run_cycle(batch(), None).unwrap();

        // Same batch again: everything is a duplicate, but the cycle
        // proceeds on recent history instead of aborting
        let outcome = pipeline.run_cycle(batch(), None).unwrap();
        assert_eq!(outcome.result.status, RunStatus::Success);
        assert_eq!(outcome.result.items_new, 0);
        assert!(outcome.result.items_included > 0);
    }

    #[test]
    fn test_output_path_recorded() {
        let (_dir, pipeline) = pipeline();
        let outcome = pipeline
            .run_cycle(batch(), Some(Path::new("/tmp/digest.md")))
            .unwrap();

        assert_eq!(
            outcome.result.output_path.as_deref(),
            Some(Path::new("/tmp/digest.md"))
        );
    }
}
