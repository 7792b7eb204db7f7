//! SQLite-backed persistent store: seen-item log, full-text shadow index,
//! run history.
//!
//! The store is the single owner of all tables. Writes happen from one
//! logical writer per cycle; every logical operation is one transaction
//! that commits on success and rolls back completely on failure.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use magpie_core::text::extract_title_date;
use magpie_core::{Item, MagpieError, MagpieResult, RunRecord, RunStatus, SimilarityIndex, TitleMatch};

use crate::dedup::hash_content;
use crate::migrations::run_migrations;

/// A full-text search result with a highlighted snippet.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub source: String,
    /// Matching excerpt with `<mark>` highlighting.
    pub snippet: String,
    /// Raw BM25 relevance; lower is better.
    pub relevance: f64,
}

/// Item count for a single source.
#[derive(Debug, Clone, Serialize)]
pub struct SourceCount {
    pub source: String,
    pub count: i64,
}

/// Aggregate statistics over the store.
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseStats {
    pub total_items: i64,
    pub total_runs: i64,
    pub items_last_week: i64,
    pub runs_last_month: i64,
    /// Top five sources by item count.
    pub top_sources: Vec<SourceCount>,
}

/// SQLite-backed store for the seen-item log and run history.
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (or create) the store at the given path.
    ///
    /// Fails with a configuration error if the SQLite build lacks FTS5;
    /// this is checked once here, never per-operation.
    pub fn open<P: AsRef<Path>>(path: P) -> MagpieResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> MagpieResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> MagpieResult<Self> {
        ensure_fts5(&conn)?;
        run_migrations(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub(crate) fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    fn lock(&self) -> MagpieResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| MagpieError::database(e.to_string()))
    }

    /// Insert an item unless its URL is already known; returns the id of
    /// the new or existing row. Duplicate URLs never raise.
    pub fn add_item_if_new(&self, item: &Item) -> MagpieResult<i64> {
        let conn = self.lock()?;
        insert_item(&conn, item)
    }

    /// Look up the seen-item id for an exact URL.
    pub fn find_by_url(&self, url: &str) -> MagpieResult<Option<i64>> {
        let conn = self.lock()?;
        let id = conn
            .query_row("SELECT id FROM seen_items WHERE url = ?1", [url], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(id)
    }

    /// Look up the seen-item id for a content hash.
    pub fn find_by_content_hash(&self, content_hash: &str) -> MagpieResult<Option<i64>> {
        let conn = self.lock()?;
        let id = conn
            .query_row(
                "SELECT id FROM seen_items WHERE content_hash = ?1",
                [content_hash],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    /// Record a research run in a single transaction.
    ///
    /// Inserts the run row, adds every new item to the seen log, and links
    /// each new item whose URL appears in `included` with its rank in that
    /// list. Items already present from a prior run that are re-selected
    /// are not re-linked.
    #[allow(clippy::too_many_arguments)]
    pub fn record_run(
        &self,
        items_found: &[Item],
        items_new: &[Item],
        items_included: &[Item],
        output_path: Option<&Path>,
        runtime_seconds: f64,
        status: RunStatus,
        error_log: Option<&str>,
        qc: Option<(f64, &str)>,
    ) -> MagpieResult<i64> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO research_runs (
                status, items_found, items_new, items_included,
                output_path, runtime_seconds, error_log, qc_score, qc_report
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                status.to_string(),
                items_found.len() as i64,
                items_new.len() as i64,
                items_included.len() as i64,
                output_path.map(|p| p.to_string_lossy().into_owned()),
                runtime_seconds,
                error_log,
                qc.map(|(score, _)| score),
                qc.map(|(_, report)| report),
            ],
        )?;
        let run_id = tx.last_insert_rowid();

        let url_to_rank: HashMap<&str, usize> = items_included
            .iter()
            .enumerate()
            .map(|(rank, item)| (item.url.as_str(), rank))
            .collect();

        for item in items_new {
            let item_id = insert_item(&tx, item)?;

            if let Some(rank) = url_to_rank.get(item.url.as_str()) {
                tx.execute(
                    "INSERT INTO run_items (run_id, item_id, rank) VALUES (?1, ?2, ?3)",
                    params![run_id, item_id, *rank as i64],
                )?;
                tx.execute(
                    "UPDATE seen_items SET included_in_digest = 1 WHERE id = ?1",
                    [item_id],
                )?;
            }
        }

        tx.commit()?;

        tracing::debug!(
            run_id,
            found = items_found.len(),
            new = items_new.len(),
            included = items_included.len(),
            "recorded run"
        );

        Ok(run_id)
    }

    /// Items first seen within `days`, newest first, used to supplement a
    /// thin cycle from recent history.
    ///
    /// Items with a known publish date (explicit, or extracted from the
    /// title) older than `max_age_days` are excluded; items whose date
    /// cannot be determined pass through.
    pub fn get_recent_items(
        &self,
        days: i64,
        limit: usize,
        max_age_days: i64,
    ) -> MagpieResult<Vec<Item>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT url, title, snippet, content, source, source_metadata,
                    published_date, author, category, tags
             FROM seen_items
             WHERE datetime(first_seen) >= datetime('now', '-' || ?1 || ' days')
             ORDER BY first_seen DESC
             LIMIT ?2",
        )?;

        let items = stmt
            .query_map(params![days, limit as i64], row_to_item)?
            .collect::<Result<Vec<_>, _>>()?;

        let cutoff = Utc::now() - Duration::days(max_age_days);
        Ok(items
            .into_iter()
            .filter(|item| {
                let date = item.published_date.or_else(|| {
                    extract_title_date(&item.title)
                        .and_then(|d| d.and_hms_opt(0, 0, 0))
                        .map(|naive| Utc.from_utc_datetime(&naive))
                });
                date.map_or(true, |d| d >= cutoff)
            })
            .collect())
    }

    /// BM25-ranked full-text search over title and content, with
    /// highlighted snippets.
    pub fn search_full_text(&self, query: &str, limit: usize) -> MagpieResult<Vec<SearchHit>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT seen_items.id, seen_items.url, seen_items.title, seen_items.source,
                    snippet(items_fts, 1, '<mark>', '</mark>', '...', 32) AS snippet_html,
                    bm25(items_fts) AS relevance
             FROM items_fts
             JOIN seen_items ON items_fts.rowid = seen_items.id
             WHERE items_fts MATCH ?1
             ORDER BY relevance
             LIMIT ?2",
        )?;

        let hits = stmt
            .query_map(params![query, limit as i64], |row| {
                Ok(SearchHit {
                    id: row.get(0)?,
                    url: row.get(1)?,
                    title: row.get(2)?,
                    source: row.get(3)?,
                    snippet: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                    relevance: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(hits)
    }

    /// The fuzzy-match primitive: find stored titles similar to `title`.
    ///
    /// Alphanumeric terms longer than three characters are OR-joined into
    /// an FTS query; BM25 scores are normalized to `1/(1+|bm25|)` and
    /// filtered by `threshold`.
    pub fn find_similar_titles(
        &self,
        title: &str,
        threshold: f64,
        limit: usize,
    ) -> MagpieResult<Vec<TitleMatch>> {
        let terms = magpie_core::text::extract_terms(title, 3);
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let fts_query = terms.join(" OR ");

        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT seen_items.id, seen_items.title, seen_items.url,
                    bm25(items_fts) AS score
             FROM items_fts
             JOIN seen_items ON items_fts.rowid = seen_items.id
             WHERE items_fts MATCH ?1
             ORDER BY score
             LIMIT ?2",
        )?;

        let rows = stmt
            .query_map(params![fts_query, limit as i64], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, f64>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|(id, title, url, bm25)| {
                let score = 1.0 / (1.0 + bm25.abs());
                (score >= threshold).then_some(TitleMatch {
                    id,
                    title,
                    url,
                    score,
                })
            })
            .collect())
    }

    /// Recent runs, newest first.
    pub fn get_recent_runs(&self, limit: usize) -> MagpieResult<Vec<RunRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, status, items_found, items_new, items_included,
                    output_path, runtime_seconds, error_log, qc_score, qc_report
             FROM research_runs
             ORDER BY timestamp DESC, id DESC
             LIMIT ?1",
        )?;

        let runs = stmt
            .query_map([limit as i64], |row| {
                let status_text: String = row.get(2)?;
                let status = RunStatus::from_str(&status_text).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        2,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                let timestamp: String = row.get(1)?;
                Ok(RunRecord {
                    id: row.get(0)?,
                    timestamp: parse_timestamp(&timestamp).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            1,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?,
                    status,
                    items_found: row.get(3)?,
                    items_new: row.get(4)?,
                    items_included: row.get(5)?,
                    output_path: row.get::<_, Option<String>>(6)?.map(Into::into),
                    runtime_seconds: row.get::<_, Option<f64>>(7)?.unwrap_or(0.0),
                    error_log: row.get(8)?,
                    qc_score: row.get(9)?,
                    qc_report: row.get(10)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }

    /// Aggregate statistics: totals, recent activity, top sources.
    pub fn get_database_stats(&self) -> MagpieResult<DatabaseStats> {
        let conn = self.lock()?;

        let total_items: i64 =
            conn.query_row("SELECT COUNT(*) FROM seen_items", [], |row| row.get(0))?;
        let total_runs: i64 =
            conn.query_row("SELECT COUNT(*) FROM research_runs", [], |row| row.get(0))?;
        let items_last_week: i64 = conn.query_row(
            "SELECT COUNT(*) FROM seen_items
             WHERE datetime(first_seen) >= datetime('now', '-7 days')",
            [],
            |row| row.get(0),
        )?;
        let runs_last_month: i64 = conn.query_row(
            "SELECT COUNT(*) FROM research_runs
             WHERE datetime(timestamp) >= datetime('now', '-30 days')",
            [],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(
            "SELECT source, COUNT(*) AS n FROM seen_items
             GROUP BY source ORDER BY n DESC LIMIT 5",
        )?;
        let top_sources = stmt
            .query_map([], |row| {
                Ok(SourceCount {
                    source: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DatabaseStats {
            total_items,
            total_runs,
            items_last_week,
            runs_last_month,
            top_sources,
        })
    }
}

impl SimilarityIndex for Store {
    fn similar_titles(
        &self,
        title: &str,
        threshold: f64,
        limit: usize,
    ) -> MagpieResult<Vec<TitleMatch>> {
        self.find_similar_titles(title, threshold, limit)
    }
}

/// Insert an item with an existing connection, ignoring URL conflicts.
fn insert_item(conn: &Connection, item: &Item) -> MagpieResult<i64> {
    let metadata = if item.source_metadata.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&item.source_metadata)?)
    };
    let tags = if item.tags.is_empty() {
        None
    } else {
        Some(item.tags.join(","))
    };

    let changed = conn.execute(
        "INSERT OR IGNORE INTO seen_items (
            url, content_hash, title, snippet, content,
            source, source_metadata, published_date,
            author, category, tags
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            item.url,
            hash_content(item.content.as_deref().unwrap_or("")),
            item.title,
            item.snippet,
            item.content,
            item.source,
            metadata,
            item.published_date.map(|d| d.to_rfc3339()),
            item.author,
            item.category,
            tags,
        ],
    )?;

    if changed > 0 {
        Ok(conn.last_insert_rowid())
    } else {
        // Row already existed; fetch its id
        let id = conn.query_row("SELECT id FROM seen_items WHERE url = ?1", [&item.url], |row| {
            row.get(0)
        })?;
        Ok(id)
    }
}

fn row_to_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<Item> {
    let metadata: HashMap<String, serde_json::Value> = row
        .get::<_, Option<String>>(5)?
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default();
    let tags: Vec<String> = row
        .get::<_, Option<String>>(9)?
        .map(|raw| raw.split(',').map(str::to_string).collect())
        .unwrap_or_default();
    let published_date = row
        .get::<_, Option<String>>(6)?
        .and_then(|raw| parse_timestamp(&raw).ok());

    Ok(Item {
        url: row.get(0)?,
        title: row.get(1)?,
        snippet: row.get(2)?,
        content: row.get(3)?,
        source: row.get(4)?,
        source_metadata: metadata,
        published_date,
        author: row.get(7)?,
        category: row.get(8)?,
        tags,
    })
}

/// Parse a stored timestamp: RFC 3339 first, then SQLite's
/// `CURRENT_TIMESTAMP` format.
pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .map(|naive| Utc.from_utc_datetime(&naive))
        })
}

fn ensure_fts5(conn: &Connection) -> MagpieResult<()> {
    let mut stmt = conn.prepare("PRAGMA compile_options")?;
    let has_fts5 = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .filter_map(Result::ok)
        .any(|opt| opt.contains("FTS5"));

    if !has_fts5 {
        return Err(MagpieError::configuration(
            "SQLite build lacks FTS5 support; the full-text index is required",
        ));
    }
    Ok(())
}
