//! Adaptive per-author performance tracking.
//!
//! The tracker is the only writer of the `author_performance` table. Rows
//! are created lazily on first observation, updated on every
//! inclusion/exclusion event, and refreshed by an explicit batch score
//! pass after each cycle.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use magpie_core::authors::{normalize_author_name, parse_author_string};
use magpie_core::{AuthorStats, AuthorTrackingConfig, MagpieError, MagpieResult};

use crate::store::{parse_timestamp, Store};

/// Tracker over the store's `author_performance` table.
pub struct AuthorTracker {
    conn: Arc<Mutex<Connection>>,
    config: AuthorTrackingConfig,
}

impl AuthorTracker {
    /// Create a tracker sharing the store's connection.
    pub fn new(store: &Store, config: AuthorTrackingConfig) -> Self {
        Self {
            conn: store.connection(),
            config,
        }
    }

    fn lock(&self) -> MagpieResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| MagpieError::database(e.to_string()))
    }

    /// Record one observation of an author: a paper was seen, and either
    /// included in the digest or not.
    ///
    /// The author name is normalized to canonical "Last, F." form so
    /// format variants collapse to one record.
    pub fn record_inclusion(
        &self,
        author_name: &str,
        included: bool,
        published_date: Option<DateTime<Utc>>,
    ) -> MagpieResult<()> {
        let name = normalize_author_name(author_name);
        if name.is_empty() {
            return Ok(());
        }

        let last_included =
            included.then(|| published_date.unwrap_or_else(Utc::now).to_rfc3339());

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO author_performance (author_name, total_papers, included_papers, last_included)
             VALUES (?1, 1, ?2, ?3)
             ON CONFLICT(author_name) DO UPDATE SET
                 total_papers = total_papers + 1,
                 included_papers = included_papers + ?2,
                 last_seen = CURRENT_TIMESTAMP,
                 last_included = COALESCE(?3, last_included)",
            params![name, included as i64, last_included],
        )?;
        tx.execute(
            "UPDATE author_performance
             SET inclusion_rate = CAST(included_papers AS REAL) / total_papers
             WHERE author_name = ?1",
            [&name],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Batch score refresh over every tracked author. Must be invoked
    /// explicitly after a cycle; there is no implicit trigger.
    ///
    /// `recency_score = exp(-days_since_last_included / decay)` (0 when
    /// never included); `recent_velocity` is papers per velocity window
    /// over the author's active span.
    pub fn update_scores(&self) -> MagpieResult<()> {
        let now = Utc::now();
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let rows: Vec<(String, i64, Option<String>, String)> = {
            let mut stmt = tx.prepare(
                "SELECT author_name, total_papers, last_included, first_seen
                 FROM author_performance",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        for (name, total_papers, last_included, first_seen) in rows {
            let recency_score = last_included
                .as_deref()
                .and_then(|raw| parse_timestamp(raw).ok())
                .map(|included_at| {
                    let days = (now - included_at).num_seconds().max(0) as f64 / 86_400.0;
                    (-days / self.config.recency_decay_days).exp()
                })
                .unwrap_or(0.0);

            let days_active = parse_timestamp(&first_seen)
                .map(|seen| (now - seen).num_seconds().max(0) as f64 / 86_400.0)
                .unwrap_or(0.0);
            let windows_active = days_active.max(1.0) / self.config.velocity_window_days;
            let recent_velocity = total_papers as f64 / windows_active;

            tx.execute(
                "UPDATE author_performance
                 SET recency_score = ?1, recent_velocity = ?2
                 WHERE author_name = ?3",
                params![recency_score, recent_velocity, name],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Top authors by the composite inclusion/recency/velocity blend,
    /// filtered by the minimums.
    pub fn get_top_authors(
        &self,
        limit: usize,
        min_inclusion_rate: f64,
        min_papers: i64,
    ) -> MagpieResult<Vec<AuthorStats>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT author_name, total_papers, included_papers, inclusion_rate,
                    recency_score, recent_velocity, first_seen, last_seen, last_included
             FROM author_performance
             WHERE inclusion_rate >= ?1 AND total_papers >= ?2
             ORDER BY 0.5 * inclusion_rate
                    + 0.3 * recency_score
                    + 0.2 * MIN(recent_velocity, 1.0) DESC
             LIMIT ?3",
        )?;

        let authors = stmt
            .query_map(params![min_inclusion_rate, min_papers, limit as i64], row_to_stats)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(authors)
    }

    /// Stats for one author, looked up by any name format.
    pub fn get_author_stats(&self, author_name: &str) -> MagpieResult<Option<AuthorStats>> {
        let name = normalize_author_name(author_name);
        let conn = self.lock()?;
        let stats = conn
            .query_row(
                "SELECT author_name, total_papers, included_papers, inclusion_rate,
                        recency_score, recent_velocity, first_seen, last_seen, last_included
                 FROM author_performance
                 WHERE author_name = ?1",
                [&name],
                row_to_stats,
            )
            .optional()?;
        Ok(stats)
    }

    /// Backfill `author_performance` from the existing seen-item log,
    /// treating `included_in_digest` as the inclusion signal.
    pub fn seed_from_existing_items(&self) -> MagpieResult<usize> {
        let rows: Vec<(String, bool, Option<String>)> = {
            let conn = self.lock()?;
            let mut stmt = conn.prepare(
                "SELECT author, included_in_digest, published_date
                 FROM seen_items
                 WHERE author IS NOT NULL AND author != ''",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)? != 0,
                        row.get(2)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        let mut seeded = 0;
        for (author_field, included, published) in rows {
            let published_date = published.as_deref().and_then(|raw| parse_timestamp(raw).ok());
            for name in parse_author_string(&author_field) {
                self.record_inclusion(&name, included, published_date)?;
                seeded += 1;
            }
        }

        tracing::info!(seeded, "seeded author performance from seen items");
        Ok(seeded)
    }
}

impl Store {
    /// An author tracker sharing this store's connection.
    pub fn author_tracker(&self, config: AuthorTrackingConfig) -> AuthorTracker {
        AuthorTracker::new(self, config)
    }

    /// Query-surface delegation: top authors by composite score.
    pub fn get_top_authors(
        &self,
        limit: usize,
        min_inclusion_rate: f64,
        min_papers: i64,
    ) -> MagpieResult<Vec<AuthorStats>> {
        self.author_tracker(AuthorTrackingConfig::default())
            .get_top_authors(limit, min_inclusion_rate, min_papers)
    }

    /// Query-surface delegation: stats for one author.
    pub fn get_author_stats(&self, author_name: &str) -> MagpieResult<Option<AuthorStats>> {
        self.author_tracker(AuthorTrackingConfig::default())
            .get_author_stats(author_name)
    }
}

fn row_to_stats(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuthorStats> {
    let parse_col = |idx: usize, raw: String| {
        parse_timestamp(&raw).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
    };

    let first_seen = parse_col(6, row.get::<_, String>(6)?)?;
    let last_seen = parse_col(7, row.get::<_, String>(7)?)?;
    let last_included = row
        .get::<_, Option<String>>(8)?
        .map(|raw| parse_col(8, raw))
        .transpose()?;

    Ok(AuthorStats {
        author_name: row.get(0)?,
        total_papers: row.get(1)?,
        included_papers: row.get(2)?,
        inclusion_rate: row.get(3)?,
        recency_score: row.get(4)?,
        recent_velocity: row.get(5)?,
        first_seen,
        last_seen,
        last_included,
    })
}
