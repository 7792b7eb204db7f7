//! Versioned schema migrations.
//!
//! A `schema_migrations` ledger records every applied version. Pending
//! migrations are the ascending numeric versions not yet recorded; each is
//! applied inside its own transaction and recorded before the next starts.
//! Migrations are additive-only: an existing database is never rewritten,
//! only extended.

use rusqlite::Connection;
use std::collections::HashSet;

use magpie_core::MagpieResult;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial",
        sql: r#"
        -- Append-only log of every item ever seen
        CREATE TABLE IF NOT EXISTS seen_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            url TEXT NOT NULL UNIQUE,
            content_hash TEXT,
            title TEXT NOT NULL,
            snippet TEXT,
            content TEXT,
            source TEXT NOT NULL,
            source_metadata TEXT,
            published_date TEXT,
            author TEXT,
            category TEXT,
            tags TEXT,
            first_seen TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            included_in_digest INTEGER DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_seen_items_content_hash ON seen_items(content_hash);
        CREATE INDEX IF NOT EXISTS idx_seen_items_first_seen ON seen_items(first_seen DESC);
        CREATE INDEX IF NOT EXISTS idx_seen_items_source ON seen_items(source);

        -- One row per research cycle
        CREATE TABLE IF NOT EXISTS research_runs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            status TEXT NOT NULL DEFAULT 'success',
            items_found INTEGER DEFAULT 0,
            items_new INTEGER DEFAULT 0,
            items_included INTEGER DEFAULT 0,
            output_path TEXT,
            runtime_seconds REAL,
            error_log TEXT
        );

        -- Links selected items to the run that selected them,
        -- rank preserving final ordering
        CREATE TABLE IF NOT EXISTS run_items (
            run_id INTEGER NOT NULL REFERENCES research_runs(id),
            item_id INTEGER NOT NULL REFERENCES seen_items(id),
            rank INTEGER NOT NULL,
            PRIMARY KEY (run_id, item_id)
        );

        -- Full-text shadow index over title and content
        CREATE VIRTUAL TABLE IF NOT EXISTS items_fts USING fts5(
            title,
            content,
            content='seen_items',
            content_rowid='id'
        );

        CREATE TRIGGER IF NOT EXISTS items_fts_insert AFTER INSERT ON seen_items BEGIN
            INSERT INTO items_fts(rowid, title, content)
            VALUES (new.id, new.title, new.content);
        END;

        CREATE TRIGGER IF NOT EXISTS items_fts_update AFTER UPDATE OF title, content ON seen_items BEGIN
            INSERT INTO items_fts(items_fts, rowid, title, content)
            VALUES ('delete', old.id, old.title, old.content);
            INSERT INTO items_fts(rowid, title, content)
            VALUES (new.id, new.title, new.content);
        END;

        CREATE TRIGGER IF NOT EXISTS items_fts_delete AFTER DELETE ON seen_items BEGIN
            INSERT INTO items_fts(items_fts, rowid, title, content)
            VALUES ('delete', old.id, old.title, old.content);
        END;
        "#,
    },
    Migration {
        version: 2,
        name: "author_performance",
        sql: r#"
        -- Adaptive per-author statistics
        CREATE TABLE IF NOT EXISTS author_performance (
            author_name TEXT PRIMARY KEY,
            total_papers INTEGER DEFAULT 0,
            included_papers INTEGER DEFAULT 0,
            inclusion_rate REAL DEFAULT 0.0,
            recency_score REAL DEFAULT 0.0,
            recent_velocity REAL DEFAULT 0.0,
            first_seen TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            last_seen TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            last_included TIMESTAMP
        );

        CREATE INDEX IF NOT EXISTS idx_author_inclusion ON author_performance(inclusion_rate DESC);
        CREATE INDEX IF NOT EXISTS idx_author_recency ON author_performance(last_included DESC);
        CREATE INDEX IF NOT EXISTS idx_author_composite ON author_performance(inclusion_rate DESC, recency_score DESC);
        "#,
    },
    Migration {
        version: 3,
        name: "run_quality_results",
        sql: r#"
        ALTER TABLE research_runs ADD COLUMN qc_score REAL;
        ALTER TABLE research_runs ADD COLUMN qc_report TEXT;
        "#,
    },
];

/// Apply all pending migrations in ascending version order.
pub fn run_migrations(conn: &mut Connection) -> MagpieResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    let applied = applied_versions(conn)?;

    for migration in MIGRATIONS {
        if applied.contains(&migration.version) {
            continue;
        }

        tracing::info!(
            version = migration.version,
            name = migration.name,
            "applying schema migration"
        );

        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version) VALUES (?1)",
            [migration.version],
        )?;
        tx.commit()?;
    }

    Ok(())
}

/// Versions already recorded in the ledger.
pub fn applied_versions(conn: &Connection) -> MagpieResult<HashSet<i64>> {
    let mut stmt = conn.prepare("SELECT version FROM schema_migrations")?;
    let versions = stmt
        .query_map([], |row| row.get::<_, i64>(0))?
        .collect::<Result<HashSet<_>, _>>()?;
    Ok(versions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_ascending_and_unique() {
        let mut last = 0;
        for m in MIGRATIONS {
            assert!(m.version > last, "versions must strictly ascend");
            last = m.version;
        }
    }

    #[test]
    fn test_run_migrations_records_versions() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();

        let applied = applied_versions(&conn).unwrap();
        assert_eq!(applied.len(), MIGRATIONS.len());
        assert!(applied.contains(&1));
        assert!(applied.contains(&2));
        assert!(applied.contains(&3));
    }

    #[test]
    fn test_run_migrations_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        run_migrations(&mut conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(count as usize, MIGRATIONS.len());
    }

    #[test]
    fn test_qc_columns_exist_after_migration() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('research_runs')
                 WHERE name IN ('qc_score', 'qc_report')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 2);
    }
}
