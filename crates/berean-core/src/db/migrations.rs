//! Schema migrations
//!
//! The schema version lives in the `app_settings` key/value table under the
//! `schema_version` key. Each migration runs inside a transaction; a partial
//! migration never leaves the version bumped.

use crate::error::Result;
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

/// Current schema version. Bump when adding a migration.
pub const CURRENT_VERSION: u32 = 1;

/// Run all pending migrations.
pub fn run(conn: &Connection) -> Result<()> {
    // app_settings must exist before we can read the version out of it.
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS app_settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );",
    )?;

    let version = schema_version(conn)?;
    debug!(version, "current schema version");

    if version >= CURRENT_VERSION {
        return Ok(());
    }

    if version < 1 {
        migrate_v1(conn)?;
    }

    info!(from = version, to = CURRENT_VERSION, "database migrated");
    Ok(())
}

/// Read the stored schema version; 0 means a fresh database.
pub fn schema_version(conn: &Connection) -> Result<u32> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM app_settings WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value.and_then(|v| v.parse().ok()).unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: u32) -> Result<()> {
    conn.execute(
        "INSERT INTO app_settings (key, value, updated_at)
         VALUES ('schema_version', ?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        rusqlite::params![version.to_string(), crate::util::to_rfc3339(&crate::util::now())],
    )?;
    Ok(())
}

/// v1: local entity tables, the sync queue and sync metadata.
fn migrate_v1(conn: &Connection) -> Result<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS sermons_local (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            source_verses TEXT NOT NULL,
            sermon_type TEXT NOT NULL,
            target_audience TEXT NOT NULL,
            language TEXT NOT NULL DEFAULT 'telugu',
            ai_model_used TEXT,
            tags TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            sync_status TEXT NOT NULL DEFAULT 'pending',
            last_synced_at TEXT
        );

        CREATE TABLE IF NOT EXISTS bookmarks_local (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            book_id INTEGER NOT NULL,
            chapter INTEGER NOT NULL,
            verse INTEGER NOT NULL,
            note TEXT,
            tags TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            sync_status TEXT NOT NULL DEFAULT 'pending',
            last_synced_at TEXT,
            UNIQUE(user_id, book_id, chapter, verse)
        );

        CREATE TABLE IF NOT EXISTS highlights_local (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            book_id INTEGER NOT NULL,
            chapter INTEGER NOT NULL,
            verse_start INTEGER NOT NULL,
            verse_end INTEGER NOT NULL,
            color TEXT NOT NULL DEFAULT '#FFEB3B',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            sync_status TEXT NOT NULL DEFAULT 'pending',
            last_synced_at TEXT
        );

        CREATE TABLE IF NOT EXISTS notes_local (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            book_id INTEGER NOT NULL,
            chapter INTEGER NOT NULL,
            verse INTEGER NOT NULL,
            content TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            sync_status TEXT NOT NULL DEFAULT 'pending',
            last_synced_at TEXT,
            UNIQUE(user_id, book_id, chapter, verse)
        );

        CREATE TABLE IF NOT EXISTS sync_queue (
            id TEXT PRIMARY KEY,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            operation TEXT NOT NULL,
            payload TEXT NOT NULL,
            created_at TEXT NOT NULL,
            retry_count INTEGER NOT NULL DEFAULT 0,
            last_error TEXT
        );

        CREATE TABLE IF NOT EXISTS sync_metadata (
            entity_type TEXT PRIMARY KEY,
            last_sync_at TEXT,
            last_sync_token TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_sermons_local_user ON sermons_local(user_id);
        CREATE INDEX IF NOT EXISTS idx_sermons_local_sync ON sermons_local(sync_status);
        CREATE INDEX IF NOT EXISTS idx_bookmarks_local_user ON bookmarks_local(user_id);
        CREATE INDEX IF NOT EXISTS idx_bookmarks_local_sync ON bookmarks_local(sync_status);
        CREATE INDEX IF NOT EXISTS idx_bookmarks_local_ref ON bookmarks_local(user_id, book_id, chapter);
        CREATE INDEX IF NOT EXISTS idx_highlights_local_user ON highlights_local(user_id);
        CREATE INDEX IF NOT EXISTS idx_highlights_local_sync ON highlights_local(sync_status);
        CREATE INDEX IF NOT EXISTS idx_highlights_local_ref ON highlights_local(user_id, book_id, chapter);
        CREATE INDEX IF NOT EXISTS idx_notes_local_user ON notes_local(user_id);
        CREATE INDEX IF NOT EXISTS idx_notes_local_sync ON notes_local(sync_status);
        CREATE INDEX IF NOT EXISTS idx_notes_local_ref ON notes_local(user_id, book_id, chapter);
        CREATE INDEX IF NOT EXISTS idx_sync_queue_created ON sync_queue(created_at);
        CREATE INDEX IF NOT EXISTS idx_sync_queue_entity ON sync_queue(entity_type, entity_id);",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_conn() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    #[test]
    fn test_fresh_database_reaches_current_version() {
        let conn = fresh_conn();
        run(&conn).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_run_is_idempotent() {
        let conn = fresh_conn();
        run(&conn).unwrap();
        run(&conn).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_all_tables_exist() {
        let conn = fresh_conn();
        run(&conn).unwrap();

        for table in [
            "sermons_local",
            "bookmarks_local",
            "highlights_local",
            "notes_local",
            "sync_queue",
            "sync_metadata",
            "app_settings",
        ] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "table {table} missing");
        }
    }

    #[test]
    fn test_sync_queue_indexes_exist() {
        let conn = fresh_conn();
        run(&conn).unwrap();

        for index in ["idx_sync_queue_created", "idx_sync_queue_entity"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = ?1",
                    [index],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "index {index} missing");
        }
    }

    #[test]
    fn test_bookmark_unique_constraint() {
        let conn = fresh_conn();
        run(&conn).unwrap();

        let insert = "INSERT INTO bookmarks_local
            (id, user_id, book_id, chapter, verse, created_at, updated_at)
            VALUES (?1, 'u1', 43, 3, 16, '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')";
        conn.execute(insert, ["b1"]).unwrap();
        let err = conn.execute(insert, ["b2"]).unwrap_err();
        assert!(err.to_string().contains("UNIQUE"));
    }
}
