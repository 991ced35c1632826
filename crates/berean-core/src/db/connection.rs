//! Database connection management

use crate::error::Result;
use rusqlite::Connection;
use std::path::Path;

use super::migrations;

/// Wrapper owning the single `SQLite` connection for the process.
///
/// All repository and engine operations serialize through this handle; the
/// service layer puts it behind an async mutex so writes never interleave.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open a database at the given path, creating it if it doesn't exist.
    ///
    /// Runs migrations automatically.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let database = Self { conn };
        database.configure()?;
        database.migrate()?;
        Ok(database)
    }

    /// Open an in-memory database (useful for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let database = Self { conn };
        database.configure()?;
        database.migrate()?;
        Ok(database)
    }

    /// Configure `SQLite` for durability and concurrent readers.
    fn configure(&self) -> Result<()> {
        // WAL is rejected for in-memory databases; that's fine.
        self.conn
            .pragma_update(None, "journal_mode", "WAL")
            .ok();
        self.conn
            .pragma_update(None, "synchronous", "NORMAL")
            .ok();
        self.conn.pragma_update(None, "foreign_keys", "ON")?;
        self.conn.pragma_update(None, "cache_size", 10_000).ok();
        Ok(())
    }

    /// Run database migrations. Safe to call on every startup.
    pub fn migrate(&self) -> Result<()> {
        migrations::run(&self.conn)
    }

    /// Get a reference to the underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        let count: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM app_settings", [], |row| row.get(0))
            .unwrap();
        assert!(count >= 1);
    }

    #[test]
    fn test_open_on_disk_is_reopenable() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("berean.db");

        {
            let db = Database::open(&path).unwrap();
            db.connection()
                .execute(
                    "INSERT INTO app_settings (key, value, updated_at) VALUES ('probe', '1', datetime('now'))",
                    [],
                )
                .unwrap();
        }

        // Re-opening must re-run migrations without destroying rows.
        let db = Database::open(&path).unwrap();
        let value: String = db
            .connection()
            .query_row(
                "SELECT value FROM app_settings WHERE key = 'probe'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(value, "1");
    }
}
