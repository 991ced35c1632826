//! App settings key/value storage
//!
//! Small string settings (schema version, last signed-in user, sync toggles)
//! live in the `app_settings` table.

use crate::error::Result;
use rusqlite::{params, Connection, OptionalExtension};

/// Trait for app settings storage operations
pub trait SettingsRepository {
    /// Get a setting value by key
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set a setting value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a setting
    fn remove(&self, key: &str) -> Result<()>;
}

/// `SQLite` implementation of `SettingsRepository`
pub struct SqliteSettingsRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteSettingsRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl SettingsRepository for SqliteSettingsRepository<'_> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM app_settings WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO app_settings (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, crate::util::to_rfc3339(&crate::util::now())],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM app_settings WHERE key = ?1", [key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[test]
    fn test_set_get_remove() {
        let db = Database::open_in_memory().unwrap();
        let repo = SqliteSettingsRepository::new(db.connection());

        assert!(repo.get("active_user").unwrap().is_none());
        repo.set("active_user", "user-1").unwrap();
        assert_eq!(repo.get("active_user").unwrap().as_deref(), Some("user-1"));

        repo.set("active_user", "user-2").unwrap();
        assert_eq!(repo.get("active_user").unwrap().as_deref(), Some("user-2"));

        repo.remove("active_user").unwrap();
        assert!(repo.get("active_user").unwrap().is_none());
    }
}
