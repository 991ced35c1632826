//! Sync metadata storage

use crate::db::syncable::parse_timestamp;
use crate::error::Result;
use crate::models::{EntityKind, SyncMetadata};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

/// Trait for per-entity-type sync bookkeeping
pub trait MetadataRepository {
    /// Read the bookkeeping row for one entity kind, if any pass recorded one
    fn get(&self, kind: EntityKind) -> Result<Option<SyncMetadata>>;

    /// Stamp the last successful sync moment for an entity kind
    fn touch(&self, kind: EntityKind, at: DateTime<Utc>) -> Result<()>;
}

/// `SQLite` implementation of `MetadataRepository`
pub struct SqliteMetadataRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteMetadataRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl MetadataRepository for SqliteMetadataRepository<'_> {
    fn get(&self, kind: EntityKind) -> Result<Option<SyncMetadata>> {
        let raw: Option<(Option<String>, Option<String>)> = self
            .conn
            .query_row(
                "SELECT last_sync_at, last_sync_token FROM sync_metadata WHERE entity_type = ?1",
                [kind.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((last_sync_at, last_sync_token)) = raw else {
            return Ok(None);
        };
        Ok(Some(SyncMetadata {
            entity_type: kind,
            last_sync_at: last_sync_at
                .map(|v| parse_timestamp(&v, "last_sync_at"))
                .transpose()?,
            last_sync_token,
        }))
    }

    fn touch(&self, kind: EntityKind, at: DateTime<Utc>) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sync_metadata (entity_type, last_sync_at)
             VALUES (?1, ?2)
             ON CONFLICT(entity_type) DO UPDATE SET last_sync_at = excluded.last_sync_at",
            params![kind.as_str(), crate::util::to_rfc3339(&at)],
        )?;
        Ok(())
    }
}
