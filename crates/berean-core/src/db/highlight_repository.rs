//! Highlight repository implementation

use crate::db::syncable::{parse_timestamp, PendingRow};
use crate::error::{Error, Result};
use crate::models::{Highlight, NewHighlight, SyncQueueItem, SyncStatus, UserId};
use rusqlite::{params, Connection, OptionalExtension};

const COLUMNS: &str = "id, user_id, book_id, chapter, verse_start, verse_end, color, \
                       created_at, updated_at, sync_status, last_synced_at";

/// Trait for highlight storage operations
pub trait HighlightRepository {
    /// Create a new highlight
    fn create(&self, user_id: &UserId, params: NewHighlight) -> Result<Highlight>;

    /// Get a highlight by ID
    fn get(&self, id: &str) -> Result<Option<Highlight>>;

    /// List a user's highlights within one chapter, in verse order
    fn list_for_chapter(&self, user_id: &UserId, book_id: i64, chapter: i64)
        -> Result<Vec<Highlight>>;

    /// Change a highlight's color; the row returns to `pending`
    fn recolor(&self, id: &str, color: &str) -> Result<Highlight>;

    /// Delete locally and enqueue the remote delete, atomically
    fn delete(&self, id: &str) -> Result<()>;

    /// Rows awaiting push for this user, oldest update first
    fn pending(&self, user_id: &UserId) -> Result<Vec<PendingRow>>;
}

/// `SQLite` implementation of `HighlightRepository`
pub struct SqliteHighlightRepository<'a> {
    conn: &'a Connection,
}

type RawRow = (
    String,
    String,
    i64,
    i64,
    i64,
    i64,
    String,
    String,
    String,
    String,
    Option<String>,
);

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
        row.get(10)?,
    ))
}

fn to_model(raw: RawRow) -> Result<Highlight> {
    let (id, user_id, book_id, chapter, verse_start, verse_end, color, created, updated, status, synced) =
        raw;
    Ok(Highlight {
        id: id
            .parse()
            .map_err(|_| Error::InvalidInput(format!("bad highlight id {id:?}")))?,
        user_id: UserId::from(user_id),
        book_id,
        chapter,
        verse_start,
        verse_end,
        color,
        created_at: parse_timestamp(&created, "created_at")?,
        updated_at: parse_timestamp(&updated, "updated_at")?,
        sync_status: status.parse()?,
        last_synced_at: synced
            .map(|v| parse_timestamp(&v, "last_synced_at"))
            .transpose()?,
    })
}

impl<'a> SqliteHighlightRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl HighlightRepository for SqliteHighlightRepository<'_> {
    fn create(&self, user_id: &UserId, params: NewHighlight) -> Result<Highlight> {
        if params.verse_end < params.verse_start {
            return Err(Error::InvalidInput(format!(
                "verse range {}-{} is inverted",
                params.verse_start, params.verse_end
            )));
        }
        let highlight = Highlight::new(user_id.clone(), params);

        self.conn.execute(
            "INSERT INTO highlights_local
             (id, user_id, book_id, chapter, verse_start, verse_end, color,
              created_at, updated_at, sync_status, last_synced_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, NULL)",
            params![
                highlight.id.as_str(),
                highlight.user_id.as_str(),
                highlight.book_id,
                highlight.chapter,
                highlight.verse_start,
                highlight.verse_end,
                highlight.color,
                crate::util::to_rfc3339(&highlight.created_at),
                crate::util::to_rfc3339(&highlight.updated_at),
                highlight.sync_status.as_str(),
            ],
        )?;

        Ok(highlight)
    }

    fn get(&self, id: &str) -> Result<Option<Highlight>> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM highlights_local WHERE id = ?1"),
                [id],
                read_row,
            )
            .optional()?;
        raw.map(to_model).transpose()
    }

    fn list_for_chapter(
        &self,
        user_id: &UserId,
        book_id: i64,
        chapter: i64,
    ) -> Result<Vec<Highlight>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM highlights_local
             WHERE user_id = ?1 AND book_id = ?2 AND chapter = ?3
             ORDER BY verse_start ASC"
        ))?;
        let rows = stmt
            .query_map(params![user_id.as_str(), book_id, chapter], read_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(to_model).collect()
    }

    fn recolor(&self, id: &str, color: &str) -> Result<Highlight> {
        let mut highlight = self
            .get(id)?
            .ok_or_else(|| Error::NotFound(format!("highlight {id}")))?;

        highlight.color = color.to_string();
        highlight.updated_at = crate::util::now();
        highlight.sync_status = SyncStatus::Pending;

        self.conn.execute(
            "UPDATE highlights_local
             SET color = ?1, updated_at = ?2, sync_status = 'pending'
             WHERE id = ?3",
            params![color, crate::util::to_rfc3339(&highlight.updated_at), id],
        )?;

        Ok(highlight)
    }

    fn delete(&self, id: &str) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        super::queue_repository::insert(
            &tx,
            &SyncQueueItem::delete(crate::models::EntityKind::Highlights, id),
        )?;
        let deleted = tx.execute("DELETE FROM highlights_local WHERE id = ?1", [id])?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("highlight {id}")));
        }
        tx.commit()?;
        Ok(())
    }

    fn pending(&self, user_id: &UserId) -> Result<Vec<PendingRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM highlights_local
             WHERE user_id = ?1 AND sync_status = 'pending'
             ORDER BY updated_at ASC"
        ))?;
        let rows = stmt
            .query_map([user_id.as_str()], read_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows
            .into_iter()
            .map(|raw| {
                let id = raw.0.clone();
                let updated_at = raw.8.clone();
                let payload = to_model(raw)
                    .map(|h| h.remote_payload())
                    .map_err(|err| err.to_string());
                PendingRow {
                    id,
                    updated_at,
                    payload,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::DEFAULT_HIGHLIGHT_COLOR;

    fn user() -> UserId {
        UserId::from("user-1")
    }

    #[test]
    fn test_create_applies_default_color() {
        let db = Database::open_in_memory().unwrap();
        let repo = SqliteHighlightRepository::new(db.connection());

        let highlight = repo
            .create(
                &user(),
                NewHighlight {
                    book_id: 19,
                    chapter: 23,
                    verse_start: 1,
                    verse_end: 6,
                    color: None,
                },
            )
            .unwrap();
        assert_eq!(highlight.color, DEFAULT_HIGHLIGHT_COLOR);

        let fetched = repo.get(&highlight.id.as_str()).unwrap().unwrap();
        assert_eq!(fetched.color, DEFAULT_HIGHLIGHT_COLOR);
    }

    #[test]
    fn test_inverted_range_rejected() {
        let db = Database::open_in_memory().unwrap();
        let repo = SqliteHighlightRepository::new(db.connection());

        let err = repo
            .create(
                &user(),
                NewHighlight {
                    book_id: 19,
                    chapter: 23,
                    verse_start: 6,
                    verse_end: 1,
                    color: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_recolor_resets_to_pending() {
        let db = Database::open_in_memory().unwrap();
        let repo = SqliteHighlightRepository::new(db.connection());

        let created = repo
            .create(
                &user(),
                NewHighlight {
                    book_id: 19,
                    chapter: 23,
                    verse_start: 1,
                    verse_end: 6,
                    color: None,
                },
            )
            .unwrap();
        db.connection()
            .execute(
                "UPDATE highlights_local SET sync_status = 'synced' WHERE id = ?1",
                [&created.id.as_str()],
            )
            .unwrap();

        let recolored = repo.recolor(&created.id.as_str(), "#C8E6C9").unwrap();
        assert_eq!(recolored.color, "#C8E6C9");
        assert_eq!(recolored.sync_status, SyncStatus::Pending);
    }

    #[test]
    fn test_delete_enqueues_remote_delete() {
        let db = Database::open_in_memory().unwrap();
        let repo = SqliteHighlightRepository::new(db.connection());

        let created = repo
            .create(
                &user(),
                NewHighlight {
                    book_id: 19,
                    chapter: 23,
                    verse_start: 1,
                    verse_end: 6,
                    color: None,
                },
            )
            .unwrap();
        repo.delete(&created.id.as_str()).unwrap();

        let queued: i64 = db
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM sync_queue WHERE entity_type = 'highlights' AND entity_id = ?1",
                [&created.id.as_str()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(queued, 1);
        assert!(repo.get(&created.id.as_str()).unwrap().is_none());
    }
}
