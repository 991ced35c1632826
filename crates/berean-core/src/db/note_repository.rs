//! Verse note repository implementation
//!
//! Notes are keyed one-per-verse: writing a note for a verse that already has
//! one replaces it in place rather than stacking a second row.

use crate::db::syncable::{parse_timestamp, PendingRow};
use crate::error::{Error, Result};
use crate::models::{NewVerseNote, SyncQueueItem, SyncStatus, UserId, VerseNote};
use rusqlite::{params, Connection, OptionalExtension};

const COLUMNS: &str = "id, user_id, book_id, chapter, verse, content, \
                       created_at, updated_at, sync_status, last_synced_at";

/// Trait for verse note storage operations
pub trait NoteRepository {
    /// Write the note for a verse, replacing any existing one
    fn put(&self, user_id: &UserId, params: NewVerseNote) -> Result<VerseNote>;

    /// Get a note by ID
    fn get(&self, id: &str) -> Result<Option<VerseNote>>;

    /// Get the note on one verse, if any
    fn get_for_verse(
        &self,
        user_id: &UserId,
        book_id: i64,
        chapter: i64,
        verse: i64,
    ) -> Result<Option<VerseNote>>;

    /// List a user's notes within one chapter, in verse order
    fn list_for_chapter(&self, user_id: &UserId, book_id: i64, chapter: i64)
        -> Result<Vec<VerseNote>>;

    /// Rewrite a note's content; the row returns to `pending`
    fn update_content(&self, id: &str, content: &str) -> Result<VerseNote>;

    /// Delete locally and enqueue the remote delete, atomically
    fn delete(&self, id: &str) -> Result<()>;

    /// Rows awaiting push for this user, oldest update first
    fn pending(&self, user_id: &UserId) -> Result<Vec<PendingRow>>;
}

/// `SQLite` implementation of `NoteRepository`
pub struct SqliteNoteRepository<'a> {
    conn: &'a Connection,
}

type RawRow = (
    String,
    String,
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
    ))
}

fn to_model(raw: RawRow) -> Result<VerseNote> {
    let (id, user_id, book_id, chapter, verse, content, created, updated, status, synced) = raw;
    Ok(VerseNote {
        id: id
            .parse()
            .map_err(|_| Error::InvalidInput(format!("bad note id {id:?}")))?,
        user_id: UserId::from(user_id),
        book_id,
        chapter,
        verse,
        content,
        created_at: parse_timestamp(&created, "created_at")?,
        updated_at: parse_timestamp(&updated, "updated_at")?,
        sync_status: status.parse()?,
        last_synced_at: synced
            .map(|v| parse_timestamp(&v, "last_synced_at"))
            .transpose()?,
    })
}

impl<'a> SqliteNoteRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl NoteRepository for SqliteNoteRepository<'_> {
    fn put(&self, user_id: &UserId, params: NewVerseNote) -> Result<VerseNote> {
        if params.content.trim().is_empty() {
            return Err(Error::InvalidInput("note content is empty".to_string()));
        }
        let note = VerseNote::new(user_id.clone(), params);

        // INSERT OR REPLACE rides the (user_id, book_id, chapter, verse)
        // uniqueness to swap out an existing note for the verse.
        self.conn.execute(
            "INSERT OR REPLACE INTO notes_local
             (id, user_id, book_id, chapter, verse, content,
              created_at, updated_at, sync_status, last_synced_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, NULL)",
            params![
                note.id.as_str(),
                note.user_id.as_str(),
                note.book_id,
                note.chapter,
                note.verse,
                note.content,
                crate::util::to_rfc3339(&note.created_at),
                crate::util::to_rfc3339(&note.updated_at),
                note.sync_status.as_str(),
            ],
        )?;

        Ok(note)
    }

    fn get(&self, id: &str) -> Result<Option<VerseNote>> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM notes_local WHERE id = ?1"),
                [id],
                read_row,
            )
            .optional()?;
        raw.map(to_model).transpose()
    }

    fn get_for_verse(
        &self,
        user_id: &UserId,
        book_id: i64,
        chapter: i64,
        verse: i64,
    ) -> Result<Option<VerseNote>> {
        let raw = self
            .conn
            .query_row(
                &format!(
                    "SELECT {COLUMNS} FROM notes_local
                     WHERE user_id = ?1 AND book_id = ?2 AND chapter = ?3 AND verse = ?4"
                ),
                params![user_id.as_str(), book_id, chapter, verse],
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
    ) -> Result<Vec<VerseNote>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM notes_local
             WHERE user_id = ?1 AND book_id = ?2 AND chapter = ?3
             ORDER BY verse ASC"
        ))?;
        let rows = stmt
            .query_map(params![user_id.as_str(), book_id, chapter], read_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(to_model).collect()
    }

    fn update_content(&self, id: &str, content: &str) -> Result<VerseNote> {
        if content.trim().is_empty() {
            return Err(Error::InvalidInput("note content is empty".to_string()));
        }
        let mut note = self
            .get(id)?
            .ok_or_else(|| Error::NotFound(format!("note {id}")))?;

        note.content = content.to_string();
        note.updated_at = crate::util::now();
        note.sync_status = SyncStatus::Pending;

        self.conn.execute(
            "UPDATE notes_local
             SET content = ?1, updated_at = ?2, sync_status = 'pending'
             WHERE id = ?3",
            params![content, crate::util::to_rfc3339(&note.updated_at), id],
        )?;

        Ok(note)
    }

    fn delete(&self, id: &str) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        super::queue_repository::insert(
            &tx,
            &SyncQueueItem::delete(crate::models::EntityKind::Notes, id),
        )?;
        let deleted = tx.execute("DELETE FROM notes_local WHERE id = ?1", [id])?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("note {id}")));
        }
        tx.commit()?;
        Ok(())
    }

    fn pending(&self, user_id: &UserId) -> Result<Vec<PendingRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM notes_local
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
                let updated_at = raw.7.clone();
                let payload = to_model(raw)
                    .map(|n| n.remote_payload())
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
