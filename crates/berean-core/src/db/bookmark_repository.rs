//! Bookmark repository implementation

use crate::db::syncable::{parse_timestamp, tags_from_column, tags_to_column, PendingRow};
use crate::error::{Error, Result};
use crate::models::{Bookmark, BookmarkPatch, NewBookmark, SyncQueueItem, SyncStatus, UserId};
use rusqlite::{params, Connection, OptionalExtension};

const COLUMNS: &str = "id, user_id, book_id, chapter, verse, note, tags, \
                       created_at, updated_at, sync_status, last_synced_at";

/// Trait for bookmark storage operations
pub trait BookmarkRepository {
    /// Create a new bookmark. Fails with [`Error::Constraint`] when the user
    /// already bookmarked the verse.
    fn create(&self, user_id: &UserId, params: NewBookmark) -> Result<Bookmark>;

    /// Get a bookmark by ID
    fn get(&self, id: &str) -> Result<Option<Bookmark>>;

    /// List all of a user's bookmarks, newest first
    fn list(&self, user_id: &UserId) -> Result<Vec<Bookmark>>;

    /// List a user's bookmarks within one chapter, in verse order
    fn list_for_chapter(&self, user_id: &UserId, book_id: i64, chapter: i64)
        -> Result<Vec<Bookmark>>;

    /// Apply a patch; the row returns to `pending`
    fn update(&self, id: &str, patch: BookmarkPatch) -> Result<Bookmark>;

    /// Delete locally and enqueue the remote delete, atomically
    fn delete(&self, id: &str) -> Result<()>;

    /// Rows awaiting push for this user, oldest update first
    fn pending(&self, user_id: &UserId) -> Result<Vec<PendingRow>>;
}

/// `SQLite` implementation of `BookmarkRepository`
pub struct SqliteBookmarkRepository<'a> {
    conn: &'a Connection,
}

type RawRow = (
    String,
    String,
    i64,
    i64,
    i64,
    Option<String>,
    Option<String>,
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

fn to_model(raw: RawRow) -> Result<Bookmark> {
    let (id, user_id, book_id, chapter, verse, note, tags, created_at, updated_at, status, synced) =
        raw;
    Ok(Bookmark {
        id: id
            .parse()
            .map_err(|_| Error::InvalidInput(format!("bad bookmark id {id:?}")))?,
        user_id: UserId::from(user_id),
        book_id,
        chapter,
        verse,
        note,
        tags: tags_from_column(tags)?,
        created_at: parse_timestamp(&created_at, "created_at")?,
        updated_at: parse_timestamp(&updated_at, "updated_at")?,
        sync_status: status.parse()?,
        last_synced_at: synced
            .map(|v| parse_timestamp(&v, "last_synced_at"))
            .transpose()?,
    })
}

impl<'a> SqliteBookmarkRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl BookmarkRepository for SqliteBookmarkRepository<'_> {
    fn create(&self, user_id: &UserId, params: NewBookmark) -> Result<Bookmark> {
        let bookmark = Bookmark::new(user_id.clone(), params);

        self.conn
            .execute(
                "INSERT INTO bookmarks_local
                 (id, user_id, book_id, chapter, verse, note, tags,
                  created_at, updated_at, sync_status, last_synced_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, NULL)",
                params![
                    bookmark.id.as_str(),
                    bookmark.user_id.as_str(),
                    bookmark.book_id,
                    bookmark.chapter,
                    bookmark.verse,
                    bookmark.note,
                    tags_to_column(bookmark.tags.as_ref())?,
                    crate::util::to_rfc3339(&bookmark.created_at),
                    crate::util::to_rfc3339(&bookmark.updated_at),
                    bookmark.sync_status.as_str(),
                ],
            )
            .map_err(|err| {
                Error::from_sqlite(
                    err,
                    &format!(
                        "verse {}:{}:{} is already bookmarked",
                        bookmark.book_id, bookmark.chapter, bookmark.verse
                    ),
                )
            })?;

        Ok(bookmark)
    }

    fn get(&self, id: &str) -> Result<Option<Bookmark>> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM bookmarks_local WHERE id = ?1"),
                [id],
                read_row,
            )
            .optional()?;
        raw.map(to_model).transpose()
    }

    fn list(&self, user_id: &UserId) -> Result<Vec<Bookmark>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM bookmarks_local WHERE user_id = ?1 ORDER BY created_at DESC"
        ))?;
        let rows = stmt
            .query_map([user_id.as_str()], read_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(to_model).collect()
    }

    fn list_for_chapter(
        &self,
        user_id: &UserId,
        book_id: i64,
        chapter: i64,
    ) -> Result<Vec<Bookmark>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM bookmarks_local
             WHERE user_id = ?1 AND book_id = ?2 AND chapter = ?3
             ORDER BY verse ASC"
        ))?;
        let rows = stmt
            .query_map(params![user_id.as_str(), book_id, chapter], read_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(to_model).collect()
    }

    fn update(&self, id: &str, patch: BookmarkPatch) -> Result<Bookmark> {
        let mut bookmark = self
            .get(id)?
            .ok_or_else(|| Error::NotFound(format!("bookmark {id}")))?;

        if let Some(note) = patch.note {
            bookmark.note = crate::util::normalize_text_option(Some(note));
        }
        if let Some(tags) = patch.tags {
            bookmark.tags = Some(tags);
        }
        bookmark.updated_at = crate::util::now();
        bookmark.sync_status = SyncStatus::Pending;

        self.conn.execute(
            "UPDATE bookmarks_local
             SET note = ?1, tags = ?2, updated_at = ?3, sync_status = 'pending'
             WHERE id = ?4",
            params![
                bookmark.note,
                tags_to_column(bookmark.tags.as_ref())?,
                crate::util::to_rfc3339(&bookmark.updated_at),
                id,
            ],
        )?;

        Ok(bookmark)
    }

    fn delete(&self, id: &str) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        super::queue_repository::insert(
            &tx,
            &SyncQueueItem::delete(crate::models::EntityKind::Bookmarks, id),
        )?;
        let deleted = tx.execute("DELETE FROM bookmarks_local WHERE id = ?1", [id])?;
        if deleted == 0 {
            // Rolls back; no ghost queue entry for a row that never existed.
            return Err(Error::NotFound(format!("bookmark {id}")));
        }
        tx.commit()?;
        Ok(())
    }

    fn pending(&self, user_id: &UserId) -> Result<Vec<PendingRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM bookmarks_local
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
                    .map(|b| b.remote_payload())
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
