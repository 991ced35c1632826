//! Shared user-data store wrapper used across clients.
//!
//! Every read and write funnels through one async mutex around the embedded
//! database, so repository calls and sync-engine bookkeeping never interleave
//! mid-transaction. All operations complete locally; nothing here waits on
//! the network.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::db::{
    BookmarkRepository, Database, HighlightRepository, MetadataRepository, NoteRepository,
    QueueDisposition, QueueRepository, SermonRepository, SettingsRepository,
    SqliteBookmarkRepository, SqliteHighlightRepository, SqliteMetadataRepository,
    SqliteNoteRepository, SqliteQueueRepository, SqliteSermonRepository,
    SqliteSettingsRepository,
};
use crate::db::syncable::{self, PendingRow};
use crate::models::{
    Bookmark, BookmarkPatch, EntityKind, Highlight, NewBookmark, NewHighlight, NewSermon,
    NewVerseNote, RecordId, Sermon, SermonPatch, SyncMetadata, SyncQueueItem, SyncStatus, UserId,
    VerseNote,
};
use crate::Result;

/// Per-entity-kind row counts by sync status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityStats {
    pub kind: EntityKind,
    pub pending: u64,
    pub synced: u64,
    pub conflict: u64,
    pub error: u64,
}

/// Snapshot of local sync state, as shown by `berean status`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub queued: u64,
    pub entities: Vec<EntityStats>,
}

/// Thread-safe service for store and repository operations.
#[derive(Clone)]
pub struct UserStore {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl UserStore {
    /// Open a store at the given filesystem path.
    pub fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::open(&db_path)?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory store (primarily for tests).
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            db: Arc::new(Mutex::new(Database::open_in_memory()?)),
            db_path: None,
        })
    }

    /// The filesystem path of the backing database, if any.
    #[must_use]
    pub fn db_path(&self) -> Option<&PathBuf> {
        self.db_path.as_ref()
    }

    // --- bookmarks ---

    pub async fn create_bookmark(&self, user: &UserId, params: NewBookmark) -> Result<Bookmark> {
        let db = self.db.lock().await;
        SqliteBookmarkRepository::new(db.connection()).create(user, params)
    }

    pub async fn get_bookmark(&self, id: &str) -> Result<Option<Bookmark>> {
        let db = self.db.lock().await;
        SqliteBookmarkRepository::new(db.connection()).get(id)
    }

    pub async fn list_bookmarks(&self, user: &UserId) -> Result<Vec<Bookmark>> {
        let db = self.db.lock().await;
        SqliteBookmarkRepository::new(db.connection()).list(user)
    }

    pub async fn bookmarks_for_chapter(
        &self,
        user: &UserId,
        book_id: i64,
        chapter: i64,
    ) -> Result<Vec<Bookmark>> {
        let db = self.db.lock().await;
        SqliteBookmarkRepository::new(db.connection()).list_for_chapter(user, book_id, chapter)
    }

    pub async fn update_bookmark(&self, id: &str, patch: BookmarkPatch) -> Result<Bookmark> {
        let db = self.db.lock().await;
        SqliteBookmarkRepository::new(db.connection()).update(id, patch)
    }

    pub async fn delete_bookmark(&self, id: &str) -> Result<()> {
        let db = self.db.lock().await;
        SqliteBookmarkRepository::new(db.connection()).delete(id)
    }

    // --- highlights ---

    pub async fn create_highlight(&self, user: &UserId, params: NewHighlight) -> Result<Highlight> {
        let db = self.db.lock().await;
        SqliteHighlightRepository::new(db.connection()).create(user, params)
    }

    pub async fn highlights_for_chapter(
        &self,
        user: &UserId,
        book_id: i64,
        chapter: i64,
    ) -> Result<Vec<Highlight>> {
        let db = self.db.lock().await;
        SqliteHighlightRepository::new(db.connection()).list_for_chapter(user, book_id, chapter)
    }

    pub async fn recolor_highlight(&self, id: &str, color: &str) -> Result<Highlight> {
        let db = self.db.lock().await;
        SqliteHighlightRepository::new(db.connection()).recolor(id, color)
    }

    pub async fn delete_highlight(&self, id: &str) -> Result<()> {
        let db = self.db.lock().await;
        SqliteHighlightRepository::new(db.connection()).delete(id)
    }

    // --- verse notes ---

    pub async fn put_note(&self, user: &UserId, params: NewVerseNote) -> Result<VerseNote> {
        let db = self.db.lock().await;
        SqliteNoteRepository::new(db.connection()).put(user, params)
    }

    pub async fn note_for_verse(
        &self,
        user: &UserId,
        book_id: i64,
        chapter: i64,
        verse: i64,
    ) -> Result<Option<VerseNote>> {
        let db = self.db.lock().await;
        SqliteNoteRepository::new(db.connection()).get_for_verse(user, book_id, chapter, verse)
    }

    pub async fn notes_for_chapter(
        &self,
        user: &UserId,
        book_id: i64,
        chapter: i64,
    ) -> Result<Vec<VerseNote>> {
        let db = self.db.lock().await;
        SqliteNoteRepository::new(db.connection()).list_for_chapter(user, book_id, chapter)
    }

    pub async fn update_note_content(&self, id: &str, content: &str) -> Result<VerseNote> {
        let db = self.db.lock().await;
        SqliteNoteRepository::new(db.connection()).update_content(id, content)
    }

    pub async fn delete_note(&self, id: &str) -> Result<()> {
        let db = self.db.lock().await;
        SqliteNoteRepository::new(db.connection()).delete(id)
    }

    // --- sermons ---

    pub async fn create_sermon(&self, user: &UserId, params: NewSermon) -> Result<Sermon> {
        let db = self.db.lock().await;
        SqliteSermonRepository::new(db.connection()).create(user, params)
    }

    pub async fn get_sermon(&self, id: &str) -> Result<Option<Sermon>> {
        let db = self.db.lock().await;
        SqliteSermonRepository::new(db.connection()).get(id)
    }

    pub async fn list_sermons(&self, user: &UserId) -> Result<Vec<Sermon>> {
        let db = self.db.lock().await;
        SqliteSermonRepository::new(db.connection()).list(user)
    }

    pub async fn update_sermon(&self, id: &str, patch: SermonPatch) -> Result<Sermon> {
        let db = self.db.lock().await;
        SqliteSermonRepository::new(db.connection()).update(id, patch)
    }

    pub async fn delete_sermon(&self, id: &str) -> Result<()> {
        let db = self.db.lock().await;
        SqliteSermonRepository::new(db.connection()).delete(id)
    }

    // --- settings ---

    pub async fn setting(&self, key: &str) -> Result<Option<String>> {
        let db = self.db.lock().await;
        SqliteSettingsRepository::new(db.connection()).get(key)
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let db = self.db.lock().await;
        SqliteSettingsRepository::new(db.connection()).set(key, value)
    }

    // --- sync engine support ---

    /// All rows of one kind awaiting push for `user`, oldest update first.
    pub async fn pending_rows(&self, kind: EntityKind, user: &UserId) -> Result<Vec<PendingRow>> {
        let db = self.db.lock().await;
        let conn = db.connection();
        match kind {
            EntityKind::Sermons => SqliteSermonRepository::new(conn).pending(user),
            EntityKind::Bookmarks => SqliteBookmarkRepository::new(conn).pending(user),
            EntityKind::Highlights => SqliteHighlightRepository::new(conn).pending(user),
            EntityKind::Notes => SqliteNoteRepository::new(conn).pending(user),
        }
    }

    /// Guarded pending-to-synced transition; see [`syncable::mark_synced`].
    pub async fn mark_synced(
        &self,
        kind: EntityKind,
        id: &str,
        expected_updated_at: &str,
    ) -> Result<bool> {
        let db = self.db.lock().await;
        syncable::mark_synced(
            db.connection(),
            kind.local_table(),
            id,
            expected_updated_at,
            crate::util::now(),
        )
    }

    pub async fn mark_row_error(&self, kind: EntityKind, id: &str) -> Result<()> {
        let db = self.db.lock().await;
        syncable::mark_error(db.connection(), kind.local_table(), id)
    }

    pub async fn enqueue(&self, item: &SyncQueueItem) -> Result<()> {
        let db = self.db.lock().await;
        SqliteQueueRepository::new(db.connection()).enqueue(item)
    }

    pub async fn queue_batch(&self, limit: u32) -> Result<Vec<SyncQueueItem>> {
        let db = self.db.lock().await;
        SqliteQueueRepository::new(db.connection()).next_batch(limit)
    }

    pub async fn acknowledge_queued(&self, id: &RecordId) -> Result<()> {
        let db = self.db.lock().await;
        SqliteQueueRepository::new(db.connection()).acknowledge(id)
    }

    pub async fn record_queue_failure(
        &self,
        id: &RecordId,
        error: &str,
        max_retries: u32,
    ) -> Result<QueueDisposition> {
        let db = self.db.lock().await;
        SqliteQueueRepository::new(db.connection()).record_failure(id, error, max_retries)
    }

    pub async fn sync_metadata(&self, kind: EntityKind) -> Result<Option<SyncMetadata>> {
        let db = self.db.lock().await;
        SqliteMetadataRepository::new(db.connection()).get(kind)
    }

    pub async fn touch_sync_metadata(&self, kind: EntityKind, at: DateTime<Utc>) -> Result<()> {
        let db = self.db.lock().await;
        SqliteMetadataRepository::new(db.connection()).touch(kind, at)
    }

    // --- status / maintenance ---

    /// Row counts by sync status plus the queue depth.
    pub async fn sync_stats(&self) -> Result<SyncStats> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let mut entities = Vec::with_capacity(EntityKind::ALL.len());
        for kind in EntityKind::ALL {
            let mut stats = EntityStats {
                kind,
                pending: 0,
                synced: 0,
                conflict: 0,
                error: 0,
            };
            for (status, count) in syncable::status_counts(conn, kind.local_table())? {
                match status {
                    SyncStatus::Pending => stats.pending = count,
                    SyncStatus::Synced => stats.synced = count,
                    SyncStatus::Conflict => stats.conflict = count,
                    SyncStatus::Error => stats.error = count,
                }
            }
            entities.push(stats);
        }

        Ok(SyncStats {
            queued: SqliteQueueRepository::new(conn).len()?,
            entities,
        })
    }

    /// Remove every local row belonging to `user`, including queued
    /// operations for rows that no longer exist. Used on account removal.
    pub async fn clear_user_data(&self, user: &UserId) -> Result<()> {
        let db = self.db.lock().await;
        let conn = db.connection();
        let tx = conn.unchecked_transaction()?;
        for kind in EntityKind::ALL {
            tx.execute(
                &format!("DELETE FROM {} WHERE user_id = ?1", kind.local_table()),
                [user.as_str()],
            )?;
        }
        tx.execute("DELETE FROM sync_queue", [])?;
        tx.execute("DELETE FROM sync_metadata", [])?;
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
impl UserStore {
    /// Corrupt a bookmark's serialized tags column to exercise per-row
    /// decode-failure handling.
    pub(crate) async fn set_corrupt_tags_for_test(&self, id: &str) -> Result<()> {
        let db = self.db.lock().await;
        db.connection().execute(
            "UPDATE bookmarks_local SET tags = 'not json' WHERE id = ?1",
            [id],
        )?;
        Ok(())
    }

    /// Read a row's raw `sync_status` column.
    pub(crate) async fn raw_sync_status_for_test(&self, table: &str, id: &str) -> Result<String> {
        let db = self.db.lock().await;
        let status = db.connection().query_row(
            &format!("SELECT sync_status FROM {table} WHERE id = ?1"),
            [id],
            |row| row.get(0),
        )?;
        Ok(status)
    }
}
