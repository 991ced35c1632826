//! Sermon repository implementation
//!
//! The structured `content` and `source_verses` fields live in JSON text
//! columns and are validated on every read. A row whose JSON no longer
//! decodes is reported per-row by `pending`, so one corrupt sermon can't
//! stall the push of the rest.

use crate::db::syncable::{parse_timestamp, tags_from_column, tags_to_column, PendingRow};
use crate::error::{Error, Result};
use crate::models::{NewSermon, Sermon, SermonPatch, SyncQueueItem, SyncStatus, UserId};
use rusqlite::{params, Connection, OptionalExtension};

const COLUMNS: &str = "id, user_id, title, content, source_verses, sermon_type, \
                       target_audience, language, ai_model_used, tags, \
                       created_at, updated_at, sync_status, last_synced_at";

/// Trait for sermon storage operations
pub trait SermonRepository {
    /// Store a finished sermon record
    fn create(&self, user_id: &UserId, params: NewSermon) -> Result<Sermon>;

    /// Get a sermon by ID
    fn get(&self, id: &str) -> Result<Option<Sermon>>;

    /// List all of a user's sermons, newest first
    fn list(&self, user_id: &UserId) -> Result<Vec<Sermon>>;

    /// Apply a patch; the row returns to `pending`
    fn update(&self, id: &str, patch: SermonPatch) -> Result<Sermon>;

    /// Delete locally and enqueue the remote delete, atomically
    fn delete(&self, id: &str) -> Result<()>;

    /// Rows awaiting push for this user, oldest update first
    fn pending(&self, user_id: &UserId) -> Result<Vec<PendingRow>>;
}

/// `SQLite` implementation of `SermonRepository`
pub struct SqliteSermonRepository<'a> {
    conn: &'a Connection,
}

type RawRow = (
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
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
        row.get(11)?,
        row.get(12)?,
        row.get(13)?,
    ))
}

fn to_model(raw: RawRow) -> Result<Sermon> {
    let (
        id,
        user_id,
        title,
        content,
        source_verses,
        sermon_type,
        target_audience,
        language,
        ai_model_used,
        tags,
        created,
        updated,
        status,
        synced,
    ) = raw;
    Ok(Sermon {
        id: id
            .parse()
            .map_err(|_| Error::InvalidInput(format!("bad sermon id {id:?}")))?,
        user_id: UserId::from(user_id),
        title,
        content: serde_json::from_str(&content)?,
        source_verses: serde_json::from_str(&source_verses)?,
        sermon_type: sermon_type.parse()?,
        target_audience: target_audience.parse()?,
        language,
        ai_model_used,
        tags: tags_from_column(tags)?,
        created_at: parse_timestamp(&created, "created_at")?,
        updated_at: parse_timestamp(&updated, "updated_at")?,
        sync_status: status.parse()?,
        last_synced_at: synced
            .map(|v| parse_timestamp(&v, "last_synced_at"))
            .transpose()?,
    })
}

impl<'a> SqliteSermonRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl SermonRepository for SqliteSermonRepository<'_> {
    fn create(&self, user_id: &UserId, params: NewSermon) -> Result<Sermon> {
        if params.title.trim().is_empty() {
            return Err(Error::InvalidInput("sermon title is empty".to_string()));
        }
        if params.source_verses.is_empty() {
            return Err(Error::InvalidInput(
                "sermon needs at least one source verse".to_string(),
            ));
        }
        let sermon = Sermon::new(user_id.clone(), params);

        self.conn.execute(
            "INSERT INTO sermons_local
             (id, user_id, title, content, source_verses, sermon_type,
              target_audience, language, ai_model_used, tags,
              created_at, updated_at, sync_status, last_synced_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, NULL)",
            params![
                sermon.id.as_str(),
                sermon.user_id.as_str(),
                sermon.title,
                serde_json::to_string(&sermon.content)?,
                serde_json::to_string(&sermon.source_verses)?,
                sermon.sermon_type.as_str(),
                sermon.target_audience.as_str(),
                sermon.language,
                sermon.ai_model_used,
                tags_to_column(sermon.tags.as_ref())?,
                crate::util::to_rfc3339(&sermon.created_at),
                crate::util::to_rfc3339(&sermon.updated_at),
                sermon.sync_status.as_str(),
            ],
        )?;

        Ok(sermon)
    }

    fn get(&self, id: &str) -> Result<Option<Sermon>> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM sermons_local WHERE id = ?1"),
                [id],
                read_row,
            )
            .optional()?;
        raw.map(to_model).transpose()
    }

    fn list(&self, user_id: &UserId) -> Result<Vec<Sermon>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM sermons_local WHERE user_id = ?1 ORDER BY created_at DESC"
        ))?;
        let rows = stmt
            .query_map([user_id.as_str()], read_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(to_model).collect()
    }

    fn update(&self, id: &str, patch: SermonPatch) -> Result<Sermon> {
        let mut sermon = self
            .get(id)?
            .ok_or_else(|| Error::NotFound(format!("sermon {id}")))?;

        if let Some(title) = patch.title {
            if title.trim().is_empty() {
                return Err(Error::InvalidInput("sermon title is empty".to_string()));
            }
            sermon.title = title;
        }
        if let Some(tags) = patch.tags {
            sermon.tags = Some(tags);
        }
        sermon.updated_at = crate::util::now();
        sermon.sync_status = SyncStatus::Pending;

        self.conn.execute(
            "UPDATE sermons_local
             SET title = ?1, tags = ?2, updated_at = ?3, sync_status = 'pending'
             WHERE id = ?4",
            params![
                sermon.title,
                tags_to_column(sermon.tags.as_ref())?,
                crate::util::to_rfc3339(&sermon.updated_at),
                id,
            ],
        )?;

        Ok(sermon)
    }

    fn delete(&self, id: &str) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        super::queue_repository::insert(
            &tx,
            &SyncQueueItem::delete(crate::models::EntityKind::Sermons, id),
        )?;
        let deleted = tx.execute("DELETE FROM sermons_local WHERE id = ?1", [id])?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("sermon {id}")));
        }
        tx.commit()?;
        Ok(())
    }

    fn pending(&self, user_id: &UserId) -> Result<Vec<PendingRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM sermons_local
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
                let updated_at = raw.11.clone();
                let payload = to_model(raw)
                    .map(|s| s.remote_payload())
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
