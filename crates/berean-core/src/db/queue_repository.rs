//! Durable sync queue storage
//!
//! Queue rows outlive the in-memory process: an operation enqueued here
//! survives restarts until a sync pass either applies it remotely or drops it
//! after exhausting its retry budget.

use crate::db::syncable::parse_timestamp;
use crate::error::{Error, Result};
use crate::models::{RecordId, SyncQueueItem};
use rusqlite::{params, Connection, OptionalExtension};

/// What became of a queue item after a failed application attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueDisposition {
    /// The item stays queued; the new retry count is carried.
    Retrying(u32),
    /// The item exhausted its retry budget and was removed.
    Dropped,
}

/// Trait for sync queue storage operations
pub trait QueueRepository {
    /// Append an operation to the queue.
    fn enqueue(&self, item: &SyncQueueItem) -> Result<()>;

    /// The oldest queued operations, up to `limit`, in enqueue order.
    fn next_batch(&self, limit: u32) -> Result<Vec<SyncQueueItem>>;

    /// Remove an item whose operation was applied remotely.
    fn acknowledge(&self, id: &RecordId) -> Result<()>;

    /// Record a failed application attempt.
    ///
    /// An item that has already been attempted `max_retries + 1` times is
    /// removed rather than retried again.
    fn record_failure(
        &self,
        id: &RecordId,
        error: &str,
        max_retries: u32,
    ) -> Result<QueueDisposition>;

    /// Number of queued operations.
    fn len(&self) -> Result<u64>;
}

/// `SQLite` implementation of `QueueRepository`
pub struct SqliteQueueRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteQueueRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

/// Insert a queue row. Shared with the entity repositories, which enqueue a
/// delete intent inside the same transaction that removes the local row.
pub(crate) fn insert(conn: &Connection, item: &SyncQueueItem) -> Result<()> {
    conn.execute(
        "INSERT INTO sync_queue
         (id, entity_type, entity_id, operation, payload, created_at, retry_count, last_error)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            item.id.as_str(),
            item.entity_type.as_str(),
            item.entity_id,
            item.operation.as_str(),
            item.payload,
            crate::util::to_rfc3339(&item.created_at),
            item.retry_count,
            item.last_error,
        ],
    )?;
    Ok(())
}

fn to_item(
    row: (
        String,
        String,
        String,
        String,
        String,
        String,
        i64,
        Option<String>,
    ),
) -> Result<SyncQueueItem> {
    let (id, entity_type, entity_id, operation, payload, created_at, retry_count, last_error) = row;
    Ok(SyncQueueItem {
        id: id
            .parse()
            .map_err(|_| Error::InvalidInput(format!("bad queue item id {id:?}")))?,
        entity_type: entity_type.parse()?,
        entity_id,
        operation: operation.parse()?,
        payload,
        created_at: parse_timestamp(&created_at, "created_at")?,
        retry_count: u32::try_from(retry_count).unwrap_or(0),
        last_error,
    })
}

impl QueueRepository for SqliteQueueRepository<'_> {
    fn enqueue(&self, item: &SyncQueueItem) -> Result<()> {
        insert(self.conn, item)
    }

    fn next_batch(&self, limit: u32) -> Result<Vec<SyncQueueItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, entity_type, entity_id, operation, payload, created_at, retry_count, last_error
             FROM sync_queue
             ORDER BY created_at ASC, id ASC
             LIMIT ?1",
        )?;
        let rows = stmt
            .query_map([limit], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, i64>(6)?,
                    row.get::<_, Option<String>>(7)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(to_item).collect()
    }

    fn acknowledge(&self, id: &RecordId) -> Result<()> {
        self.conn
            .execute("DELETE FROM sync_queue WHERE id = ?1", [id.as_str()])?;
        Ok(())
    }

    fn record_failure(
        &self,
        id: &RecordId,
        error: &str,
        max_retries: u32,
    ) -> Result<QueueDisposition> {
        let retry_count: Option<i64> = self
            .conn
            .query_row(
                "SELECT retry_count FROM sync_queue WHERE id = ?1",
                [id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(retry_count) = retry_count else {
            return Err(Error::NotFound(format!("queue item {id}")));
        };
        let retry_count = u32::try_from(retry_count).unwrap_or(0);

        if retry_count < max_retries {
            self.conn.execute(
                "UPDATE sync_queue SET retry_count = retry_count + 1, last_error = ?1 WHERE id = ?2",
                params![error, id.as_str()],
            )?;
            Ok(QueueDisposition::Retrying(retry_count + 1))
        } else {
            self.conn
                .execute("DELETE FROM sync_queue WHERE id = ?1", [id.as_str()])?;
            Ok(QueueDisposition::Dropped)
        }
    }

    fn len(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sync_queue", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{EntityKind, SyncOperation};

    fn repo_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_enqueue_and_drain_in_order() {
        let db = repo_db();
        let repo = SqliteQueueRepository::new(db.connection());

        let first = SyncQueueItem {
            created_at: crate::util::parse_rfc3339("2026-01-01T00:00:00Z").unwrap(),
            ..SyncQueueItem::delete(EntityKind::Bookmarks, "b1")
        };
        let second = SyncQueueItem {
            created_at: crate::util::parse_rfc3339("2026-01-02T00:00:00Z").unwrap(),
            ..SyncQueueItem::delete(EntityKind::Notes, "n1")
        };
        repo.enqueue(&second).unwrap();
        repo.enqueue(&first).unwrap();

        let batch = repo.next_batch(10).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].entity_id, "b1");
        assert_eq!(batch[1].entity_id, "n1");
        assert_eq!(batch[0].operation, SyncOperation::Delete);
    }

    #[test]
    fn test_next_batch_respects_limit() {
        let db = repo_db();
        let repo = SqliteQueueRepository::new(db.connection());
        for i in 0..5 {
            repo.enqueue(&SyncQueueItem::delete(EntityKind::Highlights, format!("h{i}")))
                .unwrap();
        }
        assert_eq!(repo.next_batch(3).unwrap().len(), 3);
        assert_eq!(repo.len().unwrap(), 5);
    }

    #[test]
    fn test_acknowledge_removes_item() {
        let db = repo_db();
        let repo = SqliteQueueRepository::new(db.connection());
        let item = SyncQueueItem::delete(EntityKind::Bookmarks, "b1");
        repo.enqueue(&item).unwrap();
        repo.acknowledge(&item.id).unwrap();
        assert_eq!(repo.len().unwrap(), 0);
    }

    #[test]
    fn test_failure_increments_then_drops() {
        let db = repo_db();
        let repo = SqliteQueueRepository::new(db.connection());
        let item = SyncQueueItem::delete(EntityKind::Bookmarks, "b1");
        repo.enqueue(&item).unwrap();

        // max_retries = 2 allows exactly three attempts before the drop.
        assert_eq!(
            repo.record_failure(&item.id, "timeout", 2).unwrap(),
            QueueDisposition::Retrying(1)
        );
        assert_eq!(
            repo.record_failure(&item.id, "timeout", 2).unwrap(),
            QueueDisposition::Retrying(2)
        );
        assert_eq!(
            repo.record_failure(&item.id, "timeout", 2).unwrap(),
            QueueDisposition::Dropped
        );
        assert_eq!(repo.len().unwrap(), 0);
    }

    #[test]
    fn test_failure_records_last_error() {
        let db = repo_db();
        let repo = SqliteQueueRepository::new(db.connection());
        let item = SyncQueueItem::delete(EntityKind::Bookmarks, "b1");
        repo.enqueue(&item).unwrap();
        repo.record_failure(&item.id, "503 from remote", 3).unwrap();

        let batch = repo.next_batch(1).unwrap();
        assert_eq!(batch[0].retry_count, 1);
        assert_eq!(batch[0].last_error.as_deref(), Some("503 from remote"));
    }

    #[test]
    fn test_failure_on_missing_item() {
        let db = repo_db();
        let repo = SqliteQueueRepository::new(db.connection());
        let missing = RecordId::new();
        assert!(matches!(
            repo.record_failure(&missing, "x", 3),
            Err(Error::NotFound(_))
        ));
    }
}
