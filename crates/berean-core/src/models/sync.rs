//! Sync bookkeeping types: row status, entity kinds, queue items, metadata

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::models::RecordId;

/// Per-row sync marker.
///
/// A freshly created or updated row is always `Pending` until a sync pass
/// confirms remote acceptance. Only the sync engine may move a row away from
/// `Pending`; repositories may only set it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Pending,
    Synced,
    Conflict,
    Error,
}

impl SyncStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Synced => "synced",
            Self::Conflict => "conflict",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "synced" => Ok(Self::Synced),
            "conflict" => Ok(Self::Conflict),
            "error" => Ok(Self::Error),
            other => Err(Error::InvalidInput(format!(
                "unknown sync status: {other}"
            ))),
        }
    }
}

/// The four syncable entity families, in the fixed order a pass visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Sermons,
    Bookmarks,
    Highlights,
    Notes,
}

impl EntityKind {
    /// Fixed processing order for a sync pass.
    pub const ALL: [Self; 4] = [Self::Sermons, Self::Bookmarks, Self::Highlights, Self::Notes];

    /// Local table holding rows of this kind.
    #[must_use]
    pub const fn local_table(self) -> &'static str {
        match self {
            Self::Sermons => "sermons_local",
            Self::Bookmarks => "bookmarks_local",
            Self::Highlights => "highlights_local",
            Self::Notes => "notes_local",
        }
    }

    /// Remote table the rows are pushed to. Also the canonical string form
    /// stored in `sync_queue.entity_type` and `sync_metadata.entity_type`.
    #[must_use]
    pub const fn remote_table(self) -> &'static str {
        match self {
            Self::Sermons => "sermons",
            Self::Bookmarks => "bookmarks",
            Self::Highlights => "highlights",
            Self::Notes => "verse_notes",
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        self.remote_table()
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sermons" => Ok(Self::Sermons),
            "bookmarks" => Ok(Self::Bookmarks),
            "highlights" => Ok(Self::Highlights),
            "verse_notes" => Ok(Self::Notes),
            other => Err(Error::InvalidInput(format!(
                "unknown entity kind: {other}"
            ))),
        }
    }
}

/// A remote-side operation recorded in the sync queue.
///
/// Repositories currently only enqueue `Delete` (create/update flow through
/// the per-row pending marker), but the engine applies all three so queued
/// upserts replay correctly too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOperation {
    Create,
    Update,
    Delete,
}

impl SyncOperation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncOperation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(Error::InvalidInput(format!(
                "unknown sync operation: {other}"
            ))),
        }
    }
}

/// A durable record of a remote side effect that must survive process
/// restarts until applied or exhausted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncQueueItem {
    pub id: RecordId,
    pub entity_type: EntityKind,
    pub entity_id: String,
    pub operation: SyncOperation,
    /// Opaque serialized snapshot needed to replay the operation remotely.
    /// `{}` for deletions (the entity id is enough).
    pub payload: String,
    pub created_at: DateTime<Utc>,
    pub retry_count: u32,
    pub last_error: Option<String>,
}

impl SyncQueueItem {
    /// Build a delete intent for the given entity row.
    #[must_use]
    pub fn delete(entity_type: EntityKind, entity_id: impl Into<String>) -> Self {
        Self {
            id: RecordId::new(),
            entity_type,
            entity_id: entity_id.into(),
            operation: SyncOperation::Delete,
            payload: "{}".to_string(),
            created_at: crate::util::now(),
            retry_count: 0,
            last_error: None,
        }
    }
}

/// Per-entity-type sync bookkeeping.
///
/// `last_sync_token` is a reserved extension point for incremental pulls; the
/// current engine stamps `last_sync_at` only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMetadata {
    pub entity_type: EntityKind,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_sync_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_status_round_trip() {
        for status in [
            SyncStatus::Pending,
            SyncStatus::Synced,
            SyncStatus::Conflict,
            SyncStatus::Error,
        ] {
            assert_eq!(status.as_str().parse::<SyncStatus>().unwrap(), status);
        }
        assert!("bogus".parse::<SyncStatus>().is_err());
    }

    #[test]
    fn entity_kind_round_trip() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.as_str().parse::<EntityKind>().unwrap(), kind);
        }
        assert!("widgets".parse::<EntityKind>().is_err());
    }

    #[test]
    fn entity_kind_order_is_fixed() {
        assert_eq!(
            EntityKind::ALL,
            [
                EntityKind::Sermons,
                EntityKind::Bookmarks,
                EntityKind::Highlights,
                EntityKind::Notes
            ]
        );
    }

    #[test]
    fn delete_intent_starts_fresh() {
        let item = SyncQueueItem::delete(EntityKind::Bookmarks, "some-id");
        assert_eq!(item.operation, SyncOperation::Delete);
        assert_eq!(item.retry_count, 0);
        assert_eq!(item.payload, "{}");
        assert!(item.last_error.is_none());
    }
}
