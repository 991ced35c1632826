//! Verse note model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::models::{RecordId, SyncStatus, UserId};

/// A free-text note attached to a single verse.
///
/// One note per `(user_id, book_id, chapter, verse)`: creating a note for an
/// already-noted verse replaces the existing row instead of appending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerseNote {
    pub id: RecordId,
    pub user_id: UserId,
    pub book_id: i64,
    pub chapter: i64,
    pub verse: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub sync_status: SyncStatus,
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Parameters for creating a verse note.
#[derive(Debug, Clone, Deserialize)]
pub struct NewVerseNote {
    pub book_id: i64,
    pub chapter: i64,
    pub verse: i64,
    pub content: String,
}

impl VerseNote {
    /// Build a fresh pending verse note owned by `user_id`.
    #[must_use]
    pub fn new(user_id: UserId, params: NewVerseNote) -> Self {
        let now = crate::util::now();
        Self {
            id: RecordId::new(),
            user_id,
            book_id: params.book_id,
            chapter: params.chapter,
            verse: params.verse,
            content: params.content,
            created_at: now,
            updated_at: now,
            sync_status: SyncStatus::Pending,
            last_synced_at: None,
        }
    }

    /// The row shape pushed to the remote `verse_notes` table.
    #[must_use]
    pub fn remote_payload(&self) -> serde_json::Value {
        json!({
            "id": self.id.as_str(),
            "user_id": self.user_id.as_str(),
            "book_id": self.book_id,
            "chapter": self.chapter,
            "verse": self.verse,
            "content": self.content,
            "created_at": self.created_at.to_rfc3339(),
            "updated_at": self.updated_at.to_rfc3339(),
        })
    }
}
