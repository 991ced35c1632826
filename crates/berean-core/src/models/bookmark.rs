//! Bookmark model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::models::{RecordId, SyncStatus, UserId};

/// A verse bookmark.
///
/// Unique per `(user_id, book_id, chapter, verse)` - attempting to bookmark
/// the same verse twice surfaces a constraint error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: RecordId,
    pub user_id: UserId,
    pub book_id: i64,
    pub chapter: i64,
    pub verse: i64,
    pub note: Option<String>,
    pub tags: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub sync_status: SyncStatus,
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Parameters for creating a bookmark.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewBookmark {
    pub book_id: i64,
    pub chapter: i64,
    pub verse: i64,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Fields a bookmark update may rewrite; unset fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct BookmarkPatch {
    pub note: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl Bookmark {
    /// Build a fresh pending bookmark owned by `user_id`.
    #[must_use]
    pub fn new(user_id: UserId, params: NewBookmark) -> Self {
        let now = crate::util::now();
        Self {
            id: RecordId::new(),
            user_id,
            book_id: params.book_id,
            chapter: params.chapter,
            verse: params.verse,
            note: params.note,
            tags: params.tags,
            created_at: now,
            updated_at: now,
            sync_status: SyncStatus::Pending,
            last_synced_at: None,
        }
    }

    /// The row shape pushed to the remote `bookmarks` table.
    ///
    /// Sync bookkeeping columns stay local.
    #[must_use]
    pub fn remote_payload(&self) -> serde_json::Value {
        json!({
            "id": self.id.as_str(),
            "user_id": self.user_id.as_str(),
            "book_id": self.book_id,
            "chapter": self.chapter,
            "verse": self.verse,
            "note": self.note,
            "tags": self.tags,
            "created_at": self.created_at.to_rfc3339(),
            "updated_at": self.updated_at.to_rfc3339(),
        })
    }
}
