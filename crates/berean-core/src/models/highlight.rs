//! Highlight model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::models::{RecordId, SyncStatus, UserId};

/// Default highlight color when the caller does not pick one.
pub const DEFAULT_HIGHLIGHT_COLOR: &str = "#FFEB3B";

/// A colored highlight over a verse range within one chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlight {
    pub id: RecordId,
    pub user_id: UserId,
    pub book_id: i64,
    pub chapter: i64,
    pub verse_start: i64,
    pub verse_end: i64,
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub sync_status: SyncStatus,
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Parameters for creating a highlight.
#[derive(Debug, Clone, Deserialize)]
pub struct NewHighlight {
    pub book_id: i64,
    pub chapter: i64,
    pub verse_start: i64,
    pub verse_end: i64,
    #[serde(default)]
    pub color: Option<String>,
}

impl Highlight {
    /// Build a fresh pending highlight owned by `user_id`.
    #[must_use]
    pub fn new(user_id: UserId, params: NewHighlight) -> Self {
        let now = crate::util::now();
        Self {
            id: RecordId::new(),
            user_id,
            book_id: params.book_id,
            chapter: params.chapter,
            verse_start: params.verse_start,
            verse_end: params.verse_end,
            color: params
                .color
                .unwrap_or_else(|| DEFAULT_HIGHLIGHT_COLOR.to_string()),
            created_at: now,
            updated_at: now,
            sync_status: SyncStatus::Pending,
            last_synced_at: None,
        }
    }

    /// The row shape pushed to the remote `highlights` table.
    #[must_use]
    pub fn remote_payload(&self) -> serde_json::Value {
        json!({
            "id": self.id.as_str(),
            "user_id": self.user_id.as_str(),
            "book_id": self.book_id,
            "chapter": self.chapter,
            "verse_start": self.verse_start,
            "verse_end": self.verse_end,
            "color": self.color,
            "created_at": self.created_at.to_rfc3339(),
            "updated_at": self.updated_at.to_rfc3339(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_color_applied() {
        let highlight = Highlight::new(
            UserId::from("user-1"),
            NewHighlight {
                book_id: 19,
                chapter: 23,
                verse_start: 1,
                verse_end: 6,
                color: None,
            },
        );
        assert_eq!(highlight.color, DEFAULT_HIGHLIGHT_COLOR);
        assert_eq!(highlight.sync_status, SyncStatus::Pending);
    }
}
