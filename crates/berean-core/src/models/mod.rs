//! Data models for Berean

mod bookmark;
mod highlight;
mod ids;
mod sermon;
mod sync;
mod verse_note;

pub use bookmark::{Bookmark, BookmarkPatch, NewBookmark};
pub use highlight::{Highlight, NewHighlight, DEFAULT_HIGHLIGHT_COLOR};
pub use ids::{RecordId, UserId};
pub use sermon::{
    NewSermon, Sermon, SermonContent, SermonPatch, SermonPoint, SermonType, TargetAudience,
    VerseReference, DEFAULT_LANGUAGE,
};
pub use sync::{EntityKind, SyncMetadata, SyncOperation, SyncQueueItem, SyncStatus};
pub use verse_note::{NewVerseNote, VerseNote};
