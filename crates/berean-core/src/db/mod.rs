//! Local `SQLite` store: connection handling, migrations, and repositories

mod bookmark_repository;
mod connection;
mod highlight_repository;
mod metadata_repository;
pub mod migrations;
mod note_repository;
mod queue_repository;
mod sermon_repository;
mod settings_repository;
pub mod syncable;

pub use bookmark_repository::{BookmarkRepository, SqliteBookmarkRepository};
pub use connection::Database;
pub use highlight_repository::{HighlightRepository, SqliteHighlightRepository};
pub use metadata_repository::{MetadataRepository, SqliteMetadataRepository};
pub use note_repository::{NoteRepository, SqliteNoteRepository};
pub use queue_repository::{QueueDisposition, QueueRepository, SqliteQueueRepository};
pub use sermon_repository::{SermonRepository, SqliteSermonRepository};
pub use settings_repository::{SettingsRepository, SqliteSettingsRepository};
