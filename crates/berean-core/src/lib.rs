//! berean-core - Core library for Berean
//!
//! This crate contains the shared models, local SQLite store, and the
//! offline-first sync engine used by all Berean interfaces. Local writes are
//! always served from the embedded store; a background engine pushes pending
//! rows and queued deletions to the remote backend when connectivity allows.

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod services;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{Bookmark, Highlight, RecordId, Sermon, UserId, VerseNote};
pub use services::UserStore;
pub use sync::{SyncEngine, SyncReport, SyncSettings};
