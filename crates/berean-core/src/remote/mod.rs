//! Remote backend access
//!
//! The engine talks to the backend through [`RemoteStore`], a two-operation
//! port (upsert and delete). The production implementation speaks the
//! Supabase REST dialect; tests substitute an in-memory fake.

mod supabase;

pub use supabase::SupabaseRestStore;

use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by a remote store.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Invalid remote configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Remote HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Remote API error: {0}")]
    Api(String),
    #[error("Not authenticated")]
    Unauthenticated,
}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Write-side port to the remote backend.
///
/// Both operations are idempotent: an upsert repeated with the same payload
/// and a delete repeated for the same id converge to the same remote state,
/// which is what lets the engine retry safely.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Insert-or-replace one row in the named remote table, keyed by its
    /// `id` field.
    async fn upsert(
        &self,
        access_token: &str,
        table: &str,
        row: &serde_json::Value,
    ) -> RemoteResult<()>;

    /// Delete the row with the given id; deleting an absent row succeeds.
    async fn delete(&self, access_token: &str, table: &str, id: &str) -> RemoteResult<()>;
}
