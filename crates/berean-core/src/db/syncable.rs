//! Shared helpers for tables carrying sync-flag columns
//!
//! Every local entity table ends with the same four columns:
//! `created_at`, `updated_at`, `sync_status`, `last_synced_at`. The helpers
//! here read and flip those columns so the entity repositories don't each
//! reimplement the guarded status transitions.

use crate::error::{Error, Result};
use crate::models::SyncStatus;
use chrono::{DateTime, Utc};
use rusqlite::Connection;

/// A row awaiting push, as handed to the sync engine.
///
/// `updated_at` is kept as the raw stored text so the synced transition can
/// compare it byte-for-byte against the row's current value. `payload` is
/// `Err` when the row's serialized columns failed to decode; the engine marks
/// such rows `error` instead of aborting the pass.
#[derive(Debug, Clone)]
pub struct PendingRow {
    pub id: String,
    pub updated_at: String,
    pub payload: std::result::Result<serde_json::Value, String>,
}

/// Transition a row from `pending` to `synced`, but only if the row still
/// carries the `updated_at` it had when it was read for push. A local edit
/// that landed mid-push bumps `updated_at`, the guard fails, and the row
/// stays `pending` for the next pass.
///
/// Returns whether the transition happened.
pub fn mark_synced(
    conn: &Connection,
    table: &str,
    id: &str,
    expected_updated_at: &str,
    synced_at: DateTime<Utc>,
) -> Result<bool> {
    let changed = conn.execute(
        &format!(
            "UPDATE {table}
             SET sync_status = 'synced', last_synced_at = ?1
             WHERE id = ?2 AND sync_status = 'pending' AND updated_at = ?3"
        ),
        rusqlite::params![crate::util::to_rfc3339(&synced_at), id, expected_updated_at],
    )?;
    Ok(changed == 1)
}

/// Mark a row as having failed to push. The row is retried on later passes.
pub fn mark_error(conn: &Connection, table: &str, id: &str) -> Result<()> {
    conn.execute(
        &format!("UPDATE {table} SET sync_status = 'error' WHERE id = ?1"),
        [id],
    )?;
    Ok(())
}

/// Count rows per sync status for one table.
pub fn status_counts(conn: &Connection, table: &str) -> Result<Vec<(SyncStatus, u64)>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT sync_status, COUNT(*) FROM {table} GROUP BY sync_status"
    ))?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter()
        .map(|(status, count)| {
            let status: SyncStatus = status.parse()?;
            Ok((status, u64::try_from(count).unwrap_or(0)))
        })
        .collect()
}

/// Parse a stored RFC 3339 timestamp column.
pub fn parse_timestamp(value: &str, column: &str) -> Result<DateTime<Utc>> {
    crate::util::parse_rfc3339(value)
        .map_err(|err| Error::InvalidInput(format!("bad {column} timestamp {value:?}: {err}")))
}

/// Serialize an optional tag list into its TEXT column form.
pub fn tags_to_column(tags: Option<&Vec<String>>) -> Result<Option<String>> {
    tags.map(|t| serde_json::to_string(t).map_err(Error::from))
        .transpose()
}

/// Decode the TEXT tags column back into a list.
pub fn tags_from_column(value: Option<String>) -> Result<Option<Vec<String>>> {
    value
        .map(|v| serde_json::from_str(&v).map_err(Error::from))
        .transpose()
}
