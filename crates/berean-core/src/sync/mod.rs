//! Offline-first sync engine
//!
//! One pass pushes every `pending` row per entity kind, then drains one batch
//! of queued operations. Passes are idempotent: they act only on rows still
//! `pending` and items still queued, so an interrupted or re-run pass
//! converges to the same state. At most one pass runs per engine at a time;
//! callers racing the running pass return immediately.

mod scheduler;
mod settings;

pub use scheduler::{BackgroundScheduler, PeriodicSyncHandle, SchedulerError, TokioScheduler};
pub use settings::{
    SyncSettings, DEFAULT_BATCH_SIZE, DEFAULT_MAX_RETRIES, DEFAULT_SYNC_INTERVAL,
};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::auth::AuthProvider;
use crate::db::QueueDisposition;
use crate::models::{EntityKind, SyncOperation, SyncQueueItem, UserId};
use crate::remote::RemoteStore;
use crate::services::UserStore;
use crate::Result;

/// How a sync pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// No signed-in session; nothing was attempted.
    NotAuthenticated,
    /// Another pass was already in flight; nothing was attempted.
    AlreadyRunning,
    /// Every attempted push and queue item succeeded.
    Success,
    /// The pass completed but some rows or queue items failed; they remain
    /// for later passes (or were dropped, see [`SyncReport::dropped`]).
    PartialFailure,
}

/// A queue item removed after exhausting its retry budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedItem {
    pub entity_type: EntityKind,
    pub entity_id: String,
    pub operation: SyncOperation,
    pub last_error: String,
}

/// Summary of one sync pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub outcome: PassOutcome,
    /// Rows accepted by the remote store.
    pub pushed: u64,
    /// Rows whose remote push failed; they stay `pending`.
    pub push_failures: u64,
    /// Rows whose stored payload no longer decodes; marked `error` locally.
    pub rows_errored: u64,
    /// Queue items applied remotely and removed.
    pub queue_applied: u64,
    /// Queue items that failed and remain queued with a bumped retry count.
    pub queue_retried: u64,
    /// Queue items dropped this pass after exhausting retries.
    pub dropped: Vec<DroppedItem>,
}

impl SyncReport {
    fn empty(outcome: PassOutcome) -> Self {
        Self {
            outcome,
            pushed: 0,
            push_failures: 0,
            rows_errored: 0,
            queue_applied: 0,
            queue_retried: 0,
            dropped: Vec::new(),
        }
    }

    fn has_failures(&self) -> bool {
        self.push_failures > 0
            || self.rows_errored > 0
            || self.queue_retried > 0
            || !self.dropped.is_empty()
    }
}

/// Resets the running flag even when the pass errors out mid-flight.
struct PassGuard<'a>(&'a AtomicBool);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Orchestrates push-and-drain passes against the remote store.
///
/// Constructed once at process start and shared by handle; the periodic
/// scheduler, the background-task hook, and on-demand triggers all call the
/// same [`SyncEngine::sync_once`] and coalesce on the running flag.
pub struct SyncEngine {
    store: UserStore,
    remote: Arc<dyn RemoteStore>,
    auth: Arc<dyn AuthProvider>,
    settings: SyncSettings,
    running: AtomicBool,
}

impl SyncEngine {
    #[must_use]
    pub fn new(
        store: UserStore,
        remote: Arc<dyn RemoteStore>,
        auth: Arc<dyn AuthProvider>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            store,
            remote,
            auth,
            settings,
            running: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    #[must_use]
    pub const fn store(&self) -> &UserStore {
        &self.store
    }

    /// Whether a pass is currently in flight.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Run one sync pass.
    ///
    /// Returns immediately with [`PassOutcome::AlreadyRunning`] when another
    /// pass holds the flag, and with [`PassOutcome::NotAuthenticated`] when
    /// no session exists. Row-level failures are recorded in the report, not
    /// returned as errors; only local store failures abort the pass.
    pub async fn sync_once(&self) -> Result<SyncReport> {
        // Identity is checked fresh on every pass; a sign-out between passes
        // stops syncing without tearing the engine down.
        let Some(session) = self.auth.session().await else {
            debug!("sync skipped: not authenticated");
            return Ok(SyncReport::empty(PassOutcome::NotAuthenticated));
        };

        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("sync skipped: pass already in flight");
            return Ok(SyncReport::empty(PassOutcome::AlreadyRunning));
        }
        let _guard = PassGuard(&self.running);

        let user = session.user.id.clone();
        info!(user = %user, "sync pass started");

        let mut report = SyncReport::empty(PassOutcome::Success);
        for kind in EntityKind::ALL {
            self.push_kind(kind, &user, &session.access_token, &mut report)
                .await?;
        }
        self.drain_queue(&session.access_token, &mut report).await?;

        if report.has_failures() {
            report.outcome = PassOutcome::PartialFailure;
        }
        info!(
            pushed = report.pushed,
            push_failures = report.push_failures,
            queue_applied = report.queue_applied,
            queue_retried = report.queue_retried,
            dropped = report.dropped.len(),
            "sync pass finished"
        );
        Ok(report)
    }

    /// Push all pending rows of one kind.
    async fn push_kind(
        &self,
        kind: EntityKind,
        user: &UserId,
        access_token: &str,
        report: &mut SyncReport,
    ) -> Result<()> {
        let rows = self
            .store
            .pending_rows(kind, user)
            .await?;
        if rows.is_empty() {
            return Ok(());
        }
        debug!(kind = %kind, rows = rows.len(), "pushing pending rows");

        let mut kind_failures = 0_u64;
        for row in rows {
            match row.payload {
                Err(decode_error) => {
                    // Corrupt serialized columns; quarantine the row so it
                    // stops re-entering every pass.
                    warn!(kind = %kind, id = %row.id, error = %decode_error, "row payload invalid");
                    self.store.mark_row_error(kind, &row.id).await?;
                    report.rows_errored += 1;
                    kind_failures += 1;
                }
                Ok(payload) => {
                    match self
                        .remote
                        .upsert(access_token, kind.remote_table(), &payload)
                        .await
                    {
                        Ok(()) => {
                            let flipped = self
                                .store
                                .mark_synced(kind, &row.id, &row.updated_at)
                                .await?;
                            if !flipped {
                                // The row changed under us; it stays pending
                                // and the next pass re-pushes the newer state.
                                debug!(kind = %kind, id = %row.id, "row edited mid-push, left pending");
                            }
                            report.pushed += 1;
                        }
                        Err(err) => {
                            warn!(kind = %kind, id = %row.id, error = %err, "push failed");
                            // Flag the row so failures are visible in stats;
                            // any later local edit resets it to pending.
                            self.store.mark_row_error(kind, &row.id).await?;
                            report.push_failures += 1;
                            kind_failures += 1;
                        }
                    }
                }
            }
        }

        if kind_failures == 0 {
            self.store
                .touch_sync_metadata(kind, crate::util::now())
                .await?;
        }
        Ok(())
    }

    /// Apply one batch of queued operations, oldest first.
    async fn drain_queue(&self, access_token: &str, report: &mut SyncReport) -> Result<()> {
        let batch = self.store.queue_batch(self.settings.batch_size).await?;
        if batch.is_empty() {
            return Ok(());
        }
        debug!(items = batch.len(), "draining sync queue");

        for item in batch {
            match self.apply_queue_item(access_token, &item).await {
                Ok(()) => {
                    self.store.acknowledge_queued(&item.id).await?;
                    report.queue_applied += 1;
                }
                Err(message) => {
                    warn!(
                        entity = %item.entity_type,
                        id = %item.entity_id,
                        retry_count = item.retry_count,
                        error = %message,
                        "queue item failed"
                    );
                    match self
                        .store
                        .record_queue_failure(&item.id, &message, self.settings.max_retries)
                        .await?
                    {
                        QueueDisposition::Retrying(_) => report.queue_retried += 1,
                        QueueDisposition::Dropped => {
                            warn!(
                                entity = %item.entity_type,
                                id = %item.entity_id,
                                "queue item dropped after exhausting retries"
                            );
                            report.dropped.push(DroppedItem {
                                entity_type: item.entity_type,
                                entity_id: item.entity_id.clone(),
                                operation: item.operation,
                                last_error: message,
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Replay one queued operation remotely. Failures come back as strings
    /// so they can be stored in the item's `last_error` column.
    async fn apply_queue_item(
        &self,
        access_token: &str,
        item: &SyncQueueItem,
    ) -> std::result::Result<(), String> {
        let table = item.entity_type.remote_table();
        match item.operation {
            SyncOperation::Delete => self
                .remote
                .delete(access_token, table, &item.entity_id)
                .await
                .map_err(|err| err.to_string()),
            SyncOperation::Create | SyncOperation::Update => {
                let payload: serde_json::Value = serde_json::from_str(&item.payload)
                    .map_err(|err| format!("payload does not decode: {err}"))?;
                self.remote
                    .upsert(access_token, table, &payload)
                    .await
                    .map_err(|err| err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticAuth;
    use crate::models::{BookmarkPatch, NewBookmark, NewVerseNote, SyncStatus};
    use crate::remote::{RemoteError, RemoteResult};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct RemoteCall {
        op: &'static str,
        table: String,
        id: String,
    }

    /// In-memory remote with scriptable failures and an optional delay to
    /// hold a pass open.
    #[derive(Default)]
    struct FakeRemote {
        calls: Mutex<Vec<RemoteCall>>,
        failing_ids: Mutex<HashSet<String>>,
        fail_everything: AtomicBool,
        delay: Mutex<Option<Duration>>,
    }

    impl FakeRemote {
        fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn fail_all(&self, on: bool) {
            self.fail_everything.store(on, Ordering::SeqCst);
        }

        fn fail_id(&self, id: &str) {
            self.failing_ids.lock().unwrap().insert(id.to_string());
        }

        fn hold_for(&self, delay: Duration) {
            *self.delay.lock().unwrap() = Some(delay);
        }

        fn calls(&self) -> Vec<RemoteCall> {
            self.calls.lock().unwrap().clone()
        }

        async fn record(&self, op: &'static str, table: &str, id: String) -> RemoteResult<()> {
            let delay = *self.delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let should_fail = self.fail_everything.load(Ordering::SeqCst)
                || self.failing_ids.lock().unwrap().contains(&id);
            self.calls.lock().unwrap().push(RemoteCall {
                op,
                table: table.to_string(),
                id,
            });
            if should_fail {
                Err(RemoteError::Api("simulated outage (503)".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl RemoteStore for FakeRemote {
        async fn upsert(
            &self,
            _access_token: &str,
            table: &str,
            row: &serde_json::Value,
        ) -> RemoteResult<()> {
            let id = row["id"].as_str().unwrap_or_default().to_string();
            self.record("upsert", table, id).await
        }

        async fn delete(&self, _access_token: &str, table: &str, id: &str) -> RemoteResult<()> {
            self.record("delete", table, id.to_string()).await
        }
    }

    fn user() -> UserId {
        UserId::from("user-1")
    }

    fn engine_with(remote: Arc<FakeRemote>, settings: SyncSettings) -> SyncEngine {
        let store = UserStore::open_in_memory().unwrap();
        let auth = Arc::new(StaticAuth::signed_in(user(), "test-token"));
        SyncEngine::new(store, remote, auth, settings)
    }

    fn bookmark_at(verse: i64) -> NewBookmark {
        NewBookmark {
            book_id: 43,
            chapter: 3,
            verse,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_pass_pushes_pending_rows_and_is_idempotent() {
        let remote = FakeRemote::new();
        let engine = engine_with(remote.clone(), SyncSettings::default());
        let created = engine
            .store()
            .create_bookmark(&user(), bookmark_at(16))
            .await
            .unwrap();

        let report = engine.sync_once().await.unwrap();
        assert_eq!(report.outcome, PassOutcome::Success);
        assert_eq!(report.pushed, 1);

        let row = engine
            .store()
            .get_bookmark(&created.id.as_str())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.sync_status, SyncStatus::Synced);
        assert!(row.last_synced_at.is_some());

        // Second pass has nothing to do and touches the remote zero times.
        let before = remote.calls().len();
        let report = engine.sync_once().await.unwrap();
        assert_eq!(report.outcome, PassOutcome::Success);
        assert_eq!(report.pushed, 0);
        assert_eq!(remote.calls().len(), before);
    }

    #[tokio::test]
    async fn test_entity_kinds_push_in_fixed_order() {
        let remote = FakeRemote::new();
        let engine = engine_with(remote.clone(), SyncSettings::default());
        engine
            .store()
            .put_note(
                &user(),
                NewVerseNote {
                    book_id: 43,
                    chapter: 3,
                    verse: 16,
                    content: "note".to_string(),
                },
            )
            .await
            .unwrap();
        engine
            .store()
            .create_bookmark(&user(), bookmark_at(16))
            .await
            .unwrap();

        engine.sync_once().await.unwrap();
        let tables: Vec<String> = remote.calls().into_iter().map(|c| c.table).collect();
        assert_eq!(tables, vec!["bookmarks".to_string(), "verse_notes".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_survives_remote_outage() {
        let remote = FakeRemote::new();
        let engine = engine_with(remote.clone(), SyncSettings::default());
        let created = engine
            .store()
            .create_bookmark(&user(), bookmark_at(16))
            .await
            .unwrap();
        engine.sync_once().await.unwrap();
        engine
            .store()
            .delete_bookmark(&created.id.as_str())
            .await
            .unwrap();

        remote.fail_all(true);
        let report = engine.sync_once().await.unwrap();
        assert_eq!(report.outcome, PassOutcome::PartialFailure);
        assert_eq!(report.queue_retried, 1);

        // Row is gone but the delete intent is still queued with a bumped
        // retry count.
        assert!(engine
            .store()
            .get_bookmark(&created.id.as_str())
            .await
            .unwrap()
            .is_none());
        let queued = engine.store().queue_batch(10).await.unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].retry_count, 1);

        remote.fail_all(false);
        let report = engine.sync_once().await.unwrap();
        assert_eq!(report.queue_applied, 1);
        assert!(engine.store().queue_batch(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_queue_item_dropped_after_retry_budget() {
        let remote = FakeRemote::new();
        let engine = engine_with(
            remote.clone(),
            SyncSettings::default().with_max_retries(2),
        );
        let created = engine
            .store()
            .create_bookmark(&user(), bookmark_at(16))
            .await
            .unwrap();
        engine
            .store()
            .delete_bookmark(&created.id.as_str())
            .await
            .unwrap();
        remote.fail_all(true);

        // max_retries = 2 allows exactly three attempts.
        for _ in 0..2 {
            let report = engine.sync_once().await.unwrap();
            assert_eq!(report.queue_retried, 1);
            assert!(report.dropped.is_empty());
        }
        let report = engine.sync_once().await.unwrap();
        assert_eq!(report.queue_retried, 0);
        assert_eq!(report.dropped.len(), 1);
        assert_eq!(report.dropped[0].entity_id, created.id.as_str());
        assert_eq!(report.dropped[0].operation, SyncOperation::Delete);
        assert!(engine.store().queue_batch(10).await.unwrap().is_empty());

        let delete_attempts = remote
            .calls()
            .iter()
            .filter(|c| c.op == "delete")
            .count();
        assert_eq!(delete_attempts, 3);
    }

    #[tokio::test]
    async fn test_one_failing_row_does_not_block_the_rest() {
        let remote = FakeRemote::new();
        let engine = engine_with(remote.clone(), SyncSettings::default());
        let healthy = engine
            .store()
            .create_bookmark(&user(), bookmark_at(1))
            .await
            .unwrap();
        let failing = engine
            .store()
            .create_bookmark(&user(), bookmark_at(2))
            .await
            .unwrap();
        remote.fail_id(&failing.id.as_str());

        let report = engine.sync_once().await.unwrap();
        assert_eq!(report.outcome, PassOutcome::PartialFailure);
        assert_eq!(report.pushed, 1);
        assert_eq!(report.push_failures, 1);

        let healthy_row = engine
            .store()
            .get_bookmark(&healthy.id.as_str())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(healthy_row.sync_status, SyncStatus::Synced);
        let failing_row = engine
            .store()
            .get_bookmark(&failing.id.as_str())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(failing_row.sync_status, SyncStatus::Error);
    }

    #[tokio::test]
    async fn test_failed_push_flags_row_until_edited() {
        let remote = FakeRemote::new();
        let engine = engine_with(remote.clone(), SyncSettings::default());
        let created = engine
            .store()
            .create_bookmark(&user(), bookmark_at(9))
            .await
            .unwrap();
        remote.fail_all(true);

        let report = engine.sync_once().await.unwrap();
        assert_eq!(report.outcome, PassOutcome::PartialFailure);
        assert_eq!(report.push_failures, 1);
        let row = engine
            .store()
            .get_bookmark(&created.id.as_str())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.sync_status, SyncStatus::Error);

        // A flagged row does not re-enter the push until a local edit
        // resets it to pending.
        remote.fail_all(false);
        let report = engine.sync_once().await.unwrap();
        assert_eq!(report.pushed, 0);

        engine
            .store()
            .update_bookmark(
                &created.id.as_str(),
                BookmarkPatch {
                    note: Some("retry me".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let report = engine.sync_once().await.unwrap();
        assert_eq!(report.pushed, 1);
        let row = engine
            .store()
            .get_bookmark(&created.id.as_str())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.sync_status, SyncStatus::Synced);
    }

    #[tokio::test]
    async fn test_single_pass_clears_every_pending_row() {
        let remote = FakeRemote::new();
        let engine = engine_with(remote.clone(), SyncSettings::default().with_batch_size(50));
        for verse in 1..=60 {
            engine
                .store()
                .create_bookmark(&user(), bookmark_at(verse))
                .await
                .unwrap();
        }

        let report = engine.sync_once().await.unwrap();
        assert_eq!(report.outcome, PassOutcome::Success);
        assert_eq!(report.pushed, 60);
        let stats = engine.store().sync_stats().await.unwrap();
        let bookmarks = stats
            .entities
            .iter()
            .find(|e| e.kind == EntityKind::Bookmarks)
            .unwrap();
        assert_eq!(bookmarks.pending, 0);
        assert_eq!(bookmarks.synced, 60);
    }

    #[tokio::test]
    async fn test_concurrent_passes_coalesce() {
        let remote = FakeRemote::new();
        remote.hold_for(Duration::from_millis(50));
        let engine = Arc::new(engine_with(remote.clone(), SyncSettings::default()));
        engine
            .store()
            .create_bookmark(&user(), bookmark_at(16))
            .await
            .unwrap();

        let first = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.sync_once().await.unwrap() })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = engine.sync_once().await.unwrap();
        let first = first.await.unwrap();

        assert_eq!(second.outcome, PassOutcome::AlreadyRunning);
        assert_eq!(first.outcome, PassOutcome::Success);
        // Exactly one pass touched the remote.
        assert_eq!(remote.calls().len(), 1);
        assert!(!engine.is_running());
    }

    #[tokio::test]
    async fn test_signed_out_pass_is_skipped() {
        let remote = FakeRemote::new();
        let store = UserStore::open_in_memory().unwrap();
        store
            .create_bookmark(&user(), bookmark_at(16))
            .await
            .unwrap();
        let engine = SyncEngine::new(
            store,
            remote.clone(),
            Arc::new(StaticAuth::signed_out()),
            SyncSettings::default(),
        );

        let report = engine.sync_once().await.unwrap();
        assert_eq!(report.outcome, PassOutcome::NotAuthenticated);
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_metadata_stamped_only_for_clean_kinds() {
        let remote = FakeRemote::new();
        let engine = engine_with(remote.clone(), SyncSettings::default());
        let failing = engine
            .store()
            .create_bookmark(&user(), bookmark_at(1))
            .await
            .unwrap();
        engine
            .store()
            .put_note(
                &user(),
                NewVerseNote {
                    book_id: 1,
                    chapter: 1,
                    verse: 1,
                    content: "ok".to_string(),
                },
            )
            .await
            .unwrap();
        remote.fail_id(&failing.id.as_str());

        engine.sync_once().await.unwrap();
        assert!(engine
            .store()
            .sync_metadata(EntityKind::Bookmarks)
            .await
            .unwrap()
            .is_none());
        assert!(engine
            .store()
            .sync_metadata(EntityKind::Notes)
            .await
            .unwrap()
            .unwrap()
            .last_sync_at
            .is_some());
    }

    /// Remote that edits the row locally while its push is in flight, like a
    /// user typing during a slow request.
    struct EditDuringPush {
        store: UserStore,
        note: Mutex<Option<String>>,
    }

    #[async_trait]
    impl RemoteStore for EditDuringPush {
        async fn upsert(
            &self,
            _access_token: &str,
            _table: &str,
            row: &serde_json::Value,
        ) -> RemoteResult<()> {
            let id = row["id"].as_str().unwrap_or_default().to_string();
            let note = self.note.lock().unwrap().take();
            if let Some(note) = note {
                self.store
                    .update_bookmark(
                        &id,
                        BookmarkPatch {
                            note: Some(note),
                            tags: None,
                        },
                    )
                    .await
                    .unwrap();
            }
            Ok(())
        }

        async fn delete(&self, _access_token: &str, _table: &str, _id: &str) -> RemoteResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_edit_during_push_keeps_row_pending() {
        let store = UserStore::open_in_memory().unwrap();
        let remote = Arc::new(EditDuringPush {
            store: store.clone(),
            note: Mutex::new(Some("typed while pushing".to_string())),
        });
        let engine = SyncEngine::new(
            store,
            remote,
            Arc::new(StaticAuth::signed_in(user(), "test-token")),
            SyncSettings::default(),
        );
        let created = engine
            .store()
            .create_bookmark(&user(), bookmark_at(16))
            .await
            .unwrap();

        engine.sync_once().await.unwrap();

        // The edit that landed mid-push must not be masked by the stale
        // acceptance; the row waits for the next pass.
        let row = engine
            .store()
            .get_bookmark(&created.id.as_str())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.sync_status, SyncStatus::Pending);
        assert_eq!(row.note.as_deref(), Some("typed while pushing"));
    }

    #[tokio::test]
    async fn test_corrupt_row_is_quarantined() {
        let remote = FakeRemote::new();
        let engine = engine_with(remote.clone(), SyncSettings::default());
        let store = engine.store().clone();
        let healthy = store
            .create_bookmark(&user(), bookmark_at(1))
            .await
            .unwrap();
        let corrupt = store
            .create_bookmark(&user(), bookmark_at(2))
            .await
            .unwrap();
        store
            .set_corrupt_tags_for_test(&corrupt.id.as_str())
            .await
            .unwrap();

        let report = engine.sync_once().await.unwrap();
        assert_eq!(report.pushed, 1);
        assert_eq!(report.rows_errored, 1);
        assert_eq!(report.outcome, PassOutcome::PartialFailure);

        let corrupt_row_status: String = store
            .raw_sync_status_for_test("bookmarks_local", &corrupt.id.as_str())
            .await
            .unwrap();
        assert_eq!(corrupt_row_status, "error");
        assert_eq!(
            store
                .get_bookmark(&healthy.id.as_str())
                .await
                .unwrap()
                .unwrap()
                .sync_status,
            SyncStatus::Synced
        );

        // A later pass no longer touches the quarantined row.
        let before = remote.calls().len();
        engine.sync_once().await.unwrap();
        assert_eq!(remote.calls().len(), before);
    }

    #[tokio::test]
    async fn test_full_lifecycle_scenario() {
        let remote = FakeRemote::new();
        let engine = engine_with(remote.clone(), SyncSettings::default());
        let store = engine.store().clone();

        // Created offline: pending row, no queue item.
        let bookmark = store.create_bookmark(&user(), bookmark_at(16)).await.unwrap();
        assert_eq!(bookmark.sync_status, SyncStatus::Pending);
        assert!(store.queue_batch(10).await.unwrap().is_empty());

        // Online pass pushes it.
        engine.sync_once().await.unwrap();
        let row = store
            .get_bookmark(&bookmark.id.as_str())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.sync_status, SyncStatus::Synced);
        assert!(row.last_synced_at.is_some());

        // Deleted offline: row gone, exactly one delete intent queued.
        store.delete_bookmark(&bookmark.id.as_str()).await.unwrap();
        assert!(store
            .get_bookmark(&bookmark.id.as_str())
            .await
            .unwrap()
            .is_none());
        let queued = store.queue_batch(10).await.unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].operation, SyncOperation::Delete);
        assert_eq!(queued[0].entity_id, bookmark.id.as_str());

        // Next pass applies the delete and clears the queue.
        engine.sync_once().await.unwrap();
        assert!(store.queue_batch(10).await.unwrap().is_empty());
        let ops: Vec<&'static str> = remote.calls().iter().map(|c| c.op).collect();
        assert_eq!(ops, vec!["upsert", "delete"]);
    }
}
