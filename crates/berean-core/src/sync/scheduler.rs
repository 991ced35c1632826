//! Periodic and background-task scheduling
//!
//! Hosts hand the engine to a [`BackgroundScheduler`] implementation; the
//! scheduler only decides *when* to trigger, while the engine's running flag
//! decides whether a trigger actually performs work. A scheduler tick that
//! lands during a manual sync simply coalesces into that pass.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error};

use super::SyncEngine;

/// Errors surfaced when registering or removing scheduled tasks.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Task '{0}' is already registered")]
    AlreadyRegistered(String),
    #[error("Task '{0}' is not registered")]
    NotRegistered(String),
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),
}

/// Capability interface for host-driven periodic sync.
///
/// `min_interval` is a floor, not a promise: platform schedulers may run the
/// task less often under power policy, never more often.
pub trait BackgroundScheduler: Send + Sync {
    /// Register a named periodic task that triggers sync passes.
    fn register(
        &self,
        task_id: &str,
        min_interval: Duration,
        engine: Arc<SyncEngine>,
    ) -> Result<(), SchedulerError>;

    /// Stop and remove a previously registered task.
    fn unregister(&self, task_id: &str) -> Result<(), SchedulerError>;
}

/// Handle to one spawned periodic loop.
#[derive(Debug)]
pub struct PeriodicSyncHandle {
    handle: JoinHandle<()>,
}

impl PeriodicSyncHandle {
    /// Stop the loop. An in-flight pass runs to completion on the runtime;
    /// only future ticks are cancelled.
    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for PeriodicSyncHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// In-process scheduler backed by tokio timers.
///
/// Covers both the recurring foreground timer and, on hosts without an OS
/// task scheduler (desktop, CLI daemon mode), the background hook.
#[derive(Default)]
pub struct TokioScheduler {
    tasks: Mutex<HashMap<String, PeriodicSyncHandle>>,
}

impl TokioScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl BackgroundScheduler for TokioScheduler {
    fn register(
        &self,
        task_id: &str,
        min_interval: Duration,
        engine: Arc<SyncEngine>,
    ) -> Result<(), SchedulerError> {
        if min_interval.is_zero() {
            return Err(SchedulerError::InvalidSchedule(
                "interval must be positive".to_string(),
            ));
        }
        let mut tasks = self
            .tasks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if tasks.contains_key(task_id) {
            return Err(SchedulerError::AlreadyRegistered(task_id.to_string()));
        }

        let name = task_id.to_string();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(min_interval);
            // A late tick must not trigger a burst of catch-up passes.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick fires immediately; the schedule starts one
            // interval out.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                debug!(task = %name, "scheduled sync tick");
                match engine.sync_once().await {
                    Ok(report) => debug!(task = %name, outcome = ?report.outcome, "scheduled sync done"),
                    Err(err) => error!(task = %name, error = %err, "scheduled sync pass failed"),
                }
            }
        });

        tasks.insert(task_id.to_string(), PeriodicSyncHandle { handle });
        Ok(())
    }

    fn unregister(&self, task_id: &str) -> Result<(), SchedulerError> {
        let mut tasks = self
            .tasks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        tasks
            .remove(task_id)
            .map(|handle| handle.stop())
            .ok_or_else(|| SchedulerError::NotRegistered(task_id.to_string()))
    }
}
