//! Authentication state
//!
//! The sync engine never caches identity: every pass asks the provider for
//! the current session so a sign-out between passes takes effect immediately.

use crate::models::UserId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use tokio::sync::RwLock;

/// Sessions expiring within this window are treated as already expired, so a
/// push doesn't start with a token about to lapse mid-flight.
const EXPIRY_SKEW_SECS: i64 = 60;

/// The signed-in principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: UserId,
    pub email: Option<String>,
}

/// A bearer session for the remote backend.
#[derive(Clone)]
pub struct AuthSession {
    pub user: AuthUser,
    pub access_token: String,
    /// `None` for tokens that don't expire (service keys, test sessions).
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthSession {
    /// Whether the session is still usable, allowing for clock skew.
    #[must_use]
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expires_at| {
            expires_at - chrono::Duration::seconds(EXPIRY_SKEW_SECS) > now
        })
    }
}

// Tokens must not leak into logs.
impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("user", &self.user)
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Source of the current session, checked fresh on every sync pass.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The current valid session, or `None` when signed out or expired.
    async fn session(&self) -> Option<AuthSession>;
}

/// In-process session holder fed by the host's sign-in flow.
#[derive(Debug, Default)]
pub struct SessionAuth {
    inner: RwLock<Option<AuthSession>>,
}

impl SessionAuth {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a session after sign-in.
    pub async fn sign_in(&self, session: AuthSession) {
        *self.inner.write().await = Some(session);
    }

    /// Drop the session. Local data stays; only syncing stops.
    pub async fn sign_out(&self) {
        *self.inner.write().await = None;
    }
}

#[async_trait]
impl AuthProvider for SessionAuth {
    async fn session(&self) -> Option<AuthSession> {
        let guard = self.inner.read().await;
        guard
            .as_ref()
            .filter(|session| session.is_valid(crate::util::now()))
            .cloned()
    }
}

/// Fixed-identity provider for the CLI and tests.
#[derive(Debug)]
pub struct StaticAuth {
    session: Option<AuthSession>,
}

impl StaticAuth {
    /// A provider that is always signed in as `user_id`.
    #[must_use]
    pub fn signed_in(user_id: UserId, access_token: impl Into<String>) -> Self {
        Self {
            session: Some(AuthSession {
                user: AuthUser {
                    id: user_id,
                    email: None,
                },
                access_token: access_token.into(),
                expires_at: None,
            }),
        }
    }

    /// A provider that is never signed in.
    #[must_use]
    pub const fn signed_out() -> Self {
        Self { session: None }
    }
}

#[async_trait]
impl AuthProvider for StaticAuth {
    async fn session(&self) -> Option<AuthSession> {
        self.session.clone()
    }
}
