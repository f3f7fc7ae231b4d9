//! Session model and the process-local session store.
//!
//! The store mirrors the canonical session held by the core; it is a cache,
//! never an authority. Writers follow a last-writer-wins policy and readers
//! get snapshots, so a stale read is possible and harmless. The bearer token
//! is wrapped in [`SecretString`] and stays out of logs and `Debug` output.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Deserialize;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Account identity attached to a session.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lease half of a session: token and expiry bookkeeping.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionLease {
    pub id: String,
    pub user_id: String,
    pub token: SecretString,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A session as reported by the core. Both halves are required; a payload
/// missing either one does not decode and never reaches the store.
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    pub user: SessionUser,
    pub session: SessionLease,
}

/// Shared handle to the in-process session cache.
///
/// Clones observe the same slot. `Default` starts unauthenticated.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<Option<Session>>>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current session, if any.
    #[must_use]
    pub fn get(&self) -> Option<Session> {
        self.read().clone()
    }

    /// Replace whatever is cached with `session`.
    pub fn set(&self, session: Session) {
        *self.write() = Some(session);
    }

    /// Drop the cached session, returning to the unauthenticated state.
    pub fn clear(&self) {
        *self.write() = None;
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    // A panicked writer cannot leave a half-written `Option`, so a poisoned
    // lock still holds a coherent value and is safe to keep using.
    fn read(&self) -> RwLockReadGuard<'_, Option<Session>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Session>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
