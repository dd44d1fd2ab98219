//! In-memory session store.
//!
//! Each upload becomes a session holding its [`Workbook`]. The store is
//! bounded: inserting beyond capacity evicts the oldest session, and sessions
//! idle for longer than the configured TTL are dropped on the next insert (or
//! an explicit [`SessionStore::evict_expired`]).
//!
//! # Thread Safety
//!
//! The store and every session sit behind `parking_lot::RwLock`. Analyses take
//! a read lock on the session; sheet switches take the write lock, so a
//! session has at most one writer at a time.

use crate::config::SessionConfig;
use crate::error::{InsightError, Result};
use crate::loader::Workbook;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Opaque session identifier.
pub type SessionId = String;

/// One uploaded file and its sheets.
#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub filename: String,
    pub workbook: Workbook,
    pub created_at: DateTime<Utc>,
}

/// Shared handle to a live session.
///
/// Cloning the handle is cheap; the session stays alive while any handle
/// exists, even after it is evicted from the store.
#[derive(Debug, Clone)]
pub struct SessionHandle(Arc<RwLock<Session>>);

impl SessionHandle {
    pub fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.0.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.0.write()
    }
}

/// Listing entry for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub filename: String,
    pub sheet_names: Vec<String>,
    pub active_sheet: String,
    /// RFC 3339 timestamp.
    pub created_at: String,
}

struct Entry {
    handle: SessionHandle,
    last_access: Instant,
}

/// Bounded, expiring map of sessions.
pub struct SessionStore {
    config: SessionConfig,
    sessions: RwLock<IndexMap<SessionId, Entry>>,
    sequence: AtomicU64,
}

impl SessionStore {
    /// Create a store with a validated configuration.
    pub fn new(config: SessionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            sessions: RwLock::new(IndexMap::new()),
            sequence: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Store a workbook as a new session and return its id.
    pub fn insert(&self, filename: impl Into<String>, workbook: Workbook) -> SessionId {
        let id = self.generate_id();
        let session = Session {
            id: id.clone(),
            filename: filename.into(),
            workbook,
            created_at: Utc::now(),
        };

        let mut sessions = self.sessions.write();
        self.evict_expired_locked(&mut sessions, Instant::now());

        while sessions.len() >= self.config.capacity {
            if let Some((evicted, _)) = sessions.shift_remove_index(0) {
                info!("Session capacity reached, evicted oldest session {}", evicted);
            }
        }

        sessions.insert(
            id.clone(),
            Entry {
                handle: SessionHandle(Arc::new(RwLock::new(session))),
                last_access: Instant::now(),
            },
        );
        debug!("Created session {} ({} live)", id, sessions.len());
        id
    }

    /// Look up a session and mark it as recently used.
    pub fn get(&self, id: &str) -> Result<SessionHandle> {
        let mut sessions = self.sessions.write();
        let entry = sessions
            .get_mut(id)
            .ok_or_else(|| InsightError::SessionNotFound(id.to_string()))?;
        entry.last_access = Instant::now();
        Ok(entry.handle.clone())
    }

    /// Remove a session. Returns whether it existed.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.write().shift_remove(id).is_some();
        if removed {
            debug!("Removed session {}", id);
        }
        removed
    }

    /// Remove every session. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut sessions = self.sessions.write();
        let count = sessions.len();
        sessions.clear();
        info!("Cleared {} sessions", count);
        count
    }

    /// Summaries of all live sessions, newest first.
    pub fn list(&self) -> Vec<SessionSummary> {
        self.sessions
            .read()
            .values()
            .rev()
            .map(|entry| {
                let session = entry.handle.read();
                SessionSummary {
                    id: session.id.clone(),
                    filename: session.filename.clone(),
                    sheet_names: session.workbook.sheet_names(),
                    active_sheet: session.workbook.active_name().to_string(),
                    created_at: session.created_at.to_rfc3339(),
                }
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Drop sessions idle for longer than the TTL. Returns how many were dropped.
    pub fn evict_expired(&self) -> usize {
        let mut sessions = self.sessions.write();
        self.evict_expired_locked(&mut sessions, Instant::now())
    }

    fn evict_expired_locked(&self, sessions: &mut IndexMap<SessionId, Entry>, now: Instant) -> usize {
        let Some(ttl) = self.config.ttl_secs.map(Duration::from_secs) else {
            return 0;
        };

        let before = sessions.len();
        sessions.retain(|_, entry| now.saturating_duration_since(entry.last_access) < ttl);
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!("Evicted {} expired sessions", evicted);
        }
        evicted
    }

    fn generate_id(&self) -> SessionId {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!("session_{}_{}", timestamp, seq)
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self {
            config: SessionConfig::default(),
            sessions: RwLock::new(IndexMap::new()),
            sequence: AtomicU64::new(0),
        }
    }
}
