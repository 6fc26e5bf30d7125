//! Bounded in-memory session storage.
//!
//! Each session lives in its own slot: an async run lock held for the whole
//! submission, and a short-lived `RwLock` around the aggregate state so
//! status reads never wait on a provider call.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use implodesc_core::{Aggregate, DomainError, SessionId};

use crate::session::{Session, SessionCommand, SessionEvent};

fn poisoned(what: &str) -> DomainError {
    DomainError::invariant(format!("{what} lock poisoned"))
}

#[derive(Debug)]
pub struct SessionSlot {
    run_lock: Arc<Mutex<()>>,
    state: RwLock<Session>,
}

impl SessionSlot {
    fn new(session: Session) -> Self {
        Self {
            run_lock: Arc::new(Mutex::new(())),
            state: RwLock::new(session),
        }
    }

    /// Wait for exclusive use of the session's analysis run. The guard owns
    /// its lock, so it can move into a detached task.
    pub async fn lock_run(&self) -> OwnedMutexGuard<()> {
        Arc::clone(&self.run_lock).lock_owned().await
    }

    pub fn is_running(&self) -> bool {
        self.run_lock.try_lock().is_err()
    }

    /// Read from the current state without cloning it.
    pub fn read<T>(&self, f: impl FnOnce(&Session) -> T) -> Result<T, DomainError> {
        let session = self.state.read().map_err(|_| poisoned("session"))?;
        Ok(f(&session))
    }

    pub fn snapshot(&self) -> Result<Session, DomainError> {
        self.read(Session::clone)
    }

    /// Run a command against the aggregate; state is untouched on error.
    pub fn execute(&self, command: &SessionCommand) -> Result<Vec<SessionEvent>, DomainError> {
        let mut session = self.state.write().map_err(|_| poisoned("session"))?;
        session.execute(command)
    }
}

#[derive(Debug)]
pub struct SessionStore {
    slots: RwLock<HashMap<SessionId, Arc<SessionSlot>>>,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            max_sessions: max_sessions.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.read().map(|slots| slots.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store a started session. At capacity the oldest idle session is
    /// evicted first; the ids of evicted sessions are returned.
    pub fn insert(&self, session: Session) -> Result<Vec<SessionId>, DomainError> {
        let id = session.session_id();
        let mut slots = self.slots.write().map_err(|_| poisoned("session store"))?;

        let mut evicted = Vec::new();
        if slots.len() >= self.max_sessions {
            match eviction_candidate(&slots) {
                Some(victim) => {
                    slots.remove(&victim);
                    debug!(session_id = %victim, "evicted session at capacity");
                    evicted.push(victim);
                }
                None => warn!(
                    max_sessions = self.max_sessions,
                    "session store full and every session is running, storing anyway"
                ),
            }
        }

        slots.insert(id, Arc::new(SessionSlot::new(session)));
        Ok(evicted)
    }

    pub fn get(&self, id: SessionId) -> Result<Arc<SessionSlot>, DomainError> {
        let slots = self.slots.read().map_err(|_| poisoned("session store"))?;
        slots.get(&id).cloned().ok_or_else(|| DomainError::not_found(id))
    }

    /// Whether `slot` is still the stored slot for `id`.
    pub fn holds(&self, id: SessionId, slot: &Arc<SessionSlot>) -> bool {
        self.slots
            .read()
            .ok()
            .and_then(|slots| slots.get(&id).map(|stored| Arc::ptr_eq(stored, slot)))
            .unwrap_or(false)
    }

    /// Remove idle sessions not updated within `ttl`. Returns their ids.
    pub fn sweep_expired(&self, now: DateTime<Utc>, ttl: Duration) -> Result<Vec<SessionId>, DomainError> {
        let mut slots = self.slots.write().map_err(|_| poisoned("session store"))?;

        let expired: Vec<SessionId> = slots
            .iter()
            .filter(|(_, slot)| !slot.is_running())
            .filter(|(_, slot)| {
                slot.read(|s| (now - s.updated_at()).to_std().is_ok_and(|age| age > ttl))
                    .unwrap_or(false)
            })
            .map(|(id, _)| *id)
            .collect();

        for id in &expired {
            slots.remove(id);
        }
        Ok(expired)
    }
}

/// Oldest idle session, terminal ones before the rest.
fn eviction_candidate(slots: &HashMap<SessionId, Arc<SessionSlot>>) -> Option<SessionId> {
    slots
        .iter()
        .filter(|(_, slot)| !slot.is_running())
        .filter_map(|(id, slot)| {
            slot.read(|s| (!s.status().is_terminal(), s.updated_at(), *id))
                .ok()
        })
        .min()
        .map(|(_, _, id)| id)
}
