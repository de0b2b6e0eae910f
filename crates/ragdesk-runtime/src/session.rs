//! Sessions: one conversation per client, processed one query at a time.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard};
use tracing::info;

use crate::conversation::ConversationState;

#[derive(Debug)]
pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
    pub conversation: ConversationState,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            conversation: ConversationState::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Cloneable handle to a session. Locking serialises queries per session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: Arc<str>,
    inner: Arc<Mutex<Session>>,
}

impl SessionHandle {
    pub fn new(session: Session) -> Self {
        Self {
            id: Arc::from(session.id()),
            inner: Arc::new(Mutex::new(session)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn lock(&self) -> MutexGuard<'_, Session> {
        self.inner.lock().await
    }

    /// A guard that can be moved into a stream.
    pub async fn lock_owned(&self) -> OwnedMutexGuard<Session> {
        self.inner.clone().lock_owned().await
    }
}

/// All live sessions, keyed by id.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_session(&self) -> SessionHandle {
        let id = uuid::Uuid::new_v4().to_string();
        let handle = SessionHandle::new(Session::new(id.clone()));
        self.sessions.write().insert(id.clone(), handle.clone());
        info!("Created session {}", id);
        handle
    }

    pub fn get(&self, id: &str) -> Option<SessionHandle> {
        self.sessions.read().get(id).cloned()
    }

    /// Returns whether the session existed. Outstanding handles stay usable.
    pub fn destroy_session(&self, id: &str) -> bool {
        let removed = self.sessions.write().remove(id).is_some();
        if removed {
            info!("Destroyed session {}", id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
