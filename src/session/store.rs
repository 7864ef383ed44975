//! In-memory session collection backed by durable key-value storage

use super::{session_id_from_millis, Session};
use crate::error::{CtutorError, Result};
use crate::providers::Message;
use crate::storage::KeyValueStore;
use std::collections::HashMap;

/// Storage key holding the serialized session mapping
pub const CHATS_KEY: &str = "c-tutor-chats";

/// Storage key holding the active session id
pub const ACTIVE_ID_KEY: &str = "c-tutor-active-id";

/// Single source of truth for all sessions and the active session id
///
/// Mutations happen in place; [`SessionStore::persist`] writes the full
/// mapping back to the backend after every change that should survive a
/// restart.
pub struct SessionStore {
    sessions: HashMap<String, Session>,
    active_id: Option<String>,
    backend: Box<dyn KeyValueStore>,
}

impl SessionStore {
    /// Create an empty store writing to `backend`
    ///
    /// Nothing is read from the backend; call [`SessionStore::hydrate`] for
    /// that, or use [`SessionStore::open`].
    pub fn new(backend: Box<dyn KeyValueStore>) -> Self {
        Self {
            sessions: HashMap::new(),
            active_id: None,
            backend,
        }
    }

    /// Create a store and restore any previously persisted state
    ///
    /// # Examples
    ///
    /// ```
    /// use ctutor::session::SessionStore;
    /// use ctutor::storage::MemoryStore;
    ///
    /// let store = SessionStore::open(Box::new(MemoryStore::new()));
    /// assert!(store.is_empty());
    /// assert!(store.active_id().is_none());
    /// ```
    pub fn open(backend: Box<dyn KeyValueStore>) -> Self {
        let mut store = Self::new(backend);
        store.hydrate();
        store
    }

    /// Create a session keyed by the current wall-clock time and make it active
    pub fn create_session(&mut self) -> String {
        self.create_session_at(chrono::Utc::now().timestamp_millis())
    }

    /// Create a session keyed by `millis` and make it active
    ///
    /// A second creation within the same millisecond resolves to the session
    /// that already holds that id; its contents are left alone.
    pub fn create_session_at(&mut self, millis: i64) -> String {
        let id = session_id_from_millis(millis);

        if self.sessions.contains_key(&id) {
            tracing::debug!("Session {} already exists, reusing it", id);
        } else {
            tracing::info!("Created session {}", id);
            self.sessions.insert(id.clone(), Session::new(id.clone()));
        }

        self.active_id = Some(id.clone());
        id
    }

    /// Append a message to a session
    ///
    /// Role alternation is not checked.
    ///
    /// # Errors
    ///
    /// Returns `CtutorError::SessionNotFound` if no session has this id
    pub fn append_message(&mut self, id: &str, message: Message) -> Result<()> {
        self.session_mut(id)?.messages.push(message);
        Ok(())
    }

    /// Replace the last message of a session
    ///
    /// # Errors
    ///
    /// Returns `CtutorError::SessionNotFound` if no session has this id, or
    /// `CtutorError::EmptyConversation` if the session has no messages
    pub fn replace_trailing_message(&mut self, id: &str, message: Message) -> Result<()> {
        let session = self.session_mut(id)?;
        match session.messages.last_mut() {
            Some(last) => {
                *last = message;
                Ok(())
            }
            None => Err(CtutorError::EmptyConversation(id.to_string()).into()),
        }
    }

    /// Overwrite a session's title
    ///
    /// # Errors
    ///
    /// Returns `CtutorError::SessionNotFound` if no session has this id
    pub fn set_title(&mut self, id: &str, title: impl Into<String>) -> Result<()> {
        self.session_mut(id)?.title = title.into();
        Ok(())
    }

    /// Select the active session, or clear the selection with `None`
    ///
    /// # Errors
    ///
    /// Returns `CtutorError::SessionNotFound` if `id` names no session
    pub fn set_active(&mut self, id: Option<&str>) -> Result<()> {
        match id {
            Some(id) if !self.sessions.contains_key(id) => {
                Err(CtutorError::SessionNotFound(id.to_string()).into())
            }
            Some(id) => {
                self.active_id = Some(id.to_string());
                Ok(())
            }
            None => {
                self.clear_active();
                Ok(())
            }
        }
    }

    /// Leave no session active
    pub fn clear_active(&mut self) {
        self.active_id = None;
    }

    /// Currently active session id
    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    /// Currently active session
    pub fn active(&self) -> Option<&Session> {
        self.active_id.as_deref().and_then(|id| self.sessions.get(id))
    }

    /// Look up a session by id
    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.get(id)
    }

    /// Iterate over all sessions in no particular order
    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    /// Number of sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether there are no sessions
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Write the session mapping and active id to the backend
    ///
    /// The mapping is written only when it has at least one session and the
    /// active id only when one is selected, so previously stored values are
    /// kept in those cases. In-memory state is never rolled back.
    ///
    /// # Errors
    ///
    /// Returns error if serialization or the backend write fails
    pub fn persist(&mut self) -> Result<()> {
        if !self.sessions.is_empty() {
            let json = serde_json::to_string(&self.sessions)?;
            self.backend.set(CHATS_KEY, &json)?;
        }

        if let Some(id) = &self.active_id {
            self.backend.set(ACTIVE_ID_KEY, id)?;
        }

        Ok(())
    }

    /// Persist, logging instead of returning any failure
    pub fn persist_or_warn(&mut self) {
        if let Err(e) = self.persist() {
            tracing::warn!("Failed to persist sessions: {:#}", e);
        }
    }

    /// Replace in-memory state with what the backend holds
    ///
    /// A missing or malformed mapping yields an empty collection. A mapping
    /// whose key differs from the id of the session it holds counts as
    /// malformed. A stored active id is restored only if it names a restored
    /// session.
    pub fn hydrate(&mut self) {
        self.sessions = match self.backend.get(CHATS_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<HashMap<String, Session>>(&raw) {
                Ok(sessions) => match sessions.iter().find(|(key, session)| **key != session.id) {
                    Some((key, session)) => {
                        tracing::warn!(
                            "Stored session {} is keyed as {}, starting empty",
                            session.id,
                            key
                        );
                        HashMap::new()
                    }
                    None => sessions,
                },
                Err(e) => {
                    tracing::warn!("Stored sessions are malformed, starting empty: {}", e);
                    HashMap::new()
                }
            },
            Ok(None) => HashMap::new(),
            Err(e) => {
                tracing::warn!("Failed to read stored sessions, starting empty: {:#}", e);
                HashMap::new()
            }
        };

        self.active_id = match self.backend.get(ACTIVE_ID_KEY) {
            Ok(Some(id)) if self.sessions.contains_key(&id) => Some(id),
            Ok(Some(id)) => {
                tracing::debug!("Stored active session {} no longer exists", id);
                None
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Failed to read active session id: {:#}", e);
                None
            }
        };

        tracing::info!("Restored {} session(s)", self.sessions.len());
    }

    fn session_mut(&mut self, id: &str) -> Result<&mut Session> {
        self.sessions
            .get_mut(id)
            .ok_or_else(|| CtutorError::SessionNotFound(id.to_string()).into())
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("sessions", &self.sessions.len())
            .field("active_id", &self.active_id)
            .finish()
    }
}
