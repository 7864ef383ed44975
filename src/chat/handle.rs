//! Per-session conversation handles

use crate::error::{CtutorError, Result};
use crate::providers::{Message, ModelClient, TextStream, Turn};
use crate::session::SessionStore;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Live conversation with the model for one session
///
/// Seeded once from the session transcript, then extended with every
/// exchange that completes through it. A handle is never persisted; after a
/// restart a new one is rebuilt from the stored messages.
pub struct ChatHandle {
    client: Arc<dyn ModelClient>,
    system_instruction: Option<String>,
    history: Arc<Mutex<Vec<Message>>>,
}

impl std::fmt::Debug for ChatHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatHandle")
            .field("system_instruction", &self.system_instruction)
            .finish_non_exhaustive()
    }
}

impl ChatHandle {
    /// Create a handle carrying `history` as prior context
    pub fn new(
        client: Arc<dyn ModelClient>,
        system_instruction: Option<String>,
        history: Vec<Message>,
    ) -> Self {
        Self {
            client,
            system_instruction,
            history: Arc::new(Mutex::new(history)),
        }
    }

    /// Snapshot of the context the next turn will be sent with
    pub fn history(&self) -> Vec<Message> {
        lock_history(&self.history).clone()
    }

    /// Send a user turn and stream the reply
    ///
    /// The turn and the full reply are added to this handle's history once
    /// the stream finishes without error. A failed or abandoned stream leaves
    /// the history untouched.
    ///
    /// # Errors
    ///
    /// Returns error if the remote call cannot be started
    pub async fn send_message_stream(&self, turn: &Turn) -> Result<TextStream> {
        let history = self.history();
        let inner = self
            .client
            .stream_chat(self.system_instruction.as_deref(), &history, turn)
            .await?;

        let state = RecordState {
            inner,
            reply: String::new(),
            user_text: turn.text.clone(),
            history: Arc::clone(&self.history),
            finished: false,
        };

        let recorded = stream::unfold(state, |mut state| async move {
            if state.finished {
                return None;
            }

            match state.inner.next().await {
                Some(Ok(chunk)) => {
                    state.reply.push_str(&chunk);
                    Some((Ok(chunk), state))
                }
                Some(Err(e)) => {
                    state.finished = true;
                    Some((Err(e), state))
                }
                None => {
                    let mut history = lock_history(&state.history);
                    history.push(Message::user(std::mem::take(&mut state.user_text)));
                    history.push(Message::model(std::mem::take(&mut state.reply)));
                    None
                }
            }
        });

        Ok(Box::pin(recorded))
    }
}

struct RecordState {
    inner: TextStream,
    reply: String,
    user_text: String,
    history: Arc<Mutex<Vec<Message>>>,
    finished: bool,
}

fn lock_history(history: &Mutex<Vec<Message>>) -> std::sync::MutexGuard<'_, Vec<Message>> {
    history.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One conversation handle per session id, created on first use
pub struct HandleCache {
    client: Option<Arc<dyn ModelClient>>,
    system_instruction: Option<String>,
    handles: HashMap<String, Arc<ChatHandle>>,
}

impl HandleCache {
    /// Create a cache handing out handles backed by `client`
    ///
    /// With no client every lookup of an uncached session fails with
    /// `CtutorError::NotInitialized`.
    pub fn new(client: Option<Arc<dyn ModelClient>>, system_instruction: Option<String>) -> Self {
        Self {
            client,
            system_instruction,
            handles: HashMap::new(),
        }
    }

    /// Return the handle for `id`, creating it on first request
    ///
    /// A new handle is seeded with every message of the session except the
    /// most recent, which is the turn about to be sent. Later calls return
    /// the same handle without re-seeding.
    ///
    /// # Errors
    ///
    /// Returns `CtutorError::NotInitialized` without a model client, or
    /// `CtutorError::SessionNotFound` if the store has no such session
    pub fn get_or_create(&mut self, id: &str, store: &SessionStore) -> Result<Arc<ChatHandle>> {
        if let Some(handle) = self.handles.get(id) {
            return Ok(Arc::clone(handle));
        }

        let client = self.client.as_ref().ok_or(CtutorError::NotInitialized)?;
        let session = store
            .get(id)
            .ok_or_else(|| CtutorError::SessionNotFound(id.to_string()))?;

        let seed_len = session.messages.len().saturating_sub(1);
        let seed = session.messages[..seed_len].to_vec();
        tracing::debug!("Creating conversation handle for {} with {} seed messages", id, seed.len());

        let handle = Arc::new(ChatHandle::new(
            Arc::clone(client),
            self.system_instruction.clone(),
            seed,
        ));
        self.handles.insert(id.to_string(), Arc::clone(&handle));
        Ok(handle)
    }

    /// Whether a handle exists for `id`
    pub fn contains(&self, id: &str) -> bool {
        self.handles.contains_key(id)
    }

    /// Number of live handles
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether no handles have been created
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
