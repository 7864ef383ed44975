//! Chat application state and the send flow
//!
//! [`ChatApp`] ties the session store, the conversation handle cache, the
//! streaming updater, and the title summarizer together. It is driven from a
//! single task; the title summarizer is the only work running beside it and
//! reports back through a channel drained by [`ChatApp::apply_title_updates`].

use crate::chat::{HandleCache, StreamingUpdater, TitleSummarizer, TitleUpdate};
use crate::config::ChatConfig;
use crate::error::{CtutorError, Result};
use crate::providers::{InlineImage, Message, ModelClient, Turn};
use crate::session::{Session, SessionStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Result of submitting a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input; nothing happened
    Ignored,
    /// The reply streamed in completely
    Completed { session_id: String, reply: String },
    /// The reply failed; the session shows the error message
    Failed { session_id: String, error: String },
}

/// Interactive chat state
pub struct ChatApp {
    store: SessionStore,
    handles: HandleCache,
    titles: Option<TitleSummarizer>,
    title_tx: UnboundedSender<TitleUpdate>,
    title_rx: UnboundedReceiver<TitleUpdate>,
    busy: Arc<AtomicBool>,
}

/// Holds the busy flag for the duration of one submission
struct BusyGuard(Arc<AtomicBool>);

impl BusyGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Result<Self> {
        if flag.swap(true, Ordering::SeqCst) {
            return Err(CtutorError::Busy.into());
        }
        Ok(Self(Arc::clone(flag)))
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ChatApp {
    /// Create the application around a (usually hydrated) store
    ///
    /// Without a model client every submission fails with the error message
    /// and no titles are generated.
    pub fn new(
        store: SessionStore,
        client: Option<Arc<dyn ModelClient>>,
        chat_config: &ChatConfig,
    ) -> Self {
        let (title_tx, title_rx) = mpsc::unbounded_channel();
        let titles = client
            .as_ref()
            .map(|c| TitleSummarizer::new(Arc::clone(c), chat_config.title_excerpt_chars));

        Self {
            store,
            handles: HandleCache::new(client, Some(chat_config.system_instruction().to_string())),
            titles,
            title_tx,
            title_rx,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The session store
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// The active session, if any
    pub fn active_session(&self) -> Option<&Session> {
        self.store.active()
    }

    /// Whether a reply is currently streaming
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Submit a user message and stream the reply into the active session
    ///
    /// A session is created when none is active. `observer` sees the session
    /// after every change to the reply. When the first exchange of a newly
    /// created session completes, a title summary is started in the
    /// background.
    ///
    /// # Errors
    ///
    /// Returns `CtutorError::Busy` while another submission is streaming.
    /// Reply failures are not errors; they yield [`SendOutcome::Failed`].
    pub async fn send_message<F>(
        &mut self,
        text: &str,
        image: Option<InlineImage>,
        observer: F,
    ) -> Result<SendOutcome>
    where
        F: FnMut(&Session),
    {
        if text.trim().is_empty() {
            return Ok(SendOutcome::Ignored);
        }

        let _busy = BusyGuard::acquire(&self.busy)?;

        let (session_id, is_new) = match self.store.active_id() {
            Some(id) => (id.to_string(), false),
            None => (self.store.create_session(), true),
        };

        self.store.append_message(&session_id, Message::user(text))?;
        self.store.persist_or_warn();

        let handle = self.handles.get_or_create(&session_id, &self.store);
        let turn = Turn {
            text: text.to_string(),
            image,
        };

        tracing::info!("Sending message in session {}", session_id);
        let result = StreamingUpdater::new(&mut self.store, session_id.clone(), observer)
            .run(async move { handle?.send_message_stream(&turn).await })
            .await;

        match result {
            Ok(reply) => {
                if is_new {
                    if let Some(titles) = &self.titles {
                        titles.spawn(
                            session_id.clone(),
                            text.to_string(),
                            reply.clone(),
                            self.title_tx.clone(),
                        );
                    }
                }
                Ok(SendOutcome::Completed { session_id, reply })
            }
            Err(e) => Ok(SendOutcome::Failed {
                session_id,
                error: format!("{:#}", e),
            }),
        }
    }

    /// Clear the active session; the next submission starts a new one
    pub fn new_chat(&mut self) {
        self.store.clear_active();
    }

    /// Make `id` the active session
    ///
    /// # Errors
    ///
    /// Returns `CtutorError::SessionNotFound` if no session has this id
    pub fn select_session(&mut self, id: &str) -> Result<()> {
        self.store.set_active(Some(id))?;
        self.store.persist_or_warn();
        Ok(())
    }

    /// Apply every title that has arrived, returning the ones applied
    pub fn apply_title_updates(&mut self) -> Vec<TitleUpdate> {
        let mut applied = Vec::new();
        while let Ok(update) = self.title_rx.try_recv() {
            if self.apply_title(update.clone()) {
                applied.push(update);
            }
        }
        if !applied.is_empty() {
            self.store.persist_or_warn();
        }
        applied
    }

    /// Wait for the next title to arrive and apply it
    pub async fn next_title_update(&mut self) -> Option<TitleUpdate> {
        let update = self.title_rx.recv().await?;
        if self.apply_title(update.clone()) {
            self.store.persist_or_warn();
        }
        Some(update)
    }

    fn apply_title(&mut self, update: TitleUpdate) -> bool {
        match self.store.set_title(&update.session_id, update.title) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Dropping title update: {:#}", e);
                false
            }
        }
    }
}
