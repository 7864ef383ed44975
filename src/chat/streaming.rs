//! Streams a model reply into a session, one chunk at a time

use crate::error::Result;
use crate::providers::{Message, TextStream};
use crate::session::{Session, SessionStore};
use futures::StreamExt;
use std::future::Future;

/// Text shown in place of a reply that could not be fetched
pub const ERROR_MESSAGE: &str = "An error occurred while fetching the response. Please try again.";

/// Writes a growing model reply into the trailing message of a session
///
/// Every chunk replaces the trailing message, persists the store, and
/// notifies the observer with the updated session, in arrival order.
pub struct StreamingUpdater<'a, F>
where
    F: FnMut(&Session),
{
    store: &'a mut SessionStore,
    session_id: String,
    observer: F,
}

impl<'a, F> StreamingUpdater<'a, F>
where
    F: FnMut(&Session),
{
    /// Prepare to stream into `session_id`
    pub fn new(store: &'a mut SessionStore, session_id: impl Into<String>, observer: F) -> Self {
        Self {
            store,
            session_id: session_id.into(),
            observer,
        }
    }

    /// Append a placeholder, await the reply stream, and stream it in
    ///
    /// `reply` is awaited only after the placeholder is in place, so a
    /// failure to start the call is reported the same way as a failure
    /// mid-stream: the trailing message becomes [`ERROR_MESSAGE`] and the
    /// error is returned. Earlier messages are never touched.
    ///
    /// # Errors
    ///
    /// Returns the error that ended the reply, or a store error if the
    /// session does not exist
    pub async fn run<Fut>(mut self, reply: Fut) -> Result<String>
    where
        Fut: Future<Output = Result<TextStream>>,
    {
        self.store
            .append_message(&self.session_id, Message::placeholder())?;
        self.publish();

        match self.consume(reply).await {
            Ok(text) => {
                tracing::debug!(
                    "Reply for {} complete ({} chars)",
                    self.session_id,
                    text.chars().count()
                );
                Ok(text)
            }
            Err(e) => {
                tracing::error!("Reply for {} failed: {:#}", self.session_id, e);
                self.store
                    .replace_trailing_message(&self.session_id, Message::model(ERROR_MESSAGE))?;
                self.publish();
                Err(e)
            }
        }
    }

    async fn consume<Fut>(&mut self, reply: Fut) -> Result<String>
    where
        Fut: Future<Output = Result<TextStream>>,
    {
        let mut stream = reply.await?;
        let mut text = String::new();

        while let Some(chunk) = stream.next().await {
            text.push_str(&chunk?);
            self.store
                .replace_trailing_message(&self.session_id, Message::model(text.clone()))?;
            self.publish();
        }

        Ok(text)
    }

    fn publish(&mut self) {
        self.store.persist_or_warn();
        if let Some(session) = self.store.get(&self.session_id) {
            (self.observer)(session);
        }
    }
}
