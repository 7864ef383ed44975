//! Chat sessions and their persistence
//!
//! A [`Session`] is one conversation thread. The [`SessionStore`] owns every
//! session in memory, tracks which one is active, and writes the whole
//! collection through a [`crate::storage::KeyValueStore`].

pub mod list;
pub mod store;

pub use list::{session_list, SessionListEntry};
pub use store::{SessionStore, ACTIVE_ID_KEY, CHATS_KEY};

use crate::prompts::PLACEHOLDER_TITLE;
use crate::providers::Message;
use serde::{Deserialize, Serialize};

/// One conversation thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Stable identifier, `chat_<unix-millis>`
    pub id: String,
    /// Display label, placeholder until a summary title arrives
    pub title: String,
    /// Transcript in chronological order
    pub messages: Vec<Message>,
}

impl Session {
    /// Create an empty session carrying the placeholder title
    ///
    /// # Examples
    ///
    /// ```
    /// use ctutor::session::Session;
    ///
    /// let session = Session::new("chat_1700000000000");
    /// assert_eq!(session.title, "New Chat");
    /// assert!(session.messages.is_empty());
    /// ```
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: PLACEHOLDER_TITLE.to_string(),
            messages: Vec::new(),
        }
    }

    /// Whether the session still carries the placeholder title
    pub fn has_placeholder_title(&self) -> bool {
        self.title == PLACEHOLDER_TITLE
    }

    /// The most recent message, if any
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// Session id derived from a millisecond timestamp
pub fn session_id_from_millis(millis: i64) -> String {
    format!("chat_{}", millis)
}
