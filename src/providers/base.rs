//! Base client trait and common message types for ctutor
//!
//! This module defines the [`ModelClient`] trait that every remote model
//! provider implements, along with the persisted [`Message`] type and the
//! [`Turn`] sent on each call.

use crate::error::Result;
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::pin::Pin;

/// Author of a message in a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person chatting with the tutor
    User,
    /// The tutor model
    Model,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Model => write!(f, "model"),
        }
    }
}

/// A single message of a session transcript
///
/// Messages are immutable once appended, except for the trailing model
/// message while a response streams in, which is replaced wholesale on every
/// chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who wrote the message
    pub role: Role,
    /// Raw message text
    pub content: String,
}

impl Message {
    /// Creates a new user message
    ///
    /// # Examples
    ///
    /// ```
    /// use ctutor::providers::{Message, Role};
    ///
    /// let msg = Message::user("What is a pointer?");
    /// assert_eq!(msg.role, Role::User);
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates a new model message
    ///
    /// # Examples
    ///
    /// ```
    /// use ctutor::providers::{Message, Role};
    ///
    /// let msg = Message::model("A pointer holds an address.");
    /// assert_eq!(msg.role, Role::Model);
    /// ```
    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            content: content.into(),
        }
    }

    /// Empty model message appended before a response starts streaming
    pub fn placeholder() -> Self {
        Self::model(String::new())
    }
}

/// Inline image payload sent alongside a user turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    /// MIME type, e.g. `image/png`
    pub mime_type: String,
    /// Base64-encoded image bytes (no data URI prefix)
    pub data: String,
}

/// New user turn sent through a conversation handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    /// Prompt text
    pub text: String,
    /// Optional image, sent before the text part
    pub image: Option<InlineImage>,
}

impl Turn {
    /// Text-only turn
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
        }
    }

    /// Turn carrying an inline image
    pub fn with_image(text: impl Into<String>, image: InlineImage) -> Self {
        Self {
            text: text.into(),
            image: Some(image),
        }
    }
}

/// Incremental text fragments produced by a streamed call
///
/// Lazy, finite and non-restartable. An `Err` item ends the response.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Client trait for remote model providers
///
/// Implemented by [`crate::providers::GeminiClient`] and
/// [`crate::providers::OllamaClient`]; tests supply scripted fakes.
///
/// # Examples
///
/// ```no_run
/// use ctutor::error::Result;
/// use ctutor::providers::{Message, ModelClient, TextStream, Turn};
/// use async_trait::async_trait;
///
/// struct Echo;
///
/// #[async_trait]
/// impl ModelClient for Echo {
///     async fn stream_chat(
///         &self,
///         _system: Option<&str>,
///         _history: &[Message],
///         turn: &Turn,
///     ) -> Result<TextStream> {
///         let text = turn.text.clone();
///         Ok(Box::pin(futures::stream::iter(vec![Ok(text)])))
///     }
///
///     async fn generate(&self, prompt: &str) -> Result<String> {
///         Ok(prompt.to_string())
///     }
///
///     fn model_name(&self) -> String {
///         "echo".to_string()
///     }
/// }
/// ```
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Start a streamed conversational call
    ///
    /// # Arguments
    ///
    /// * `system` - Optional system instruction for the persona
    /// * `history` - Prior turns used as context
    /// * `turn` - The new user turn
    ///
    /// # Errors
    ///
    /// Returns error if the request cannot be sent or the provider rejects it
    /// before any text is produced. Failures after that surface as `Err`
    /// items on the returned stream.
    async fn stream_chat(
        &self,
        system: Option<&str>,
        history: &[Message],
        turn: &Turn,
    ) -> Result<TextStream>;

    /// One-shot, non-streamed text completion for a single prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Name of the model this client talks to
    fn model_name(&self) -> String;
}
