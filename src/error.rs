//! Error types for ctutor
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for ctutor operations
///
/// Covers configuration loading, model provider calls, session store
/// preconditions, durable storage, and image attachments.
#[derive(Error, Debug)]
pub enum CtutorError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider-related errors (API calls, malformed responses, etc.)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Missing credentials for provider
    #[error("Missing credentials for provider: {0}")]
    MissingCredentials(String),

    /// The model client has not been set up for this process
    #[error("Model client not initialized")]
    NotInitialized,

    /// No session exists with the given id
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// A trailing message was replaced on a session with no messages
    #[error("Session {0} has no messages to replace")]
    EmptyConversation(String),

    /// A submission arrived while a response was still streaming
    #[error("A response is already streaming; wait for it to finish")]
    Busy,

    /// Durable storage errors (database operations)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Image attachment errors (size, format)
    #[error("Image error: {0}")]
    Image(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for ctutor operations
///
/// Uses `anyhow::Error` so callers can attach context while still being able
/// to downcast to [`CtutorError`] where the variant matters.
pub type Result<T> = anyhow::Result<T>;
