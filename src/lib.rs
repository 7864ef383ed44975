//! ctutor - C programming tutor chat library
//!
//! This library provides the core functionality for ctutor, a terminal chat
//! client for an AI tutor specialized in the C language. Conversations are
//! kept as separate sessions, persisted locally, and restored on startup.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `session`: Session records, the session store, and the session list view
//! - `storage`: Durable key-value storage (SQLite, in-memory)
//! - `chat`: Conversation handles, reply streaming, and title summaries
//! - `app`: The send flow tying sessions and the model together
//! - `providers`: Remote model clients (Gemini, Ollama)
//! - `render`: Splitting replies into code blocks and prose for display
//! - `attachment`: Image attachments for user turns
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use ctutor::app::ChatApp;
//! use ctutor::providers::create_client;
//! use ctutor::session::SessionStore;
//! use ctutor::storage::SqliteStore;
//! use ctutor::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let store = SessionStore::open(Box::new(SqliteStore::new()?));
//!     let client = create_client(&config.provider, None)?;
//!     let mut app = ChatApp::new(store, Some(client), &config.chat);
//!     app.send_message("Explain how pointers work", None, |_| {}).await?;
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod attachment;
pub mod chat;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod prompts;
pub mod providers;
pub mod render;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use app::{ChatApp, SendOutcome};
pub use config::Config;
pub use error::{CtutorError, Result};
pub use session::{Session, SessionStore};

#[cfg(test)]
pub mod test_utils;
