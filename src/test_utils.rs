//! Test utilities for ctutor
//!
//! This module provides common test utilities including temporary directory
//! management, test file creation, assertion helpers, and a scripted model
//! client.

use crate::config::Config;
use crate::error::{CtutorError, Result};
use crate::providers::{Message, ModelClient, TextStream, Turn};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::TempDir;

/// Create a temporary directory for testing
///
/// # Returns
///
/// Returns a TempDir that will be cleaned up when dropped
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Create a test file with the given bytes
///
/// # Panics
///
/// Panics if file creation or writing fails
pub fn create_test_file(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Assert that an error contains the expected message
///
/// # Panics
///
/// Panics if the result is Ok or if the error doesn't contain the expected message
pub fn assert_error_contains<T>(result: Result<T>, expected: &str) {
    match result {
        Ok(_) => panic!("Expected error containing '{}' but got Ok", expected),
        Err(e) => {
            let error_msg = format!("{:#}", e);
            assert!(
                error_msg.contains(expected),
                "Error message '{}' does not contain '{}'",
                error_msg,
                expected
            );
        }
    }
}

/// Create a test configuration with default values
pub fn test_config() -> Config {
    Config::default()
}

/// One scripted reply to `stream_chat`
enum Script {
    Chunks(Vec<String>),
    FailAfter(Vec<String>, String),
    FailStart(String),
}

/// Arguments of one recorded `stream_chat` call
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system: Option<String>,
    pub history: Vec<Message>,
    pub turn: Turn,
}

/// Model client replaying scripted replies in order
///
/// Every `stream_chat` call consumes the next script and is recorded.
/// `generate` returns the configured title, or fails when none is set.
pub struct ScriptedClient {
    scripts: Mutex<VecDeque<Script>>,
    title: Option<String>,
    calls: Mutex<Vec<RecordedCall>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    /// Client answering each call with the next list of chunks
    pub fn new(replies: Vec<Vec<&str>>) -> Self {
        Self::from_scripts(
            replies
                .into_iter()
                .map(|chunks| Script::Chunks(to_strings(chunks)))
                .collect(),
        )
    }

    /// Client whose single reply yields `chunks` and then fails
    pub fn failing_after(chunks: Vec<&str>, message: &str) -> Self {
        Self::from_scripts(vec![Script::FailAfter(to_strings(chunks), message.to_string())])
    }

    /// Client whose single call fails before any chunk
    pub fn failing_start(message: &str) -> Self {
        Self::from_scripts(vec![Script::FailStart(message.to_string())])
    }

    /// Set the reply to title requests
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    fn from_scripts(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            title: None,
            calls: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Number of `stream_chat` calls so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Arguments of every `stream_chat` call
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// History sent with the latest call
    pub fn last_history(&self) -> Vec<Message> {
        self.calls
            .lock()
            .unwrap()
            .last()
            .map(|c| c.history.clone())
            .unwrap_or_default()
    }

    /// System instruction sent with the latest call
    pub fn last_system(&self) -> Option<String> {
        self.calls.lock().unwrap().last().and_then(|c| c.system.clone())
    }

    /// Prompts passed to `generate`
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

fn to_strings(chunks: Vec<&str>) -> Vec<String> {
    chunks.into_iter().map(String::from).collect()
}

#[async_trait]
impl ModelClient for ScriptedClient {
    async fn stream_chat(
        &self,
        system: Option<&str>,
        history: &[Message],
        turn: &Turn,
    ) -> Result<TextStream> {
        self.calls.lock().unwrap().push(RecordedCall {
            system: system.map(String::from),
            history: history.to_vec(),
            turn: turn.clone(),
        });

        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| CtutorError::Provider("no scripted reply left".to_string()))?;

        let items: Vec<Result<String>> = match script {
            Script::Chunks(chunks) => chunks.into_iter().map(Ok).collect(),
            Script::FailAfter(chunks, message) => chunks
                .into_iter()
                .map(Ok)
                .chain(std::iter::once(Err(CtutorError::Provider(message).into())))
                .collect(),
            Script::FailStart(message) => return Err(CtutorError::Provider(message).into()),
        };

        Ok(Box::pin(futures::stream::iter(items)))
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.title
            .clone()
            .ok_or_else(|| CtutorError::Provider("no scripted title".to_string()).into())
    }

    fn model_name(&self) -> String {
        "scripted".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn test_temp_dir_creation() {
        let dir = temp_dir();
        assert!(dir.path().exists());
    }

    #[test]
    fn test_create_test_file() {
        let dir = temp_dir();
        let path = create_test_file(&dir, "test.txt", b"content");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "content");
    }

    #[test]
    fn test_assert_error_contains_success() {
        let result: Result<()> = Err(CtutorError::Config("test error message".to_string()).into());
        assert_error_contains(result, "test error");
    }

    #[test]
    #[should_panic(expected = "Expected error containing")]
    fn test_assert_error_contains_ok() {
        assert_error_contains(Ok(()), "error");
    }

    #[test]
    fn test_test_config() {
        assert!(test_config().validate().is_ok());
    }

    #[tokio::test]
    async fn test_scripted_client_replays_in_order() {
        let client = ScriptedClient::new(vec![vec!["a", "b"], vec!["c"]]);
        let first: Vec<String> = client
            .stream_chat(None, &[], &Turn::text("1"))
            .await
            .unwrap()
            .map(|c| c.unwrap())
            .collect()
            .await;
        assert_eq!(first, vec!["a", "b"]);
        assert_eq!(client.call_count(), 1);
        assert!(client.generate("title").await.is_err());
    }
}
