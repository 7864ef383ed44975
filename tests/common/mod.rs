use async_trait::async_trait;
use ctutor::error::{CtutorError, Result};
use ctutor::providers::{Message, ModelClient, TextStream, Turn};
use ctutor::storage::SqliteStore;
use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::TempDir;

#[allow(dead_code)]
pub fn create_temp_store() -> (SqliteStore, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let db_path = tmp.path().join("store.db");
    let store = SqliteStore::new_with_path(db_path).expect("failed to create sqlite store with path");
    (store, tmp)
}

#[allow(dead_code)]
pub fn reopen_store(tmp: &TempDir) -> SqliteStore {
    SqliteStore::new_with_path(tmp.path().join("store.db")).expect("failed to reopen sqlite store")
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Model client answering each streamed call with the next scripted reply.
///
/// A reply of `None` fails the call after nothing is streamed.
#[allow(dead_code)]
pub struct MockClient {
    replies: Mutex<VecDeque<Option<Vec<String>>>>,
    title: Option<String>,
    histories: Mutex<Vec<Vec<Message>>>,
}

#[allow(dead_code)]
impl MockClient {
    pub fn new(replies: Vec<Option<Vec<&str>>>) -> Self {
        Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|r| r.map(|chunks| chunks.into_iter().map(String::from).collect()))
                    .collect(),
            ),
            title: None,
            histories: Mutex::new(Vec::new()),
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    /// History sent with each streamed call, in call order
    pub fn histories(&self) -> Vec<Vec<Message>> {
        self.histories.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for MockClient {
    async fn stream_chat(
        &self,
        _system: Option<&str>,
        history: &[Message],
        _turn: &Turn,
    ) -> Result<TextStream> {
        self.histories.lock().unwrap().push(history.to_vec());
        let reply = self.replies.lock().unwrap().pop_front().flatten();
        match reply {
            Some(chunks) => Ok(Box::pin(futures::stream::iter(
                chunks.into_iter().map(Ok).collect::<Vec<Result<String>>>(),
            ))),
            None => Err(CtutorError::Provider("service unavailable".to_string()).into()),
        }
    }

    async fn generate(&self, _prompt: &str) -> Result<String> {
        self.title
            .clone()
            .ok_or_else(|| CtutorError::Provider("no title".to_string()).into())
    }

    fn model_name(&self) -> String {
        "mock".to_string()
    }
}
