//! Background session title summaries

use crate::prompts::build_title_prompt;
use crate::providers::ModelClient;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// Title produced for a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleUpdate {
    /// Session the title belongs to
    pub session_id: String,
    /// Cleaned title text
    pub title: String,
}

/// Asks the model for a short label summarizing a session's first exchange
#[derive(Clone)]
pub struct TitleSummarizer {
    client: Arc<dyn ModelClient>,
    excerpt_chars: usize,
}

impl TitleSummarizer {
    /// Create a summarizer quoting at most `excerpt_chars` of the reply
    pub fn new(client: Arc<dyn ModelClient>, excerpt_chars: usize) -> Self {
        Self {
            client,
            excerpt_chars,
        }
    }

    /// Request a title, returning `None` on any failure
    ///
    /// Failures and empty answers are logged and swallowed; the session
    /// keeps its placeholder title.
    pub async fn summarize(&self, user_text: &str, model_text: &str) -> Option<String> {
        let prompt = build_title_prompt(user_text, model_text, self.excerpt_chars);

        match self.client.generate(&prompt).await {
            Ok(raw) => {
                let title = clean_title(&raw);
                if title.is_empty() {
                    tracing::warn!("Title summary came back empty");
                    None
                } else {
                    Some(title)
                }
            }
            Err(e) => {
                tracing::warn!("Failed to generate title: {:#}", e);
                None
            }
        }
    }

    /// Summarize on a background task and send the result over `tx`
    ///
    /// Nothing is sent when summarizing fails or the receiver is gone.
    pub fn spawn(
        &self,
        session_id: String,
        user_text: String,
        model_text: String,
        tx: UnboundedSender<TitleUpdate>,
    ) -> JoinHandle<()> {
        let summarizer = self.clone();
        tokio::spawn(async move {
            if let Some(title) = summarizer.summarize(&user_text, &model_text).await {
                tracing::debug!("Generated title for {}: {}", session_id, title);
                if tx.send(TitleUpdate { session_id, title }).is_err() {
                    tracing::debug!("Title receiver dropped");
                }
            }
        })
    }
}

/// Trim whitespace and drop double quotes from a model-written title
pub fn clean_title(raw: &str) -> String {
    raw.replace('"', "").trim().to_string()
}
