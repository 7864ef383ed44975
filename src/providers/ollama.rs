//! Ollama client implementation for ctutor
//!
//! This module implements [`ModelClient`] for Ollama, connecting to a local
//! or remote Ollama server. Conversational replies stream from `/api/chat`
//! as newline-delimited JSON; title summaries use the same endpoint with
//! streaming disabled.

use crate::config::OllamaConfig;
use crate::error::{CtutorError, Result};
use crate::providers::sse::ndjson_lines;
use crate::providers::{Message, ModelClient, Role, TextStream, Turn};

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ollama API client
///
/// # Examples
///
/// ```
/// use ctutor::config::OllamaConfig;
/// use ctutor::providers::OllamaClient;
///
/// let config = OllamaConfig {
///     host: "http://localhost:11434".to_string(),
///     model: "llama3.2:latest".to_string(),
/// };
/// let client = OllamaClient::new(config, 30);
/// assert!(client.is_ok());
/// ```
pub struct OllamaClient {
    client: Client,
    config: OllamaConfig,
}

/// Request structure for Ollama's /api/chat
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
}

/// Message structure for Ollama API
#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
}

/// Response line (streamed) or body (non-streamed) from /api/chat
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    message: Option<OllamaMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

impl OllamaClient {
    /// Create a new Ollama client
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: OllamaConfig, connect_timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_seconds))
            .user_agent(concat!("ctutor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CtutorError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(
            "Initialized Ollama client: host={}, model={}",
            config.host,
            config.model
        );

        Ok(Self { client, config })
    }

    /// Get the configured Ollama host
    pub fn host(&self) -> &str {
        &self.config.host
    }

    /// Convert session messages and the new turn to Ollama format
    fn convert_messages(
        system: Option<&str>,
        history: &[Message],
        turn: &Turn,
    ) -> Vec<OllamaMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);

        if let Some(system) = system {
            messages.push(OllamaMessage {
                role: "system".to_string(),
                content: system.to_string(),
                images: Vec::new(),
            });
        }

        messages.extend(history.iter().map(|m| OllamaMessage {
            role: match m.role {
                Role::User => "user".to_string(),
                Role::Model => "assistant".to_string(),
            },
            content: m.content.clone(),
            images: Vec::new(),
        }));

        messages.push(OllamaMessage {
            role: "user".to_string(),
            content: turn.text.clone(),
            images: turn.image.iter().map(|i| i.data.clone()).collect(),
        });

        messages
    }

    async fn post(&self, request: &OllamaRequest) -> Result<reqwest::Response> {
        let url = format!("{}/api/chat", self.config.host.trim_end_matches('/'));

        tracing::debug!(
            "Sending Ollama request: {} messages, stream={}",
            request.messages.len(),
            request.stream
        );

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Failed to reach Ollama: {}", e);
                CtutorError::Provider(format!("Failed to connect to Ollama server: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Ollama returned error {}: {}", status, error_text);
            return Err(CtutorError::Provider(format!(
                "Ollama returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        Ok(response)
    }
}

/// Decode one NDJSON line into its text fragment
fn decode_line(line: &str) -> Result<String> {
    let parsed: OllamaResponse = serde_json::from_str(line)
        .map_err(|e| CtutorError::Provider(format!("Failed to parse Ollama response: {}", e)))?;
    if let Some(error) = parsed.error {
        return Err(CtutorError::Provider(format!("Ollama stream error: {}", error)).into());
    }
    Ok(parsed.message.map(|m| m.content).unwrap_or_default())
}

#[async_trait]
impl ModelClient for OllamaClient {
    async fn stream_chat(
        &self,
        system: Option<&str>,
        history: &[Message],
        turn: &Turn,
    ) -> Result<TextStream> {
        let request = OllamaRequest {
            model: self.config.model.clone(),
            messages: Self::convert_messages(system, history, turn),
            stream: true,
        };

        let response = self.post(&request).await?;

        let chunks = ndjson_lines(response.bytes_stream()).filter_map(|line| async move {
            match line.and_then(|l| decode_line(&l)) {
                Ok(text) if text.is_empty() => None,
                other => Some(other),
            }
        });

        Ok(Box::pin(chunks))
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = OllamaRequest {
            model: self.config.model.clone(),
            messages: vec![OllamaMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
                images: Vec::new(),
            }],
            stream: false,
        };

        let response = self.post(&request).await?;
        let parsed: OllamaResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse Ollama response: {}", e);
            CtutorError::Provider(format!("Failed to parse Ollama response: {}", e))
        })?;

        if !parsed.done {
            tracing::warn!("Ollama returned an unfinished non-streamed response");
        }

        Ok(parsed.message.map(|m| m.content).unwrap_or_default())
    }

    fn model_name(&self) -> String {
        self.config.model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::InlineImage;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OllamaClient {
        OllamaClient::new(
            OllamaConfig {
                host: server.uri(),
                model: "llama3.2:latest".to_string(),
            },
            5,
        )
        .expect("client")
    }

    #[test]
    fn test_ollama_client_host() {
        let client = OllamaClient::new(OllamaConfig::default(), 5).unwrap();
        assert_eq!(client.host(), "http://localhost:11434");
        assert_eq!(client.model_name(), "llama3.2:latest");
    }

    #[test]
    fn test_convert_messages_maps_roles_and_image() {
        let turn = Turn::with_image(
            "explain",
            InlineImage {
                mime_type: "image/jpeg".to_string(),
                data: "/9j/".to_string(),
            },
        );
        let messages = OllamaClient::convert_messages(
            Some("tutor"),
            &[Message::user("q"), Message::model("a")],
            &turn,
        );

        let roles: Vec<&str> = messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(messages[3].images, vec!["/9j/".to_string()]);
        assert!(messages[1].images.is_empty());
    }

    #[test]
    fn test_decode_line_error() {
        let err = decode_line(r#"{"error":"model not found"}"#).unwrap_err();
        assert!(err.to_string().contains("model not found"));
    }

    #[test]
    fn test_decode_line_done_without_message() {
        assert_eq!(decode_line(r#"{"done":true}"#).unwrap(), "");
    }

    #[tokio::test]
    async fn test_stream_chat_reads_ndjson() {
        let server = MockServer::start().await;
        let body = [
            json!({"message": {"role": "assistant", "content": "int "}, "done": false}),
            json!({"message": {"role": "assistant", "content": "x;"}, "done": false}),
            json!({"message": {"role": "assistant", "content": ""}, "done": true}),
        ]
        .iter()
        .map(|v| format!("{}\n", v))
        .collect::<String>();

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({ "model": "llama3.2:latest", "stream": true })))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(1)
            .mount(&server)
            .await;

        let stream = client_for(&server)
            .stream_chat(None, &[], &Turn::text("declare x"))
            .await
            .expect("stream");
        let chunks: Vec<String> = stream.map(|c| c.expect("chunk")).collect().await;
        assert_eq!(chunks, vec!["int ".to_string(), "x;".to_string()]);
    }

    #[tokio::test]
    async fn test_generate_non_streamed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({ "stream": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": {"role": "assistant", "content": "Struct Practice"},
                "done": true
            })))
            .mount(&server)
            .await;

        let title = client_for(&server).generate("title?").await.expect("generate");
        assert_eq!(title, "Struct Practice");
    }

    #[tokio::test]
    async fn test_server_error_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = client_for(&server).generate("x").await.unwrap_err();
        assert!(err.to_string().contains("Ollama returned error 500"));
    }
}
