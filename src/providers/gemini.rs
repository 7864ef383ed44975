//! Google Gemini client implementation for ctutor
//!
//! Streams conversational replies from the `streamGenerateContent` endpoint
//! (`alt=sse`, one `GenerateContentResponse` per event) and issues one-shot
//! `generateContent` calls for title summaries.

use crate::config::GeminiConfig;
use crate::error::{CtutorError, Result};
use crate::providers::sse::sse_data;
use crate::providers::{Message, ModelClient, Role, TextStream, Turn};

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Public Gemini API host
const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Gemini API client
///
/// The API key is optional at construction time; a missing key makes the
/// first remote call fail with [`CtutorError::MissingCredentials`].
///
/// # Examples
///
/// ```
/// use ctutor::config::GeminiConfig;
/// use ctutor::providers::GeminiClient;
///
/// let client = GeminiClient::new(GeminiConfig::default(), 30);
/// assert!(client.is_ok());
/// ```
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

/// Request body shared by both endpoints
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
}

#[derive(Debug, Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<GeminiInlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

/// Response body (also each streamed SSE event)
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    error: Option<GeminiApiError>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiApiError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiApiError,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

impl GeminiClient {
    /// Create a new Gemini client
    ///
    /// # Arguments
    ///
    /// * `config` - Gemini configuration (model, optional base URL and key)
    /// * `connect_timeout_seconds` - TCP/TLS connect timeout
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: GeminiConfig, connect_timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_seconds))
            .user_agent(concat!("ctutor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CtutorError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(
            "Initialized Gemini client: model={}, api_base={}",
            config.model,
            config.api_base.as_deref().unwrap_or(DEFAULT_API_BASE)
        );

        Ok(Self { client, config })
    }

    fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| CtutorError::MissingCredentials("gemini".to_string()).into())
    }

    fn endpoint(&self, method: &str) -> Result<Url> {
        let base = self
            .config
            .api_base
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/');
        let raw = format!("{}/v1beta/models/{}:{}", base, self.config.model, method);
        Url::parse(&raw)
            .map_err(|e| CtutorError::Config(format!("Invalid Gemini endpoint {}: {}", raw, e)).into())
    }

    fn convert_history(history: &[Message]) -> Vec<GeminiContent> {
        history
            .iter()
            .map(|m| GeminiContent {
                role: match m.role {
                    Role::User => "user".to_string(),
                    Role::Model => "model".to_string(),
                },
                parts: vec![GeminiPart {
                    text: Some(m.content.clone()),
                    inline_data: None,
                }],
            })
            .collect()
    }

    fn convert_turn(turn: &Turn) -> GeminiContent {
        let mut parts = Vec::with_capacity(2);
        if let Some(image) = &turn.image {
            parts.push(GeminiPart {
                text: None,
                inline_data: Some(GeminiInlineData {
                    mime_type: image.mime_type.clone(),
                    data: image.data.clone(),
                }),
            });
        }
        parts.push(GeminiPart {
            text: Some(turn.text.clone()),
            inline_data: None,
        });
        GeminiContent {
            role: "user".to_string(),
            parts,
        }
    }

    async fn post(&self, url: Url, body: &GenerateContentRequest) -> Result<reqwest::Response> {
        let api_key = self.api_key()?;

        tracing::debug!("POST {}", url.path());
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Failed to reach Gemini: {}", e);
                CtutorError::Provider(format!("Failed to connect to Gemini: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiErrorEnvelope>(&error_text)
                .map(|e| e.error.message)
                .unwrap_or(error_text);
            tracing::error!("Gemini returned error {}: {}", status, message);
            return Err(
                CtutorError::Provider(format!("Gemini returned error {}: {}", status, message))
                    .into(),
            );
        }

        Ok(response)
    }
}

/// Decode one streamed event into its text, surfacing in-band errors
fn decode_stream_event(data: &str) -> Result<String> {
    let event: GenerateContentResponse = serde_json::from_str(data)
        .map_err(|e| CtutorError::Provider(format!("Failed to parse Gemini stream event: {}", e)))?;
    if let Some(err) = event.error {
        return Err(CtutorError::Provider(format!("Gemini stream error: {}", err.message)).into());
    }
    Ok(event.text())
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn stream_chat(
        &self,
        system: Option<&str>,
        history: &[Message],
        turn: &Turn,
    ) -> Result<TextStream> {
        let mut contents = Self::convert_history(history);
        contents.push(Self::convert_turn(turn));

        let request = GenerateContentRequest {
            contents,
            system_instruction: system.map(|s| GeminiSystemInstruction {
                parts: vec![GeminiPart {
                    text: Some(s.to_string()),
                    inline_data: None,
                }],
            }),
        };

        let mut url = self.endpoint("streamGenerateContent")?;
        url.query_pairs_mut().append_pair("alt", "sse");

        let response = self.post(url, &request).await?;

        let chunks = sse_data(response.bytes_stream()).filter_map(|event| async move {
            match event.and_then(|data| decode_stream_event(&data)) {
                Ok(text) if text.is_empty() => None,
                other => Some(other),
            }
        });

        Ok(Box::pin(chunks))
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateContentRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart {
                    text: Some(prompt.to_string()),
                    inline_data: None,
                }],
            }],
            system_instruction: None,
        };

        let url = self.endpoint("generateContent")?;
        let response = self.post(url, &request).await?;

        let body: GenerateContentResponse = response.json().await.map_err(|e| {
            CtutorError::Provider(format!("Failed to parse Gemini response: {}", e))
        })?;

        Ok(body.text())
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
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, api_key: Option<&str>) -> GeminiClient {
        GeminiClient::new(
            GeminiConfig {
                model: "gemini-2.5-flash".to_string(),
                api_base: Some(server.uri()),
                api_key: api_key.map(str::to_string),
            },
            5,
        )
        .expect("client")
    }

    fn sse_body(texts: &[&str]) -> String {
        texts
            .iter()
            .map(|t| {
                let event = json!({
                    "candidates": [{ "content": { "role": "model", "parts": [{ "text": t }] } }]
                });
                format!("data: {}\r\n\r\n", event)
            })
            .collect()
    }

    #[test]
    fn test_convert_turn_puts_image_before_text() {
        let turn = Turn::with_image(
            "what does this print?",
            InlineImage {
                mime_type: "image/png".to_string(),
                data: "iVBOR".to_string(),
            },
        );
        let content = GeminiClient::convert_turn(&turn);
        let value = serde_json::to_value(&content).unwrap();
        assert_eq!(
            value,
            json!({
                "role": "user",
                "parts": [
                    { "inlineData": { "mimeType": "image/png", "data": "iVBOR" } },
                    { "text": "what does this print?" }
                ]
            })
        );
    }

    #[test]
    fn test_convert_history_maps_roles() {
        let contents =
            GeminiClient::convert_history(&[Message::user("q"), Message::model("a")]);
        assert_eq!(contents[0].role, "user");
        assert_eq!(contents[1].role, "model");
    }

    #[test]
    fn test_decode_stream_event_surfaces_error() {
        let err = decode_stream_event(r#"{"error":{"code":500,"message":"overloaded"}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("overloaded"));
    }

    #[tokio::test]
    async fn test_stream_chat_yields_chunks_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash:streamGenerateContent"))
            .and(query_param("alt", "sse"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(json!({
                "systemInstruction": { "parts": [{ "text": "be a tutor" }] },
                "contents": [
                    { "role": "user", "parts": [{ "text": "hi" }] },
                    { "role": "model", "parts": [{ "text": "hello" }] },
                    { "role": "user", "parts": [{ "text": "explain pointers" }] }
                ]
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_body(&["Pointers ", "", "hold addresses."])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("test-key"));
        let stream = client
            .stream_chat(
                Some("be a tutor"),
                &[Message::user("hi"), Message::model("hello")],
                &Turn::text("explain pointers"),
            )
            .await
            .expect("stream");

        let chunks: Vec<String> = stream.map(|c| c.expect("chunk")).collect().await;
        assert_eq!(chunks, vec!["Pointers ".to_string(), "hold addresses.".to_string()]);
    }

    #[tokio::test]
    async fn test_stream_chat_http_error_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "code": 400, "message": "API key not valid" }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("bad"));
        let err = match client.stream_chat(None, &[], &Turn::text("x")).await {
            Ok(_) => panic!("expected error"),
            Err(e) => e,
        };
        assert!(err.to_string().contains("API key not valid"));
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_first_call() {
        let server = MockServer::start().await;
        let client = client_for(&server, None);
        let err = client.generate("title please").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CtutorError>(),
            Some(CtutorError::MissingCredentials(_))
        ));
    }

    #[tokio::test]
    async fn test_generate_returns_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "role": "model", "parts": [{ "text": "\"Pointer Basics\"" }] } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("k"));
        let text = client.generate("prompt").await.expect("generate");
        assert_eq!(text, "\"Pointer Basics\"");
    }

    #[test]
    fn test_model_name() {
        let client = GeminiClient::new(GeminiConfig::default(), 5).unwrap();
        assert_eq!(client.model_name(), "gemini-2.5-flash");
    }
}
