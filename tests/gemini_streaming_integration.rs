//! End-to-end streaming through the Gemini client against a mock server

use ctutor::config::{ChatConfig, ProviderConfig};
use ctutor::providers::create_client;
use ctutor::storage::MemoryStore;
use ctutor::{ChatApp, SendOutcome, SessionStore};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sse_event(text: &str) -> String {
    format!(
        "data: {}\r\n\r\n",
        json!({ "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }] })
    )
}

fn provider_for(server: &MockServer) -> ProviderConfig {
    let mut provider = ctutor::Config::default().provider;
    provider.gemini.api_base = Some(server.uri());
    provider.gemini.api_key = Some("test-key".to_string());
    provider
}

#[tokio::test]
async fn test_reply_and_title_from_gemini() {
    let server = MockServer::start().await;

    let body: String = ["```c\n", "int x = 1;\n", "```\nDone."]
        .iter()
        .map(|t| sse_event(t))
        .collect();
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:streamGenerateContent"))
        .and(query_param("alt", "sse"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(body),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": "\"Declaring Variables\"\n" }] } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_client(&provider_for(&server), None).unwrap();
    let store = SessionStore::new(Box::new(MemoryStore::new()));
    let mut app = ChatApp::new(store, Some(client), &ChatConfig::default());

    let outcome = app
        .send_message("How do I declare an int?", None, |_| {})
        .await
        .unwrap();
    let SendOutcome::Completed { reply, .. } = outcome else {
        panic!("expected completed reply");
    };
    assert_eq!(reply, "```c\nint x = 1;\n```\nDone.");

    let update = app.next_title_update().await.unwrap();
    assert_eq!(update.title, "Declaring Variables");
    assert_eq!(app.active_session().unwrap().title, "Declaring Variables");
}

#[tokio::test]
async fn test_gemini_error_shows_error_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "code": 429, "message": "Resource has been exhausted" }
        })))
        .mount(&server)
        .await;

    let client = create_client(&provider_for(&server), None).unwrap();
    let store = SessionStore::new(Box::new(MemoryStore::new()));
    let mut app = ChatApp::new(store, Some(client), &ChatConfig::default());

    let outcome = app.send_message("hi", None, |_| {}).await.unwrap();
    let SendOutcome::Failed { error, .. } = outcome else {
        panic!("expected failure");
    };
    assert!(error.contains("Resource has been exhausted"));
    assert_eq!(
        app.active_session().unwrap().messages[1].content,
        ctutor::chat::ERROR_MESSAGE
    );
}
