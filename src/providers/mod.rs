//! Provider module for ctutor
//!
//! This module contains the remote model client abstraction and the
//! implementations for Google Gemini and Ollama.

pub mod base;
pub mod gemini;
pub mod ollama;
pub mod sse;

pub use base::{InlineImage, Message, ModelClient, Role, TextStream, Turn};
pub use gemini::GeminiClient;
pub use ollama::OllamaClient;

use crate::config::ProviderConfig;
use crate::error::{CtutorError, Result};
use std::sync::Arc;

/// Create a model client based on configuration
///
/// # Arguments
///
/// * `config` - Provider configuration
/// * `provider_override` - Optional provider type overriding `config.provider_type`
///
/// # Errors
///
/// Returns error if the provider type is unknown or client construction fails
///
/// # Examples
///
/// ```
/// use ctutor::config::Config;
/// use ctutor::providers::create_client;
///
/// let config = Config::default();
/// let client = create_client(&config.provider, Some("ollama")).unwrap();
/// assert_eq!(client.model_name(), "llama3.2:latest");
/// ```
pub fn create_client(
    config: &ProviderConfig,
    provider_override: Option<&str>,
) -> Result<Arc<dyn ModelClient>> {
    let provider_type = provider_override.unwrap_or(&config.provider_type);

    match provider_type {
        "gemini" => Ok(Arc::new(GeminiClient::new(
            config.gemini.clone(),
            config.connect_timeout_seconds,
        )?)),
        "ollama" => Ok(Arc::new(OllamaClient::new(
            config.ollama.clone(),
            config.connect_timeout_seconds,
        )?)),
        _ => Err(CtutorError::Provider(format!("Unknown provider type: {}", provider_type)).into()),
    }
}
