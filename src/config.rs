//! Configuration management for ctutor
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{CtutorError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for ctutor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Provider configuration (Gemini, Ollama)
    pub provider: ProviderConfig,
    /// Chat behaviour configuration
    #[serde(default)]
    pub chat: ChatConfig,
    /// Durable session storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Provider configuration
///
/// Specifies which model provider to use and its settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Type of provider to use
    #[serde(rename = "type")]
    pub provider_type: String,

    /// Google Gemini configuration
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Ollama configuration
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// Connect timeout for provider HTTP requests (seconds)
    ///
    /// Responses themselves are never cut off; a stream runs until the
    /// provider finishes or fails.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

fn default_connect_timeout() -> u64 {
    30
}

/// Google Gemini provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Model to use for Gemini
    #[serde(default = "default_gemini_model")]
    pub model: String,

    /// Optional API base URL (useful for tests and local mocks)
    #[serde(default)]
    pub api_base: Option<String>,

    /// API key; normally supplied through `GEMINI_API_KEY` or `API_KEY`
    /// rather than the config file
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: default_gemini_model(),
            api_base: None,
            api_key: None,
        }
    }
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Ollama server host
    #[serde(default = "default_ollama_host")]
    pub host: String,

    /// Model to use for Ollama
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

fn default_ollama_host() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2:latest".to_string()
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: default_ollama_host(),
            model: default_ollama_model(),
        }
    }
}

/// Chat behaviour configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Characters of the first model reply quoted in the title prompt
    #[serde(default = "default_title_excerpt_chars")]
    pub title_excerpt_chars: usize,

    /// Largest accepted image attachment in bytes
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: u64,

    /// Override for the tutor system instruction
    #[serde(default)]
    pub system_instruction: Option<String>,
}

fn default_title_excerpt_chars() -> usize {
    200
}

fn default_max_image_bytes() -> u64 {
    crate::attachment::DEFAULT_MAX_IMAGE_BYTES
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            title_excerpt_chars: default_title_excerpt_chars(),
            max_image_bytes: default_max_image_bytes(),
            system_instruction: None,
        }
    }
}

impl ChatConfig {
    /// System instruction sent with every conversational call
    pub fn system_instruction(&self) -> &str {
        self.system_instruction
            .as_deref()
            .unwrap_or(crate::prompts::C_TUTOR_SYSTEM_INSTRUCTION)
    }
}

/// Durable session storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the SQLite store; the platform data directory is used when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default_config()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn default_config() -> Self {
        Self {
            provider: ProviderConfig {
                provider_type: "gemini".to_string(),
                gemini: GeminiConfig::default(),
                ollama: OllamaConfig::default(),
                connect_timeout_seconds: default_connect_timeout(),
            },
            chat: ChatConfig::default(),
            storage: StorageConfig::default(),
        }
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CtutorError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| CtutorError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(provider_type) = std::env::var("CTUTOR_PROVIDER") {
            self.provider.provider_type = provider_type;
        }

        if let Ok(model) = std::env::var("CTUTOR_GEMINI_MODEL") {
            self.provider.gemini.model = model;
        }

        if let Ok(api_base) = std::env::var("CTUTOR_GEMINI_API_BASE") {
            self.provider.gemini.api_base = Some(api_base);
        }

        // GEMINI_API_KEY wins over the generic API_KEY.
        if let Ok(key) = std::env::var("GEMINI_API_KEY").or_else(|_| std::env::var("API_KEY")) {
            if !key.trim().is_empty() {
                self.provider.gemini.api_key = Some(key);
            }
        }

        if let Ok(host) = std::env::var("CTUTOR_OLLAMA_HOST") {
            self.provider.ollama.host = host;
        }

        if let Ok(model) = std::env::var("CTUTOR_OLLAMA_MODEL") {
            self.provider.ollama.model = model;
        }

        if let Ok(path) = std::env::var("CTUTOR_STORE_PATH") {
            self.storage.path = Some(PathBuf::from(path));
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if let Some(path) = &cli.store_path {
            tracing::info!("Using store path override from CLI: {}", path.display());
            self.storage.path = Some(path.clone());
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.provider.provider_type.is_empty() {
            return Err(CtutorError::Config("Provider type cannot be empty".to_string()).into());
        }

        let valid_providers = ["gemini", "ollama"];
        if !valid_providers.contains(&self.provider.provider_type.as_str()) {
            return Err(CtutorError::Config(format!(
                "Invalid provider type: {}. Must be one of: {}",
                self.provider.provider_type,
                valid_providers.join(", ")
            ))
            .into());
        }

        if self.provider.gemini.model.trim().is_empty() {
            return Err(
                CtutorError::Config("provider.gemini.model cannot be empty".to_string()).into(),
            );
        }

        if self.provider.ollama.model.trim().is_empty() {
            return Err(
                CtutorError::Config("provider.ollama.model cannot be empty".to_string()).into(),
            );
        }

        if self.provider.connect_timeout_seconds == 0 {
            return Err(CtutorError::Config(
                "provider.connect_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.chat.title_excerpt_chars == 0 {
            return Err(CtutorError::Config(
                "chat.title_excerpt_chars must be greater than 0".to_string(),
            )
            .into());
        }

        if self.chat.max_image_bytes == 0 {
            return Err(CtutorError::Config(
                "chat.max_image_bytes must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
