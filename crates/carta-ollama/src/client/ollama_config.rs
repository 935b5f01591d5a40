//! Ollama client configuration
//!
//! This module provides configuration structures and builders for the Ollama client.

use std::time::Duration;

use derive_builder::Builder;
use url::Url;

use crate::error::{Error, Result};

/// Default address of a local Ollama server.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Default base model.
pub const DEFAULT_MODEL: &str = "qwen3:0.6b";

/// Configuration for the Ollama client
///
/// When `adapter` is set, its tag names the model used for generation and
/// `model` is only reported.
#[derive(Debug, Clone, Builder)]
#[builder(
    name = "OllamaBuilder",
    pattern = "owned",
    setter(into, strip_option, prefix = "with"),
    build_fn(validate = "Self::validate_config")
)]
pub struct OllamaConfig {
    /// Base URL for the Ollama API
    #[builder(setter(custom), default = "DEFAULT_BASE_URL.to_owned()")]
    pub base_url: String,
    /// Request timeout duration
    #[builder(default = "Duration::from_secs(120)")]
    pub timeout: Duration,
    /// Connection timeout duration
    #[builder(default = "Duration::from_secs(10)")]
    pub connect_timeout: Duration,
    /// Base model name
    #[builder(default = "DEFAULT_MODEL.to_owned()")]
    pub model: String,
    /// Fine-tuned or adapter-merged model tag
    #[builder(default)]
    pub adapter: Option<String>,
    /// Sampling temperature
    #[builder(default = "0.3")]
    pub temperature: f32,
    /// Maximum number of tokens to generate
    #[builder(default = "512")]
    pub num_predict: u32,
    /// User agent string for requests
    #[builder(default = "OllamaConfig::default_user_agent()")]
    pub user_agent: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(10),
            model: DEFAULT_MODEL.to_owned(),
            adapter: None,
            temperature: 0.3,
            num_predict: 512,
            user_agent: Self::default_user_agent(),
        }
    }
}

impl OllamaConfig {
    /// Create a new configuration builder
    pub fn builder() -> OllamaBuilder {
        OllamaBuilder::default()
    }

    /// Model tag sent with every generate request.
    pub fn effective_model(&self) -> &str {
        self.adapter.as_deref().unwrap_or(&self.model)
    }

    /// Parsed base URL.
    pub(crate) fn parsed_base_url(&self) -> Result<Url> {
        parse_base_url(&self.base_url)
    }

    fn default_user_agent() -> String {
        format!("carta-ollama/{}", env!("CARGO_PKG_VERSION"))
    }
}

impl OllamaBuilder {
    /// Set the base URL for the Ollama API
    pub fn with_base_url(mut self, url: &str) -> Result<Self> {
        parse_base_url(url)?;
        self.base_url = Some(url.to_owned());
        Ok(self)
    }

    fn validate_config(&self) -> std::result::Result<(), String> {
        if let Some(url) = &self.base_url {
            parse_base_url(url).map_err(|e| e.to_string())?;
        }

        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err("Timeout must be greater than 0".to_string());
        }

        if self.connect_timeout.is_some_and(|t| t.is_zero()) {
            return Err("Connect timeout must be greater than 0".to_string());
        }

        if self.model.as_ref().is_some_and(|m| m.trim().is_empty()) {
            return Err("Model name must not be empty".to_string());
        }

        if let Some(Some(adapter)) = &self.adapter
            && adapter.trim().is_empty()
        {
            return Err("Adapter tag must not be empty".to_string());
        }

        if self
            .temperature
            .is_some_and(|t| !t.is_finite() || t < 0.0)
        {
            return Err("Temperature must be a non-negative number".to_string());
        }

        if self.num_predict == Some(0) {
            return Err("num_predict must be greater than 0".to_string());
        }

        Ok(())
    }
}

fn parse_base_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url)
        .map_err(|e| Error::invalid_config(format!("Invalid base URL '{url}': {e}")))?;

    if parsed.cannot_be_a_base() {
        return Err(Error::invalid_config(format!(
            "Base URL '{url}' cannot carry a path"
        )));
    }

    Ok(parsed)
}
