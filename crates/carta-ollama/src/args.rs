//! Command-line arguments for the Ollama post-processor.

use std::time::Duration;

use clap::Args;
use serde::{Deserialize, Serialize};

use crate::client::OllamaConfig;
use crate::error::Result;

/// Ollama connection and model selection.
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
pub struct OllamaArgs {
    /// Base URL of the Ollama server
    #[arg(long = "ollama-url", env = "OLLAMA_URL", default_value = "http://localhost:11434")]
    pub ollama_url: String,

    /// Request timeout in seconds
    #[arg(long = "ollama-timeout", env = "OLLAMA_TIMEOUT", default_value_t = 120)]
    pub ollama_timeout: u64,

    /// Base model name
    #[arg(long = "ollama-model", env = "OLLAMA_MODEL", default_value = "qwen3:0.6b")]
    pub ollama_model: String,

    /// Adapter or fine-tuned model tag used instead of the base model
    #[arg(long = "ollama-adapter", env = "OLLAMA_ADAPTER")]
    pub ollama_adapter: Option<String>,
}

impl OllamaArgs {
    /// Build a validated client configuration.
    pub fn to_config(&self) -> Result<OllamaConfig> {
        let mut builder = OllamaConfig::builder()
            .with_base_url(&self.ollama_url)?
            .with_timeout(Duration::from_secs(self.ollama_timeout))
            .with_model(self.ollama_model.as_str());

        if let Some(adapter) = &self.ollama_adapter {
            builder = builder.with_adapter(adapter.as_str());
        }

        Ok(builder.build()?)
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        ollama: OllamaArgs,
    }

    #[test]
    fn defaults_build_a_config() {
        let cli = Cli::parse_from(["carta"]);
        let config = cli.ollama.to_config().unwrap();

        assert_eq!(config.timeout, Duration::from_secs(120));
        assert_eq!(config.effective_model(), "qwen3:0.6b");
    }

    #[test]
    fn adapter_flag_selects_the_model() {
        let cli = Cli::parse_from(["carta", "--ollama-adapter", "cni-lora", "--ollama-timeout", "30"]);
        let config = cli.ollama.to_config().unwrap();

        assert_eq!(config.effective_model(), "cni-lora");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let cli = Cli::parse_from(["carta", "--ollama-timeout", "0"]);
        assert!(cli.ollama.to_config().is_err());
    }
}
