//! Engine configuration and worker start-up.

use std::time::Duration;

use anyhow::Context;
use carta_inference::{ModelSession, PipelineWorker};
use carta_ollama::{OllamaArgs, OllamaClient, OllamaCredentials};
use carta_paddle::{PdClient, PdConfig};
use clap::{ArgAction, Args};
use serde::{Deserialize, Serialize};

use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_SERVER_STARTUP};

/// Text recognition and post-processing engines.
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
#[must_use = "config does nothing unless you use it"]
pub struct WorkerConfig {
    /// Base URL of the PaddleOCR serving endpoint.
    #[arg(long, env = "PADDLE_URL", default_value = "http://localhost:8866")]
    pub paddle_url: String,

    /// Request timeout in seconds for the PaddleOCR endpoint.
    #[arg(long, env = "PADDLE_TIMEOUT", default_value_t = 60)]
    pub paddle_timeout: u64,

    /// Rejects images whose recognition confidence is too low.
    #[arg(
        long,
        env = "OCR_QUALITY_GATE",
        default_value_t = true,
        action = ArgAction::Set
    )]
    pub ocr_quality_gate: bool,

    /// Ollama connection and model selection.
    #[clap(flatten)]
    pub ollama: OllamaArgs,
}

impl WorkerConfig {
    /// Builds both engine clients. Fails only on invalid settings; nothing
    /// is contacted.
    pub fn create_worker(&self) -> anyhow::Result<PipelineWorker> {
        let paddle_config = PdConfig::new(&self.paddle_url)
            .context("invalid PaddleOCR configuration")?
            .with_timeout(Duration::from_secs(self.paddle_timeout));
        let recognizer = PdClient::new(paddle_config).context("failed to create PaddleOCR client")?;

        let ollama_config = self
            .ollama
            .to_config()
            .context("invalid Ollama configuration")?;
        let post_processor = OllamaClient::new(ollama_config, OllamaCredentials::none())
            .context("failed to create Ollama client")?;

        Ok(PipelineWorker::new(recognizer, post_processor).with_quality_gate(self.ocr_quality_gate))
    }

    /// Logs the engine configuration.
    pub fn log(&self) {
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            paddle_url = %self.paddle_url,
            paddle_timeout_secs = self.paddle_timeout,
            ollama_url = %self.ollama.ollama_url,
            ollama_model = %self.ollama.ollama_model,
            ollama_adapter = ?self.ollama.ollama_adapter,
            ocr_quality_gate = self.ocr_quality_gate,
            "worker configuration"
        );
    }
}

/// Connects the worker and wraps it in a session.
///
/// An unreachable engine does not abort start-up: the session is created
/// uninitialized so that requests fail with `WORKER_UNAVAILABLE` and health
/// reports the reason.
pub async fn create_session(worker: PipelineWorker) -> ModelSession {
    match worker.connect().await {
        Ok(worker) => {
            tracing::info!(
                target: TRACING_TARGET_SERVER_STARTUP,
                "inference worker loaded"
            );
            ModelSession::new(worker)
        }
        Err(error) => {
            tracing::error!(
                target: TRACING_TARGET_SERVER_STARTUP,
                error = %error,
                error_code = %error.code(),
                "inference worker failed to initialize"
            );
            ModelSession::unavailable(error.message().to_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        worker: WorkerConfig,
    }

    #[test]
    fn defaults_build_a_worker() {
        let cli = Cli::parse_from(["carta"]);

        assert!(cli.worker.ocr_quality_gate);
        assert_eq!(cli.worker.paddle_timeout, 60);
        assert!(cli.worker.create_worker().is_ok());
    }

    #[test]
    fn quality_gate_can_be_disabled() {
        let cli = Cli::parse_from(["carta", "--ocr-quality-gate", "false"]);
        assert!(!cli.worker.ocr_quality_gate);
    }

    #[test]
    fn invalid_paddle_url_is_rejected() {
        let cli = Cli::parse_from(["carta", "--paddle-url", "not a url"]);
        assert!(cli.worker.create_worker().is_err());
    }

    #[tokio::test]
    async fn unreachable_engines_leave_the_session_uninitialized() {
        let cli = Cli::parse_from([
            "carta",
            "--paddle-url",
            "http://127.0.0.1:9",
            "--paddle-timeout",
            "1",
        ]);

        let session = create_session(cli.worker.create_worker().unwrap()).await;

        assert!(!session.is_initialized());
        assert!(
            session
                .liveness()
                .init_error
                .unwrap_or_default()
                .contains("text recognizer")
        );
    }
}
