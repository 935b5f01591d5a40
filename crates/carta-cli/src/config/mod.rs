//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── server: ServerConfig          # REST and gRPC listeners, shutdown
//! ├── recovery: RecoveryConfig      # HTTP request timeout
//! ├── extraction: ExtractionConfig  # attempts, backoff, deadline, payload limit
//! ├── health: HealthArgs            # health thresholds and window
//! ├── worker: WorkerConfig          # PaddleOCR, Ollama, quality gate
//! └── log_format: LogFormat
//! ```
//!
//! Every option can be given as a flag or an environment variable, and with
//! the `dotenv` feature from a `.env` file.

mod provider;
mod server;
mod service;
mod telemetry;

use std::process;

use anyhow::{Context, anyhow};
use carta_server::ServiceConfig;
use carta_server::middleware::RecoveryConfig;
use clap::Parser;
pub use provider::{WorkerConfig, create_session};
use serde::{Deserialize, Serialize};
pub use server::ServerConfig;
pub use service::{ExtractionConfig, HealthArgs};
pub use telemetry::{LogFormat, init_tracing};

use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_SERVER_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "carta")]
#[command(about = "Identity card field extraction service")]
#[command(version)]
pub struct Cli {
    /// Listener configuration.
    #[clap(flatten)]
    pub server: ServerConfig,

    /// HTTP recovery middleware configuration.
    #[clap(flatten)]
    pub recovery: RecoveryConfig,

    /// Retry schedule, timeouts and payload limit.
    #[clap(flatten)]
    pub extraction: ExtractionConfig,

    /// Health thresholds.
    #[clap(flatten)]
    pub health: HealthArgs,

    /// Inference engines.
    #[clap(flatten)]
    pub worker: WorkerConfig,

    /// Log output format.
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Cli {
    /// Loads the `.env` file (if enabled) and parses the arguments.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Validates all configuration values.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.server
            .validate()
            .context("invalid server configuration")?;
        self.extraction
            .validate()
            .context("invalid extraction configuration")?;
        self.health
            .validate()
            .context("invalid health configuration")?;

        if self.recovery.request_timeout < self.extraction.deadline {
            return Err(anyhow!(
                "Request timeout ({}s) is shorter than the extraction deadline ({}s)",
                self.recovery.request_timeout,
                self.extraction.deadline
            ));
        }

        Ok(())
    }

    /// Returns the configuration shared by both transports.
    pub fn service_config(&self) -> ServiceConfig {
        service::service_config(&self.extraction, &self.health)
    }

    /// Logs the configuration (no secrets are configured).
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET_SERVER_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "build information"
        );

        self.server.log();
        service::log_service_config(&self.extraction, &self.health);
        self.worker.log();

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            request_timeout_secs = self.recovery.request_timeout,
            "middleware configuration"
        );
    }

    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cli = Cli::parse_from(["carta"]);

        assert!(cli.validate().is_ok());
        assert_eq!(cli.recovery.request_timeout, 310);
        assert_eq!(cli.log_format, LogFormat::Text);
        assert_eq!(cli.service_config().max_body_size(), 17 * 1024 * 1024);
    }

    #[test]
    fn backoff_schedule_is_comma_separated() {
        let cli = Cli::parse_from(["carta", "--backoff-schedule", "1,2"]);
        assert_eq!(cli.extraction.backoff_schedule, vec![1, 2]);
    }

    #[test]
    fn request_timeout_must_cover_the_deadline() {
        let cli = Cli::parse_from(["carta", "--request-timeout", "60"]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn json_log_format() {
        let cli = Cli::parse_from(["carta", "--log-format", "json"]);
        assert_eq!(cli.log_format, LogFormat::Json);
    }
}
