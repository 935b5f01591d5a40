//! Ollama client module.
//!
//! Talks to the Ollama HTTP API directly with reqwest; only the generate and
//! tags endpoints are used.

mod credentials;
mod ollama_client;
mod ollama_config;

pub use credentials::OllamaCredentials;
pub use ollama_client::{GenerateOptions, GenerateResponse, OllamaClient};
pub use ollama_config::{OllamaBuilder, OllamaBuilderError, OllamaConfig};
