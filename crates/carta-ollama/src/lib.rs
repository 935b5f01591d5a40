#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for the main library
pub const TRACING_TARGET: &str = "carta_ollama";

/// Tracing target for client operations
pub const TRACING_TARGET_CLIENT: &str = "carta_ollama::client";

/// Tracing target for API operations
pub const TRACING_TARGET_API: &str = "carta_ollama::api";

#[cfg(feature = "config")]
mod args;
mod client;
mod error;

#[cfg(feature = "config")]
#[cfg_attr(docsrs, doc(cfg(feature = "config")))]
pub use crate::args::OllamaArgs;
pub use crate::client::{
    GenerateOptions, GenerateResponse, OllamaBuilder, OllamaBuilderError, OllamaClient,
    OllamaConfig, OllamaCredentials,
};
pub use crate::error::{Error, Result};
