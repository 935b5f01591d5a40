//! Paddle HTTP client module.

mod pd_client;
mod pd_config;

pub use pd_client::{OcrLines, PdClient};
pub use pd_config::PdConfig;
