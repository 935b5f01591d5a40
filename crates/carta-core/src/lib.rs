#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for request validation.
pub const TRACING_TARGET_VALIDATION: &str = "carta_core::validation";

/// Tracing target for post-processing (prompt building and output parsing).
pub const TRACING_TARGET_POSTPROCESS: &str = "carta_core::postprocess";

mod error;
mod health;
mod metrics;
mod parse;
mod quality;
mod request;
mod result;
mod schema;
mod worker;

pub use crate::error::{BoxedError, Error, ErrorCode, ErrorInfo, Result};
pub use crate::health::{DependencyHealth, HealthSnapshot, ServiceStatus};
pub use crate::metrics::{MetricsState, Outcome, RecentWindow, Sample};
pub use crate::parse::{extract_json_object, strip_thinking};
pub use crate::quality::{QualityGate, QualityReport};
pub use crate::request::{
    DocumentSide, DocumentVersion, ExtractionInput, ExtractionRequest, ImageType, PayloadLimits,
};
pub use crate::result::{ExtractionResult, Fields, InferenceOutput};
pub use crate::schema::FieldSchema;
pub use crate::worker::{
    Completion, InferenceWorker, PostProcessor, RecognizedText, TextLine, TextRecognizer,
};
