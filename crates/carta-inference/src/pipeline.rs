//! The concrete inference worker: recognition followed by post-processing.

use carta_core::{
    Error, ExtractionRequest, FieldSchema, InferenceOutput, InferenceWorker, PostProcessor,
    QualityGate, Result, TextRecognizer, extract_json_object, strip_thinking,
};

use crate::TRACING_TARGET_PIPELINE;

/// Worker that composes a text recognizer with a language-model
/// post-processor.
pub struct PipelineWorker {
    recognizer: Box<dyn TextRecognizer>,
    post_processor: Box<dyn PostProcessor>,
    quality_gate: bool,
}

impl PipelineWorker {
    /// Creates a worker with the quality gate enabled.
    pub fn new(
        recognizer: impl TextRecognizer + 'static,
        post_processor: impl PostProcessor + 'static,
    ) -> Self {
        Self {
            recognizer: Box::new(recognizer),
            post_processor: Box::new(post_processor),
            quality_gate: true,
        }
    }

    /// Enables or disables the OCR quality gate.
    pub fn with_quality_gate(mut self, enabled: bool) -> Self {
        self.quality_gate = enabled;
        self
    }

    /// Checks that both engines are reachable.
    ///
    /// A worker that fails here must not be handed to a model session.
    pub async fn connect(self) -> Result<Self> {
        self.recognizer.health_check().await.map_err(|error| {
            Error::worker_unavailable(format!("text recognizer: {}", error.message()))
                .with_source(error)
        })?;

        self.post_processor.health_check().await.map_err(|error| {
            Error::worker_unavailable(format!("post-processor: {}", error.message()))
                .with_source(error)
        })?;

        tracing::info!(
            target: TRACING_TARGET_PIPELINE,
            model = self.post_processor.model(),
            quality_gate = self.quality_gate,
            "inference engines reachable"
        );

        Ok(self)
    }
}

#[async_trait::async_trait]
impl InferenceWorker for PipelineWorker {
    async fn infer(&mut self, request: &ExtractionRequest) -> Result<InferenceOutput> {
        let recognized = self.recognizer.recognize(request).await?;

        if self.quality_gate {
            let report = QualityGate::for_document(request.version, request.side)
                .check(&recognized)?;
            tracing::debug!(
                target: TRACING_TARGET_PIPELINE,
                request_id = %request.request_id,
                valid_lines = report.valid_lines,
                good_lines = report.good_lines,
                mean_score = report.mean_score,
                "recognition passed the quality gate"
            );
        }

        let recognized = recognized.retain_confident();
        if recognized.is_empty() {
            return Err(Error::inference_failure("no confident text recognized"));
        }
        let raw_text = recognized.joined();

        let schema = FieldSchema::for_document(request.version, request.side);
        let prompt = schema.prompt(&raw_text);
        let completion = self
            .post_processor
            .complete(&prompt, request.thinking_mode)
            .await?;

        tracing::debug!(
            target: TRACING_TARGET_PIPELINE,
            request_id = %request.request_id,
            lines = recognized.lines.len(),
            completion_chars = completion.text.len(),
            thinking = completion.thinking.is_some(),
            "completion received"
        );

        let answer = strip_thinking(&completion.text);
        let parsed = extract_json_object(&answer).ok_or_else(|| {
            Error::inference_failure("language model output contains no JSON object")
        })?;

        Ok(InferenceOutput::new(raw_text, schema.project(parsed)))
    }
}

#[cfg(test)]
mod tests {
    use carta_core::{DocumentSide, DocumentVersion, ErrorCode};
    use carta_test::{MockPostProcessor, MockRecognizer, fixtures};
    use serde_json::{Value, json};

    use super::*;

    fn front() -> ExtractionRequest {
        ExtractionRequest::new(
            fixtures::png_bytes(),
            DocumentVersion::V2018,
            DocumentSide::Recto,
            true,
        )
    }

    #[tokio::test]
    async fn extracts_schema_fields() {
        let post = MockPostProcessor::default();
        let mut worker = PipelineWorker::new(MockRecognizer::default(), post.clone());

        let output = worker.infer(&front()).await.unwrap();

        assert!(output.raw_text.starts_with("REPUBLIQUE DU CAMEROUN"));
        assert_eq!(output.fields["nom"], json!("NGONO"));
        assert_eq!(output.fields["profession"], json!("ENSEIGNANTE"));
        assert_eq!(output.fields.len(), 7);

        let prompts = post.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].0.contains("NGONO"));
        assert!(prompts[0].1);
    }

    #[tokio::test]
    async fn reasoning_is_stripped_before_parsing() {
        let post = MockPostProcessor::new(
            "<think>{\"nom\": \"WRONG\"}</think>{\"nom\": \"NGONO\", \"prenom\": null}",
        );
        let mut worker = PipelineWorker::new(MockRecognizer::default(), post);

        let output = worker.infer(&front()).await.unwrap();
        assert_eq!(output.fields["nom"], json!("NGONO"));
        assert_eq!(output.fields["taille"], Value::Null);
    }

    #[tokio::test]
    async fn blurry_image_fails_quality_gate() {
        let post = MockPostProcessor::default();
        let recognizer = MockRecognizer::new(fixtures::blurry_text());
        let mut worker = PipelineWorker::new(recognizer, post.clone());

        let error = worker.infer(&front()).await.unwrap_err();
        assert_eq!(error.code(), ErrorCode::InferenceFailure);
        assert!(error.message().contains("insufficient OCR quality"));
        assert!(post.prompts().is_empty());
    }

    #[tokio::test]
    async fn disabled_gate_lets_sparse_text_through() {
        let recognizer = MockRecognizer::new(fixtures::blurry_text());
        let mut worker = PipelineWorker::new(recognizer, MockPostProcessor::default())
            .with_quality_gate(false);

        let output = worker.infer(&front()).await.unwrap();
        assert_eq!(output.raw_text, "REPUB CAM");
    }

    #[tokio::test]
    async fn missing_json_is_inference_failure() {
        let post = MockPostProcessor::new("Je ne peux pas lire cette carte.");
        let mut worker = PipelineWorker::new(MockRecognizer::default(), post);

        let error = worker.infer(&front()).await.unwrap_err();
        assert_eq!(error.code(), ErrorCode::InferenceFailure);
    }

    #[tokio::test]
    async fn recognizer_errors_keep_their_classification() {
        let recognizer =
            MockRecognizer::default().failing(ErrorCode::TransientInferenceError, "503");
        let mut worker = PipelineWorker::new(recognizer, MockPostProcessor::default());

        let error = worker.infer(&front()).await.unwrap_err();
        assert!(error.is_retryable());
    }

    #[tokio::test]
    async fn connect_fails_when_an_engine_is_down() {
        let worker = PipelineWorker::new(
            MockRecognizer::default(),
            MockPostProcessor::default().unreachable(),
        );

        let Err(error) = worker.connect().await else {
            panic!("connect should fail");
        };
        assert_eq!(error.code(), ErrorCode::WorkerUnavailable);
        assert!(error.message().starts_with("post-processor"));
    }
}
