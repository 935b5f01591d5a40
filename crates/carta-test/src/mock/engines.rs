//! Canned text recognizer and post-processor.

use std::sync::{Arc, Mutex, PoisonError};

use carta_core::{
    Completion, Error, ErrorCode, ExtractionRequest, PostProcessor, RecognizedText, Result,
    TextRecognizer,
};

use crate::fixtures;

/// Recognizer that returns the same lines for every image.
#[derive(Debug, Clone)]
pub struct MockRecognizer {
    text: RecognizedText,
    failure: Option<(ErrorCode, String)>,
    reachable: bool,
}

impl Default for MockRecognizer {
    fn default() -> Self {
        Self::new(fixtures::clear_front_text())
    }
}

impl MockRecognizer {
    /// Creates a recognizer returning `text`.
    pub fn new(text: RecognizedText) -> Self {
        Self {
            text,
            failure: None,
            reachable: true,
        }
    }

    /// Makes every recognition fail with the given classification.
    pub fn failing(mut self, code: ErrorCode, message: impl Into<String>) -> Self {
        self.failure = Some((code, message.into()));
        self
    }

    /// Makes health checks fail.
    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }
}

#[async_trait::async_trait]
impl TextRecognizer for MockRecognizer {
    async fn recognize(&self, _request: &ExtractionRequest) -> Result<RecognizedText> {
        match &self.failure {
            Some((code, message)) => Err(Error::new(*code, message.clone())),
            None => Ok(self.text.clone()),
        }
    }

    async fn health_check(&self) -> Result<()> {
        if self.reachable {
            Ok(())
        } else {
            Err(Error::worker_unavailable("mock recognizer is unreachable"))
        }
    }
}

/// Post-processor that answers every prompt with the same completion.
///
/// Received prompts are kept for inspection.
#[derive(Debug, Clone)]
pub struct MockPostProcessor {
    completion: Completion,
    reachable: bool,
    prompts: Arc<Mutex<Vec<(String, bool)>>>,
}

impl Default for MockPostProcessor {
    fn default() -> Self {
        Self::new(fixtures::FRONT_COMPLETION)
    }
}

impl MockPostProcessor {
    /// Creates a post-processor answering with `text`.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            completion: Completion::new(text),
            reachable: true,
            prompts: Arc::default(),
        }
    }

    /// Makes health checks fail.
    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    /// Prompts received so far, with their thinking mode flag.
    pub fn prompts(&self) -> Vec<(String, bool)> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait::async_trait]
impl PostProcessor for MockPostProcessor {
    async fn complete(&self, prompt: &str, thinking_mode: bool) -> Result<Completion> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((prompt.to_owned(), thinking_mode));
        Ok(self.completion.clone())
    }

    async fn health_check(&self) -> Result<()> {
        if self.reachable {
            Ok(())
        } else {
            Err(Error::worker_unavailable("mock post-processor is unreachable"))
        }
    }

    fn model(&self) -> &str {
        "mock"
    }
}
