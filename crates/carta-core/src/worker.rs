//! Worker and engine abstractions.
//!
//! An [`InferenceWorker`] is the single, expensive, load-once unit that the
//! model session owns. The concrete worker composes a [`TextRecognizer`]
//! with a [`PostProcessor`], but the session only sees the worker trait.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::request::ExtractionRequest;
use crate::result::InferenceOutput;

/// Lines scoring below this confidence are dropped during preprocessing.
pub const MIN_LINE_SCORE: f32 = 0.3;

/// The loaded inference worker.
///
/// Methods take `&mut self`: a worker is never shared and never entered by
/// two calls at once.
#[async_trait::async_trait]
pub trait InferenceWorker: Send + 'static {
    /// Runs recognition and post-processing for a single request.
    ///
    /// Errors must already be classified.
    async fn infer(&mut self, request: &ExtractionRequest) -> Result<InferenceOutput>;

    /// Releases engine resources during graceful shutdown.
    async fn shutdown(&mut self) {}
}

/// Text recognition engine: image in, scored text lines out.
#[async_trait::async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Recognizes text lines in the request image.
    async fn recognize(&self, request: &ExtractionRequest) -> Result<RecognizedText>;

    /// Checks that the engine is reachable.
    async fn health_check(&self) -> Result<()>;
}

/// Language-model post-processor: prompt in, completion out.
#[async_trait::async_trait]
pub trait PostProcessor: Send + Sync {
    /// Generates a completion for the prompt.
    async fn complete(&self, prompt: &str, thinking_mode: bool) -> Result<Completion>;

    /// Checks that the engine is reachable and the model is available.
    async fn health_check(&self) -> Result<()>;

    /// Name of the model that serves completions.
    fn model(&self) -> &str;
}

/// A single recognized line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    /// Recognized text.
    pub text: String,
    /// Recognition confidence in `0.0..=1.0`.
    pub score: f32,
}

impl TextLine {
    /// Creates a new line.
    pub fn new(text: impl Into<String>, score: f32) -> Self {
        Self {
            text: text.into(),
            score,
        }
    }
}

/// Recognition output in reading order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognizedText {
    /// Recognized lines.
    pub lines: Vec<TextLine>,
}

impl RecognizedText {
    /// Creates recognition output from lines.
    pub fn new(lines: Vec<TextLine>) -> Self {
        Self { lines }
    }

    /// Drops empty lines and lines scoring below [`MIN_LINE_SCORE`].
    pub fn retain_confident(mut self) -> Self {
        self.lines
            .retain(|line| line.score >= MIN_LINE_SCORE && !line.text.trim().is_empty());
        self
    }

    /// Joins trimmed line texts with single spaces.
    pub fn joined(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.text.trim())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Returns true if no line was recognized.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl FromIterator<TextLine> for RecognizedText {
    fn from_iter<I: IntoIterator<Item = TextLine>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Post-processor completion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    /// Generated answer.
    pub text: String,
    /// Reasoning trace, when thinking mode was on and the model returned one.
    pub thinking: Option<String>,
}

impl Completion {
    /// Creates a completion without a reasoning trace.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            thinking: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retain_confident_drops_weak_and_blank_lines() {
        let text: RecognizedText = [
            TextLine::new("REPUBLIQUE DU CAMEROUN", 0.98),
            TextLine::new("   ", 0.9),
            TextLine::new("smudge", 0.12),
            TextLine::new("NOM/SURNAME", 0.3),
        ]
        .into_iter()
        .collect();

        let kept = text.retain_confident();
        assert_eq!(kept.lines.len(), 2);
        assert_eq!(kept.joined(), "REPUBLIQUE DU CAMEROUN NOM/SURNAME");
    }

    #[test]
    fn joined_trims_lines() {
        let text = RecognizedText::new(vec![
            TextLine::new(" NGONO ", 0.9),
            TextLine::new("MARIE\n", 0.9),
        ]);
        assert_eq!(text.joined(), "NGONO MARIE");
    }
}
