//! OCR quality gate.
//!
//! Recognition output that is too sparse or too uncertain produces
//! hallucinated fields downstream, so it is rejected before the language
//! model is consulted. The gate looks at the raw recognizer scores, before
//! low-confidence lines are dropped.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::request::{DocumentSide, DocumentVersion};
use crate::worker::RecognizedText;

/// Lines above this score count as good quality.
const GOOD_LINE_SCORE: f32 = 0.7;

/// Minimum quality a recognition result must reach.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityGate {
    /// Minimum number of lines with a positive score.
    pub min_lines: usize,
    /// Minimum mean of positive scores.
    pub min_mean_score: f32,
    /// Minimum number of lines scoring above 0.7.
    pub min_good_lines: usize,
}

impl Default for QualityGate {
    fn default() -> Self {
        Self {
            min_lines: 8,
            min_mean_score: 0.5,
            min_good_lines: 5,
        }
    }
}

impl QualityGate {
    /// Returns the thresholds tuned for a card version and side.
    ///
    /// Backs carry less text than fronts, so they need fewer lines.
    pub fn for_document(version: DocumentVersion, side: DocumentSide) -> Self {
        let (min_lines, min_good_lines) = match (version, side) {
            (_, DocumentSide::Recto) => (8, 5),
            (DocumentVersion::V2018, DocumentSide::Verso) => (5, 3),
            (DocumentVersion::V2025, DocumentSide::Verso) => (6, 4),
        };

        Self {
            min_lines,
            min_good_lines,
            ..Self::default()
        }
    }

    /// Measures the recognition output without judging it.
    pub fn assess(&self, text: &RecognizedText) -> QualityReport {
        let valid: Vec<f32> = text
            .lines
            .iter()
            .map(|line| line.score)
            .filter(|score| *score > 0.0)
            .collect();

        let mean_score = if valid.is_empty() {
            0.0
        } else {
            valid.iter().sum::<f32>() / valid.len() as f32
        };

        let good_lines = text
            .lines
            .iter()
            .filter(|line| line.score > GOOD_LINE_SCORE)
            .count();

        let passed = valid.len() >= self.min_lines
            && mean_score >= self.min_mean_score
            && good_lines >= self.min_good_lines;

        QualityReport {
            valid_lines: valid.len(),
            good_lines,
            mean_score,
            passed,
        }
    }

    /// Rejects recognition output below the thresholds.
    pub fn check(&self, text: &RecognizedText) -> Result<QualityReport> {
        let report = self.assess(text);
        if report.passed {
            return Ok(report);
        }

        Err(Error::inference_failure(format!(
            "insufficient OCR quality: {} lines (min {}), mean score {:.2} (min {:.2}), \
             {} good lines (min {})",
            report.valid_lines,
            self.min_lines,
            report.mean_score,
            self.min_mean_score,
            report.good_lines,
            self.min_good_lines,
        )))
    }
}

/// Measurements taken by [`QualityGate::assess`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    /// Lines with a positive score.
    pub valid_lines: usize,
    /// Lines scoring above 0.7.
    pub good_lines: usize,
    /// Mean of positive scores.
    pub mean_score: f32,
    /// Whether every threshold was met.
    pub passed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCode;
    use crate::worker::TextLine;

    fn lines(scores: &[f32]) -> RecognizedText {
        scores
            .iter()
            .enumerate()
            .map(|(i, score)| TextLine::new(format!("line {i}"), *score))
            .collect()
    }

    #[test]
    fn passes_clear_front_side() {
        let text = lines(&[0.95, 0.9, 0.88, 0.92, 0.81, 0.6, 0.55, 0.5]);
        let gate = QualityGate::for_document(DocumentVersion::V2018, DocumentSide::Recto);

        let report = gate.check(&text).unwrap();
        assert_eq!(report.valid_lines, 8);
        assert_eq!(report.good_lines, 5);
    }

    #[test]
    fn rejects_too_few_lines() {
        let text = lines(&[0.99, 0.99, 0.99, 0.99, 0.99, 0.99, 0.99]);
        let gate = QualityGate::default();

        let error = gate.check(&text).unwrap_err();
        assert_eq!(error.code(), ErrorCode::InferenceFailure);
        assert!(error.message().starts_with("insufficient OCR quality"));
    }

    #[test]
    fn rejects_low_mean_score() {
        let text = lines(&[0.9, 0.9, 0.9, 0.9, 0.9, 0.05, 0.05, 0.05, 0.05, 0.05, 0.05]);
        let report = QualityGate::default().assess(&text);

        assert!(report.mean_score < 0.5);
        assert!(!report.passed);
    }

    #[test]
    fn zero_scores_do_not_count() {
        let text = lines(&[0.0, 0.0, 0.9, 0.9, 0.9]);
        let report = QualityGate::default().assess(&text);

        assert_eq!(report.valid_lines, 3);
        assert!((report.mean_score - 0.9).abs() < 1e-5);
    }

    #[test]
    fn back_sides_need_fewer_lines() {
        let text = lines(&[0.9, 0.9, 0.9, 0.6, 0.6]);

        let verso = QualityGate::for_document(DocumentVersion::V2018, DocumentSide::Verso);
        assert!(verso.assess(&text).passed);

        let recto = QualityGate::for_document(DocumentVersion::V2018, DocumentSide::Recto);
        assert!(!recto.assess(&text).passed);
    }

    #[test]
    fn empty_output_fails() {
        assert!(!QualityGate::default().assess(&RecognizedText::default()).passed);
    }
}
