//! Length-based quality heuristics.

use async_trait::async_trait;

use super::{EvalContext, Evaluator};
use crate::domain::{EvaluatorKind, Judgment};

pub const CONTENT_QUALITY: &str = "content_quality";
pub const LENGTH_APPROPRIATE: &str = "length_appropriate";

/// Texts longer than this many characters score high.
const QUALITY_MIN_CHARS: usize = 20;
/// Texts longer than this many characters are labelled appropriate.
const LENGTH_MIN_CHARS: usize = 15;

/// Emits a quality score and a length label. Length is measured in chars.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityEvaluator;

#[async_trait]
impl Evaluator for QualityEvaluator {
    fn name(&self) -> &'static str {
        "quality"
    }

    async fn evaluate(&self, text: &str, _context: &EvalContext) -> Vec<Judgment> {
        let length = text.chars().count();

        let (score, verdict) = if length > QUALITY_MIN_CHARS {
            (0.8, "High quality content")
        } else {
            (0.4, "Low quality content")
        };
        let label = if length > LENGTH_MIN_CHARS {
            "appropriate"
        } else {
            "too_short"
        };

        vec![
            Judgment::scored(
                CONTENT_QUALITY,
                score,
                format!("{} ({} characters)", verdict, length),
                EvaluatorKind::Model,
            )
            .with_metadata("eval_type", "quality"),
            Judgment::labeled(
                LENGTH_APPROPRIATE,
                label,
                format!("Content length: {} characters", length),
                EvaluatorKind::Model,
            )
            .with_metadata("eval_type", "quality"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn judge(len: usize) -> (f64, String) {
        let text = "x".repeat(len);
        let judgments = QualityEvaluator.evaluate(&text, &EvalContext::default()).await;
        assert_eq!(judgments.len(), 2);
        (
            judgments[0].score.expect("score"),
            judgments[1].label.clone().expect("label"),
        )
    }

    #[tokio::test]
    async fn test_boundary_at_twenty() {
        assert_eq!(judge(20).await.0, 0.4);
        assert_eq!(judge(21).await.0, 0.8);
    }

    #[tokio::test]
    async fn test_boundary_at_fifteen() {
        assert_eq!(judge(15).await.1, "too_short");
        assert_eq!(judge(16).await.1, "appropriate");
    }

    #[tokio::test]
    async fn test_length_21_and_15() {
        assert_eq!(judge(21).await, (0.8, "appropriate".to_string()));
        assert_eq!(judge(15).await, (0.4, "too_short".to_string()));
    }

    #[tokio::test]
    async fn test_explanations_cite_length() {
        let judgments = QualityEvaluator
            .evaluate("twelve chars", &EvalContext::default())
            .await;
        assert!(judgments[0].explanation.contains("12 characters"));
        assert_eq!(judgments[1].explanation, "Content length: 12 characters");
    }

    #[tokio::test]
    async fn test_counts_chars_not_bytes() {
        // 16 chars, 32 bytes
        let text = "é".repeat(16);
        let judgments = QualityEvaluator.evaluate(&text, &EvalContext::default()).await;
        assert_eq!(judgments[1].label.as_deref(), Some("appropriate"));
        assert_eq!(judgments[0].score, Some(0.4));
    }

    #[tokio::test]
    async fn test_empty_text() {
        let judgments = QualityEvaluator.evaluate("", &EvalContext::default()).await;
        assert_eq!(judgments[0].score, Some(0.4));
        assert_eq!(judgments[1].label.as_deref(), Some("too_short"));
    }
}
