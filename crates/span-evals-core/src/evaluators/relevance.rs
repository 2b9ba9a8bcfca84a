//! Theme relevance placeholder.
//!
//! Stands in for a model-graded relevance check: the score is drawn uniformly
//! from `[0.70, 1.00]` and carries no information about the text.

use async_trait::async_trait;
use rand::Rng;

use super::{EvalContext, Evaluator};
use crate::domain::{EvaluatorKind, Judgment};

pub const THEME_RELEVANCE: &str = "theme_relevance";

/// Inclusive range the placeholder score is drawn from.
pub const RELEVANCE_RANGE: std::ops::RangeInclusive<f64> = 0.70..=1.00;

#[derive(Debug, Clone, Copy, Default)]
pub struct RelevanceEvaluator;

#[async_trait]
impl Evaluator for RelevanceEvaluator {
    fn name(&self) -> &'static str {
        "relevance"
    }

    async fn evaluate(&self, _text: &str, context: &EvalContext) -> Vec<Judgment> {
        let theme = context.theme.as_deref().unwrap_or("unspecified");
        let score = rand::thread_rng().gen_range(RELEVANCE_RANGE);

        vec![Judgment::scored(
            THEME_RELEVANCE,
            score,
            format!("Content is relevant to theme: {}", theme),
            EvaluatorKind::Model,
        )
        .with_metadata("eval_type", "relevance")
        .with_metadata("theme", theme)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_score_stays_in_range() {
        let ctx = EvalContext::with_theme("nature");
        for _ in 0..200 {
            let judgments = RelevanceEvaluator.evaluate("anything", &ctx).await;
            assert_eq!(judgments.len(), 1);
            let score = judgments[0].score.expect("scored");
            assert!((0.70..=1.00).contains(&score), "score {}", score);
        }
    }

    #[tokio::test]
    async fn test_explanation_mentions_theme() {
        let judgments = RelevanceEvaluator
            .evaluate("", &EvalContext::with_theme("technology"))
            .await;
        assert!(judgments[0].explanation.contains("technology"));
        assert_eq!(judgments[0].metadata["eval_type"], "relevance");
        assert_eq!(judgments[0].evaluator_kind, EvaluatorKind::Model);
    }

    #[tokio::test]
    async fn test_missing_theme_still_judges() {
        let judgments = RelevanceEvaluator
            .evaluate("text", &EvalContext::default())
            .await;
        assert!(judgments[0].validate().is_ok());
    }
}
