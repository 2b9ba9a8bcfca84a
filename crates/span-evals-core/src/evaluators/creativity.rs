//! Lexical variety as a creativity proxy.

use std::collections::HashSet;

use async_trait::async_trait;

use super::{EvalContext, Evaluator};
use crate::domain::{EvaluatorKind, Judgment};

pub const CREATIVITY: &str = "creativity";

/// Distinct tokens needed for a full score.
const FULL_SCORE_TOKENS: usize = 10;

/// Distinct lowercase whitespace-delimited tokens over ten, capped at 1.0.
pub fn creativity_score(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let distinct: HashSet<&str> = lower.split_whitespace().collect();
    (distinct.len() as f64 / FULL_SCORE_TOKENS as f64).min(1.0)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CreativityEvaluator;

#[async_trait]
impl Evaluator for CreativityEvaluator {
    fn name(&self) -> &'static str {
        "creativity"
    }

    async fn evaluate(&self, text: &str, _context: &EvalContext) -> Vec<Judgment> {
        let score = creativity_score(text);
        vec![Judgment::scored(
            CREATIVITY,
            score,
            format!("Unique words ratio: {:.1}%", score * 100.0),
            EvaluatorKind::Model,
        )
        .with_metadata("eval_type", "creativity")]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ten_distinct_tokens_score_one() {
        let text = "one two three four five six seven eight nine ten";
        assert_eq!(creativity_score(text), 1.0);
    }

    #[test]
    fn test_five_distinct_tokens_score_half() {
        assert_eq!(creativity_score("a b c d e"), 0.5);
    }

    #[test]
    fn test_case_and_repeats_collapse() {
        assert_eq!(creativity_score("Pond pond POND\nfrog  frog"), 0.2);
    }

    #[test]
    fn test_score_is_capped() {
        let text = (0..25).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
        assert_eq!(creativity_score(&text), 1.0);
    }

    #[test]
    fn test_empty_text_scores_zero() {
        assert_eq!(creativity_score(""), 0.0);
        assert_eq!(creativity_score("   \n\t"), 0.0);
    }

    #[tokio::test]
    async fn test_explanation_states_percentage() {
        let judgments = CreativityEvaluator
            .evaluate("a b c d e", &EvalContext::default())
            .await;
        assert_eq!(judgments.len(), 1);
        assert_eq!(judgments[0].explanation, "Unique words ratio: 50.0%");
        assert_eq!(judgments[0].score, Some(0.5));
    }
}
