//! Automatic evaluators for generated text.
//!
//! Every evaluator is side-effect free and must return judgments for any
//! well-formed input, the empty string included. [`EvaluatorSet`] fans the
//! text out to its members concurrently and concatenates the results in
//! declaration order so reports are stable regardless of completion order.

pub mod creativity;
pub mod haiku;
pub mod quality;
pub mod relevance;

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;

use crate::domain::Judgment;

pub use creativity::CreativityEvaluator;
pub use haiku::{count_syllables, HaikuAnalysis, HaikuStructureEvaluator};
pub use quality::QualityEvaluator;
pub use relevance::RelevanceEvaluator;

/// Optional inputs an evaluator may consult besides the text itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvalContext {
    pub theme: Option<String>,
}

impl EvalContext {
    pub fn with_theme(theme: impl Into<String>) -> Self {
        Self {
            theme: Some(theme.into()),
        }
    }
}

/// A single automatic check.
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Stable name used in logs.
    fn name(&self) -> &'static str;

    /// Judge `text`. Must not panic on well-formed input.
    async fn evaluate(&self, text: &str, context: &EvalContext) -> Vec<Judgment>;
}

/// An ordered collection of evaluators run as one fan-out/fan-in step.
#[derive(Clone, Default)]
pub struct EvaluatorSet {
    evaluators: Vec<Arc<dyn Evaluator>>,
}

impl EvaluatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Relevance, quality, creativity, in that order.
    pub fn standard() -> Self {
        Self::new()
            .with(RelevanceEvaluator)
            .with(QualityEvaluator)
            .with(CreativityEvaluator)
    }

    pub fn with(mut self, evaluator: impl Evaluator + 'static) -> Self {
        self.evaluators.push(Arc::new(evaluator));
        self
    }

    pub fn len(&self) -> usize {
        self.evaluators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.evaluators.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.evaluators.iter().map(|e| e.name()).collect()
    }

    /// Run every evaluator concurrently and flatten in declaration order.
    pub async fn evaluate(&self, text: &str, context: &EvalContext) -> Vec<Judgment> {
        let pending = self
            .evaluators
            .iter()
            .map(|evaluator| evaluator.evaluate(text, context));

        join_all(pending).await.into_iter().flatten().collect()
    }
}

impl std::fmt::Debug for EvaluatorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluatorSet")
            .field("evaluators", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EvaluatorKind;
    use std::time::Duration;

    /// Finishes after a delay so completion order differs from declaration order.
    struct Delayed {
        name: &'static str,
        delay_ms: u64,
    }

    #[async_trait]
    impl Evaluator for Delayed {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn evaluate(&self, _text: &str, _context: &EvalContext) -> Vec<Judgment> {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            vec![Judgment::scored(self.name, 1.0, "done", EvaluatorKind::Rule)]
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_follow_declaration_order() {
        let set = EvaluatorSet::new()
            .with(Delayed {
                name: "slow",
                delay_ms: 50,
            })
            .with(Delayed {
                name: "fast",
                delay_ms: 1,
            });

        let judgments = set.evaluate("text", &EvalContext::default()).await;
        let names: Vec<_> = judgments.iter().map(|j| j.name.as_str()).collect();
        assert_eq!(names, vec!["slow", "fast"]);
    }

    #[tokio::test]
    async fn test_standard_set_order() {
        let set = EvaluatorSet::standard();
        assert_eq!(set.names(), vec!["relevance", "quality", "creativity"]);

        let judgments = set
            .evaluate("a short poem", &EvalContext::with_theme("nature"))
            .await;
        let names: Vec<_> = judgments.iter().map(|j| j.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "theme_relevance",
                "content_quality",
                "length_appropriate",
                "creativity"
            ]
        );
    }

    #[tokio::test]
    async fn test_standard_set_handles_empty_text() {
        let judgments = EvaluatorSet::standard()
            .evaluate("", &EvalContext::default())
            .await;
        assert_eq!(judgments.len(), 4);
        assert!(judgments.iter().all(|j| j.validate().is_ok()));
    }

    #[tokio::test]
    async fn test_empty_set_yields_nothing() {
        let set = EvaluatorSet::new();
        assert!(set.is_empty());
        assert!(set.evaluate("x", &EvalContext::default()).await.is_empty());
    }
}
