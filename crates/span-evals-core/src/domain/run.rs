//! Evaluation runs and batch aggregation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::judgment::Judgment;
use super::record::SpanId;

/// Token accounting reported by the generation service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// One prompt to generate from, with the theme used by the relevance check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub theme: String,
    pub prompt: String,
}

impl TestCase {
    pub fn new(theme: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            theme: theme.into(),
            prompt: prompt.into(),
        }
    }

    /// The two cases of the comprehensive example.
    pub fn defaults() -> Vec<TestCase> {
        vec![
            TestCase::new(
                "nature",
                "Write a beautiful haiku about nature's beauty in springtime.",
            ),
            TestCase::new(
                "technology",
                "Write a short poem about artificial intelligence and humanity.",
            ),
        ]
    }
}

/// One generation unit and the judgments produced for it.
///
/// Built once every evaluator has finished; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRun {
    pub span_id: SpanId,
    pub prompt: String,
    pub theme: String,
    pub model: String,
    pub content: String,
    /// Automatic judgments in evaluator declaration order.
    pub judgments: Vec<Judgment>,
    /// Human judgments delivered alongside, if any.
    pub human_judgments: Vec<Judgment>,
    pub usage: Option<TokenUsage>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl EvaluationRun {
    /// Look up an automatic judgment by name.
    pub fn judgment(&self, name: &str) -> Option<&Judgment> {
        self.judgments.iter().find(|j| j.name == name)
    }

    pub fn duration_ms(&self) -> u64 {
        (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64
    }
}

/// A unit of work that did not produce a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseFailure {
    pub case: TestCase,
    pub error: String,
}

/// Aggregate over a batch of concurrently executed units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub runs: Vec<EvaluationRun>,
    pub failures: Vec<CaseFailure>,
    /// Mean score per judgment name across successful runs.
    pub mean_scores: BTreeMap<String, f64>,
    /// Label tallies per judgment name.
    pub label_counts: BTreeMap<String, BTreeMap<String, usize>>,
}

impl BatchReport {
    pub fn new(runs: Vec<EvaluationRun>, failures: Vec<CaseFailure>) -> Self {
        let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        let mut label_counts: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();

        for judgment in runs
            .iter()
            .flat_map(|r| r.judgments.iter().chain(r.human_judgments.iter()))
        {
            if let Some(score) = judgment.score {
                let entry = sums.entry(judgment.name.clone()).or_insert((0.0, 0));
                entry.0 += score;
                entry.1 += 1;
            }
            if let Some(label) = &judgment.label {
                *label_counts
                    .entry(judgment.name.clone())
                    .or_default()
                    .entry(label.clone())
                    .or_insert(0) += 1;
            }
        }

        let mean_scores = sums
            .into_iter()
            .map(|(name, (sum, n))| (name, sum / n as f64))
            .collect();

        Self {
            runs,
            failures,
            mean_scores,
            label_counts,
        }
    }

    pub fn total(&self) -> usize {
        self.runs.len() + self.failures.len()
    }
}
