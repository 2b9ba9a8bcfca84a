//! Judgments: the scored outcome of one evaluator run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::ValidationError;

/// Who (or what) produced a judgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluatorKind {
    /// A model-backed or model-standing-in evaluator.
    Model,
    /// A person.
    Human,
    /// A deterministic rule.
    Rule,
}

impl EvaluatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Human => "human",
            Self::Rule => "rule",
        }
    }

    /// Annotator kind as understood by the remote annotation service.
    pub fn annotator_kind(&self) -> &'static str {
        match self {
            Self::Model => "LLM",
            Self::Human => "HUMAN",
            Self::Rule => "CODE",
        }
    }
}

impl std::fmt::Display for EvaluatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single named evaluation outcome for one piece of generated text.
///
/// Each judgment carries a score, a label, or both. `metadata` is an ordered
/// map so the serialized form is stable across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Judgment {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub explanation: String,
    pub evaluator_kind: EvaluatorKind,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Judgment {
    /// Create a scored judgment.
    pub fn scored(
        name: impl Into<String>,
        score: f64,
        explanation: impl Into<String>,
        kind: EvaluatorKind,
    ) -> Self {
        Self {
            name: name.into(),
            score: Some(score),
            label: None,
            explanation: explanation.into(),
            evaluator_kind: kind,
            metadata: BTreeMap::new(),
        }
    }

    /// Create a labeled judgment.
    pub fn labeled(
        name: impl Into<String>,
        label: impl Into<String>,
        explanation: impl Into<String>,
        kind: EvaluatorKind,
    ) -> Self {
        Self {
            name: name.into(),
            score: None,
            label: Some(label.into()),
            explanation: explanation.into(),
            evaluator_kind: kind,
            metadata: BTreeMap::new(),
        }
    }

    /// Attach a label to a scored judgment.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Add a metadata entry.
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Check the judgment invariants: non-empty name and explanation, a score
    /// or label present, and any score finite and within `[0, 1]`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.explanation.trim().is_empty() {
            return Err(ValidationError::EmptyExplanation {
                name: self.name.clone(),
            });
        }
        if self.score.is_none() && self.label.is_none() {
            return Err(ValidationError::MissingOutcome {
                name: self.name.clone(),
            });
        }
        if let Some(score) = self.score {
            if !(0.0..=1.0).contains(&score) {
                return Err(ValidationError::ScoreOutOfRange {
                    name: self.name.clone(),
                    score,
                });
            }
        }
        Ok(())
    }
}

/// The fixed human review batch attached to every run by default.
pub fn default_human_judgments() -> Vec<Judgment> {
    vec![
        Judgment::scored(
            "human_quality_score",
            0.85,
            "Good overall quality",
            EvaluatorKind::Human,
        ),
        Judgment::labeled(
            "human_approval",
            "approved",
            "Meets content guidelines",
            EvaluatorKind::Human,
        ),
    ]
}
