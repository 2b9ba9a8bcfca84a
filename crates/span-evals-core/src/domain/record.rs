//! Annotation records: judgments bound to a span for delivery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::judgment::{EvaluatorKind, Judgment};

/// Identifier of a span in the tracing backend (16 lowercase hex chars).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpanId(pub String);

impl SpanId {
    /// Generate a new random span id.
    pub fn new() -> Self {
        let simple = Uuid::new_v4().simple().to_string();
        SpanId(simple[..16].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SpanId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SpanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A judgment packaged for the annotation service.
///
/// `identifier` is `{name}-{unix_millis}-{suffix}`; the service treats it as an
/// upsert key so a record is stored at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub identifier: String,
    pub span_id: SpanId,
    pub annotator_kind: EvaluatorKind,
    pub judgment: Judgment,
    pub created_at: DateTime<Utc>,
}

impl AnnotationRecord {
    pub fn new(span_id: SpanId, judgment: Judgment, annotator_kind: EvaluatorKind) -> Self {
        let created_at = Utc::now();
        let suffix = Uuid::new_v4().simple().to_string();
        let identifier = format!(
            "{}-{}-{}",
            judgment.name,
            created_at.timestamp_millis(),
            &suffix[..8]
        );
        Self {
            identifier,
            span_id,
            annotator_kind,
            judgment,
            created_at,
        }
    }

    /// Request body entry for the span annotation endpoint.
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "span_id": self.span_id.as_str(),
            "name": self.judgment.name,
            "annotator_kind": self.annotator_kind.annotator_kind(),
            "result": {
                "label": self.judgment.label,
                "score": self.judgment.score,
                "explanation": self.judgment.explanation,
            },
            "metadata": self.judgment.metadata,
            "identifier": self.identifier,
        })
    }
}
