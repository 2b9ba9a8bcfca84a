//! Domain-level error taxonomy for span-evals.

/// Errors produced by judgment invariant checks.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("judgment name must not be empty")]
    EmptyName,

    #[error("judgment {name} has an empty explanation")]
    EmptyExplanation { name: String },

    #[error("judgment {name} score {score} is outside [0, 1]")]
    ScoreOutOfRange { name: String, score: f64 },

    #[error("judgment {name} carries neither a score nor a label")]
    MissingOutcome { name: String },
}

/// Failures reported by the primary annotation channel.
///
/// The split between the two variants drives the sink's circuit breaker:
/// only `ChannelUnsupported` changes channel health.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnnotationError {
    /// The service cannot accept this request shape at all (missing endpoint,
    /// method not allowed, not implemented).
    #[error("annotation channel unsupported: {0}")]
    ChannelUnsupported(String),

    /// Any other per-record failure.
    #[error("annotation delivery failed: {0}")]
    TransientDelivery(String),
}

impl AnnotationError {
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::ChannelUnsupported(_))
    }
}

/// span-evals domain errors.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("generation failed: {0}")]
    Generation(String),

    #[error("evaluator contract violated: {0}")]
    EvaluatorContract(#[from] ValidationError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type for span-evals domain operations.
pub type Result<T> = std::result::Result<T, EvalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eval_error_display() {
        let err = EvalError::Generation("empty completion".to_string());
        assert!(err.to_string().contains("generation failed"));
        assert!(err.to_string().contains("empty completion"));

        let err = EvalError::Config("missing api key".to_string());
        assert!(err.to_string().contains("configuration error"));
    }

    #[test]
    fn test_validation_error_converts_to_contract_violation() {
        let err: EvalError = ValidationError::ScoreOutOfRange {
            name: "creativity".to_string(),
            score: 1.5,
        }
        .into();
        let msg = err.to_string();
        assert!(msg.contains("evaluator contract violated"));
        assert!(msg.contains("creativity"));
        assert!(msg.contains("1.5"));
    }

    #[test]
    fn test_annotation_error_classification() {
        assert!(AnnotationError::ChannelUnsupported("404".into()).is_unsupported());
        assert!(!AnnotationError::TransientDelivery("503".into()).is_unsupported());
    }
}
