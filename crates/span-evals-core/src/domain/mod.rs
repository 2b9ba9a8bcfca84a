//! Domain models for span-evals.
//!
//! Canonical definitions for the core entities:
//! - `Judgment`: one evaluator outcome for a piece of generated text
//! - `AnnotationRecord`: a judgment bound to a span for delivery
//! - `EvaluationRun`: one generation unit and its judgments
//! - `BatchReport`: aggregate over concurrent units

pub mod error;
pub mod judgment;
pub mod record;
pub mod run;

pub use error::{AnnotationError, EvalError, Result, ValidationError};
pub use judgment::{default_human_judgments, EvaluatorKind, Judgment};
pub use record::{AnnotationRecord, SpanId};
pub use run::{BatchReport, CaseFailure, EvaluationRun, TestCase, TokenUsage};
