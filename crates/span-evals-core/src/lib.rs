//! span-evals core library
//!
//! Scores generated text with automatic evaluators, attaches the judgments to
//! a trace span through an annotation service, and falls back to span
//! attributes once that service turns out to be unsupported.

pub mod annotation;
pub mod backend;
pub mod config;
pub mod domain;
pub mod evaluators;
pub mod experiment;
pub mod fakes;
pub mod generation;
pub mod metrics;
pub mod obs;
pub mod orchestrator;
pub mod report;
pub mod sink;
pub mod telemetry;

pub use domain::{
    default_human_judgments, AnnotationError, AnnotationRecord, BatchReport, CaseFailure,
    EvalError, EvaluationRun, EvaluatorKind, Judgment, Result, SpanId, TestCase, TokenUsage,
    ValidationError,
};

pub use annotation::{AnnotationService, HttpAnnotationClient};
pub use backend::{LogSpanBackend, SpanBackend, SpanHandle, SpanStatus};
pub use config::{AnnotationConfig, GenerationConfig, OrchestratorConfig};
pub use evaluators::{
    count_syllables, CreativityEvaluator, EvalContext, Evaluator, EvaluatorSet, HaikuAnalysis,
    HaikuStructureEvaluator, QualityEvaluator, RelevanceEvaluator,
};
pub use experiment::{ExperimentResult, ExperimentRunner, Variant};
pub use generation::{Completion, GenerationService, OpenAiGenerator};
pub use orchestrator::Orchestrator;
pub use report::{render_batch, render_experiment, render_run};
pub use sink::{AnnotationSink, DeliveryReport};

pub use metrics::METRICS;
pub use obs::{
    emit_annotation_dropped, emit_batch_finished, emit_channel_tripped, emit_generation_failed,
    emit_run_finished, emit_run_started, unit_span,
};
pub use telemetry::{init_tracing, LogFormat};

/// span-evals version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
