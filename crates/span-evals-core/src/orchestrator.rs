//! Generation + evaluation orchestration.
//!
//! One unit of work: open a trace span, generate text, run the automatic
//! evaluators and the haiku structure check concurrently, hand the judgments
//! to the [`AnnotationSink`], close the span. The span is ended on every path,
//! success or failure.
//!
//! Units share nothing mutable except the sink's channel-health flag, so a
//! batch is simply the units joined concurrently.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde_json::json;
use tracing::Instrument;

use crate::backend::{SpanBackend, SpanHandle, SpanStatus};
use crate::config::OrchestratorConfig;
use crate::domain::{
    BatchReport, CaseFailure, EvalError, EvaluationRun, EvaluatorKind, Judgment, Result, TestCase,
};
use crate::evaluators::{EvalContext, Evaluator, EvaluatorSet, HaikuStructureEvaluator};
use crate::generation::GenerationService;
use crate::metrics::METRICS;
use crate::obs::{
    emit_batch_finished, emit_generation_failed, emit_run_finished, emit_run_started, unit_span,
};
use crate::sink::AnnotationSink;

/// Name of the span opened for each unit of work.
pub const GENERATION_SPAN: &str = "llm.generation";

/// `llm.output_messages` attribute value for an assistant reply. Missing
/// content serializes as `null`.
pub fn output_messages(content: Option<&str>) -> String {
    json!([{ "role": "assistant", "content": content }]).to_string()
}

/// `openinference.annotations` summary attribute value.
fn annotations_summary(judgments: &[Judgment]) -> String {
    let entries: Vec<_> = judgments
        .iter()
        .map(|j| {
            json!({
                "name": j.name,
                "score": j.score,
                "label": j.label,
                "explanation": j.explanation,
                "metadata": j.metadata,
            })
        })
        .collect();
    serde_json::Value::Array(entries).to_string()
}

/// Drives generate → evaluate → annotate for one or many prompts.
pub struct Orchestrator {
    generator: Arc<dyn GenerationService>,
    backend: Arc<dyn SpanBackend>,
    sink: Arc<AnnotationSink>,
    evaluators: EvaluatorSet,
    structural: HaikuStructureEvaluator,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        generator: Arc<dyn GenerationService>,
        backend: Arc<dyn SpanBackend>,
        sink: Arc<AnnotationSink>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            generator,
            backend,
            sink,
            evaluators: EvaluatorSet::standard(),
            structural: HaikuStructureEvaluator::new(),
            config,
        }
    }

    /// Replace the automatic evaluator set.
    pub fn with_evaluators(mut self, evaluators: EvaluatorSet) -> Self {
        self.evaluators = evaluators;
        self
    }

    pub fn sink(&self) -> &AnnotationSink {
        &self.sink
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run one unit of work for `prompt`, judging relevance against `theme`.
    pub async fn run(&self, prompt: &str, theme: &str) -> Result<EvaluationRun> {
        self.run_unit(prompt, theme)
            .instrument(unit_span(theme, &self.config.model))
            .await
    }

    /// Run every case concurrently and aggregate the outcomes.
    pub async fn run_batch(&self, cases: &[TestCase]) -> BatchReport {
        let units = cases.iter().map(|c| self.run(&c.prompt, &c.theme));
        let outcomes = join_all(units).await;

        let mut runs = Vec::new();
        let mut failures = Vec::new();
        for (case, outcome) in cases.iter().zip(outcomes) {
            match outcome {
                Ok(run) => runs.push(run),
                Err(e) => failures.push(CaseFailure {
                    case: case.clone(),
                    error: e.to_string(),
                }),
            }
        }

        emit_batch_finished(cases.len(), runs.len(), failures.len());
        BatchReport::new(runs, failures)
    }

    async fn run_unit(&self, prompt: &str, theme: &str) -> Result<EvaluationRun> {
        let started_at = Utc::now();
        let span = self.backend.start_span(
            GENERATION_SPAN,
            &[
                ("phoenix.dataset.name", self.config.dataset_name.clone()),
                ("theme", theme.to_string()),
                ("llm.model_name", self.config.model.clone()),
                ("llm.prompt", prompt.to_string()),
            ],
        );
        emit_run_started(span.id.as_str(), theme, &self.config.model);

        let outcome = self
            .generate_and_evaluate(&span, prompt, theme, started_at)
            .await;

        let (judgments, success) = match &outcome {
            Ok(run) => {
                self.backend.set_status(&span, SpanStatus::Ok);
                METRICS.inc_runs_completed();
                (run.judgments.len(), true)
            }
            Err(e) => {
                self.backend.set_status(&span, SpanStatus::Error(e.to_string()));
                METRICS.inc_runs_failed();
                (0, false)
            }
        };
        self.backend.end(&span);

        let duration_ms = (Utc::now() - started_at).num_milliseconds().max(0) as u64;
        emit_run_finished(span.id.as_str(), duration_ms, judgments, success);

        outcome
    }

    async fn generate_and_evaluate(
        &self,
        span: &SpanHandle,
        prompt: &str,
        theme: &str,
        started_at: DateTime<Utc>,
    ) -> Result<EvaluationRun> {
        let model = &self.config.model;

        let completion = match self.generator.complete(prompt, model).await {
            Ok(completion) => completion,
            Err(e) => {
                emit_generation_failed(span.id.as_str(), &e);
                return Err(match e {
                    EvalError::Generation(_) => e,
                    other => EvalError::Generation(other.to_string()),
                });
            }
        };

        let content = match completion.usable_text() {
            Some(text) => text.to_string(),
            None => {
                let err = EvalError::Generation(format!("model {} returned no content", model));
                emit_generation_failed(span.id.as_str(), &err);
                return Err(err);
            }
        };

        let messages = output_messages(Some(&content));
        self.backend.set_attribute(span, "llm.output_messages", messages);
        if let Some(usage) = completion.usage {
            self.backend.set_attribute(
                span,
                "llm.token_count.prompt",
                usage.prompt_tokens.to_string(),
            );
            self.backend.set_attribute(
                span,
                "llm.token_count.completion",
                usage.completion_tokens.to_string(),
            );
            self.backend.set_attribute(
                span,
                "llm.token_count.total",
                usage.total_tokens.to_string(),
            );
        }

        let context = EvalContext::with_theme(theme);
        let (mut judgments, structural) = tokio::join!(
            self.evaluators.evaluate(&content, &context),
            self.structural.evaluate(&content, &context),
        );
        judgments.extend(structural);

        for judgment in judgments.iter().chain(&self.config.human_judgments) {
            judgment.validate()?;
        }

        self.backend.set_attribute(
            span,
            "openinference.annotations",
            annotations_summary(&judgments),
        );

        self.sink.deliver(span, &judgments, EvaluatorKind::Model).await;

        let human_judgments = self.config.human_judgments.clone();
        if !human_judgments.is_empty() {
            self.sink.deliver(span, &human_judgments, EvaluatorKind::Human).await;
        }

        Ok(EvaluationRun {
            span_id: span.id.clone(),
            prompt: prompt.to_string(),
            theme: theme.to_string(),
            model: model.clone(),
            content,
            judgments,
            human_judgments,
            usage: completion.usage,
            started_at,
            finished_at: Utc::now(),
        })
    }
}
