//! Model-comparison experiments.
//!
//! Every prompt is sent to every variant concurrently. Each pair gets its own
//! `experiment.{name}` span tagged with the experiment and variant names.
//! An empty completion is recorded as a result with no content; only a
//! failed request is an error.

use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::backend::{SpanBackend, SpanStatus};
use crate::domain::{Result, SpanId, TokenUsage};
use crate::generation::GenerationService;
use crate::orchestrator::output_messages;

pub const DEFAULT_EXPERIMENT_NAME: &str = "model-comparison";

pub const DEFAULT_EXPERIMENT_PROMPTS: [&str; 3] = [
    "Write a creative haiku about the ocean",
    "Write a technical haiku about programming",
    "Write an emotional haiku about friendship",
];

/// A named model configuration under comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub name: String,
    pub model: String,
}

impl Variant {
    /// A variant named after its model.
    pub fn model(model: &str) -> Self {
        Self {
            name: model.to_string(),
            model: model.to_string(),
        }
    }

    pub fn defaults() -> Vec<Variant> {
        vec![Variant::model("gpt-4o"), Variant::model("gpt-3.5-turbo")]
    }
}

/// Outcome of one prompt × variant pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentResult {
    pub span_id: SpanId,
    pub variant: String,
    pub model: String,
    pub prompt: String,
    pub content: Option<String>,
    pub usage: Option<TokenUsage>,
}

pub struct ExperimentRunner {
    generator: Arc<dyn GenerationService>,
    backend: Arc<dyn SpanBackend>,
}

impl ExperimentRunner {
    pub fn new(generator: Arc<dyn GenerationService>, backend: Arc<dyn SpanBackend>) -> Self {
        Self { generator, backend }
    }

    /// Run all pairs concurrently; results come back prompt-major, in input order.
    pub async fn run(
        &self,
        experiment: &str,
        prompts: &[String],
        variants: &[Variant],
    ) -> Vec<Result<ExperimentResult>> {
        let pairs = prompts
            .iter()
            .flat_map(|prompt| variants.iter().map(move |variant| (prompt, variant)));

        let units = pairs.map(|(prompt, variant)| self.run_one(experiment, prompt, variant));
        let results = join_all(units).await;

        let failed = results.iter().filter(|r| r.is_err()).count();
        info!(
            event = "experiment.finished",
            experiment = %experiment,
            total = results.len(),
            failed = failed,
        );
        results
    }

    async fn run_one(
        &self,
        experiment: &str,
        prompt: &str,
        variant: &Variant,
    ) -> Result<ExperimentResult> {
        let span = self.backend.start_span(
            &format!("experiment.{}", experiment),
            &[
                ("phoenix.experiment.name", experiment.to_string()),
                ("phoenix.experiment.variant", variant.name.clone()),
                ("phoenix.dataset.name", experiment.to_string()),
            ],
        );

        let outcome = self.generator.complete(prompt, &variant.model).await;

        self.backend.set_attribute(&span, "llm.model_name", variant.model.clone());
        self.backend.set_attribute(&span, "llm.prompt", prompt.to_string());

        let result = match outcome {
            Ok(completion) => {
                let content = completion.usable_text().map(str::to_string);
                self.backend.set_attribute(
                    &span,
                    "llm.output_messages",
                    output_messages(content.as_deref()),
                );
                if let Some(usage) = completion.usage {
                    self.backend.set_attribute(
                        &span,
                        "llm.token_count.total",
                        usage.total_tokens.to_string(),
                    );
                }
                self.backend.set_status(&span, SpanStatus::Ok);
                Ok(ExperimentResult {
                    span_id: span.id.clone(),
                    variant: variant.name.clone(),
                    model: variant.model.clone(),
                    prompt: prompt.to_string(),
                    content,
                    usage: completion.usage,
                })
            }
            Err(e) => {
                warn!(variant = %variant.name, error = %e, "experiment request failed");
                self.backend.set_status(&span, SpanStatus::Error(e.to_string()));
                Err(e)
            }
        };

        self.backend.end(&span);
        result
    }
}
