//! Plain-text rendering of runs, batches and experiments for console output.

use std::fmt::Write as _;

use crate::domain::{BatchReport, EvaluationRun, Judgment};
use crate::experiment::ExperimentResult;

fn judgment_line(judgment: &Judgment) -> String {
    let outcome = match (judgment.score, &judgment.label) {
        (Some(score), _) => format!("{:.2}", score),
        (None, Some(label)) => label.clone(),
        (None, None) => "-".to_string(),
    };
    format!("  ✅ {}: {} - {}", judgment.name, outcome, judgment.explanation)
}

/// Render one run: theme, content, and every judgment.
pub fn render_run(index: usize, run: &EvaluationRun) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "--- Test Case {} ---", index + 1);
    let _ = writeln!(out, "Theme: {}", run.theme);
    let _ = writeln!(out, "Span: {}", run.span_id);
    let _ = writeln!(out, "Content: {}", run.content);
    out.push_str("Automatic Evaluations:\n");
    for judgment in &run.judgments {
        out.push_str(&judgment_line(judgment));
        out.push('\n');
    }
    if !run.human_judgments.is_empty() {
        out.push_str("Human Evaluations:\n");
        for judgment in &run.human_judgments {
            out.push_str(&judgment_line(judgment));
            out.push('\n');
        }
    }
    out
}

/// Render a whole batch followed by its aggregate section.
pub fn render_batch(report: &BatchReport) -> String {
    let mut out = String::from("=== COMPREHENSIVE EVALUATIONS ===\n");
    for (index, run) in report.runs.iter().enumerate() {
        out.push('\n');
        out.push_str(&render_run(index, run));
    }
    for failure in &report.failures {
        let _ = writeln!(
            out,
            "\n--- Failed: {} ---\n  ❌ {}",
            failure.case.theme, failure.error
        );
    }

    let _ = writeln!(
        out,
        "\n=== SUMMARY: {}/{} succeeded ===",
        report.runs.len(),
        report.total()
    );
    for (name, mean) in &report.mean_scores {
        let _ = writeln!(out, "  {}: mean {:.2}", name, mean);
    }
    for (name, labels) in &report.label_counts {
        let tally: Vec<String> = labels.iter().map(|(l, n)| format!("{}={}", l, n)).collect();
        let _ = writeln!(out, "  {}: {}", name, tally.join(", "));
    }
    out
}

/// Render experiment results in request order.
pub fn render_experiment(results: &[ExperimentResult]) -> String {
    let mut out = String::from("Experiment Results:\n");
    for result in results {
        let _ = writeln!(out, "Variant: {}", result.variant);
        let _ = writeln!(out, "Prompt: {}", result.prompt);
        let _ = writeln!(
            out,
            "Response: {}",
            result.content.as_deref().unwrap_or("<no content>")
        );
        match result.usage {
            Some(usage) => {
                let _ = writeln!(out, "Tokens: {}", usage.total_tokens);
            }
            None => out.push_str("Tokens: n/a\n"),
        }
        out.push_str("---\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CaseFailure, EvaluatorKind, SpanId, TestCase, TokenUsage};
    use chrono::Utc;

    fn sample_run() -> EvaluationRun {
        EvaluationRun {
            span_id: SpanId("00f067aa0ba902b7".into()),
            prompt: "Write a haiku.".into(),
            theme: "nature".into(),
            model: "gpt-4o".into(),
            content: "An old silent pond".into(),
            judgments: vec![
                Judgment::scored(
                    "content_quality",
                    0.4,
                    "Low quality content (18 characters)",
                    EvaluatorKind::Model,
                ),
                Judgment::labeled(
                    "length_appropriate",
                    "appropriate",
                    "Content length: 18 characters",
                    EvaluatorKind::Model,
                ),
            ],
            human_judgments: vec![Judgment::labeled(
                "human_approval",
                "approved",
                "Meets content guidelines",
                EvaluatorKind::Human,
            )],
            usage: None,
            started_at: Utc::now(),
            finished_at: Utc::now(),
        }
    }

    #[test]
    fn test_render_run_prefers_score_then_label() {
        let text = render_run(0, &sample_run());
        assert!(text.starts_with("--- Test Case 1 ---"));
        assert!(text.contains("✅ content_quality: 0.40 - Low quality content"));
        assert!(text.contains("✅ length_appropriate: appropriate - Content length: 18"));
        assert!(text.contains("Human Evaluations:"));
    }

    #[test]
    fn test_render_batch_includes_failures_and_summary() {
        let failure = CaseFailure {
            case: TestCase::new("technology", "p"),
            error: "generation failed: model gpt-4o returned no content".into(),
        };
        let report = BatchReport::new(vec![sample_run()], vec![failure]);
        let text = render_batch(&report);

        assert!(text.contains("=== COMPREHENSIVE EVALUATIONS ==="));
        assert!(text.contains("Failed: technology"));
        assert!(text.contains("1/2 succeeded"));
        assert!(text.contains("content_quality: mean 0.40"));
        assert!(text.contains("length_appropriate: appropriate=1"));
    }

    #[test]
    fn test_render_experiment() {
        let results = vec![ExperimentResult {
            span_id: SpanId::new(),
            variant: "gpt-4o".into(),
            model: "gpt-4o".into(),
            prompt: "Write a creative haiku about the ocean".into(),
            content: None,
            usage: Some(TokenUsage {
                prompt_tokens: 1,
                completion_tokens: 2,
                total_tokens: 3,
            }),
        }];
        let text = render_experiment(&results);
        assert!(text.contains("Variant: gpt-4o"));
        assert!(text.contains("<no content>"));
        assert!(text.contains("Tokens: 3"));
    }
}
