//! Structured observability hooks for evaluation lifecycle events.
//!
//! This module provides:
//! - The `tracing` span wrapping one unit of work ([`unit_span`])
//! - Emission functions for key lifecycle events: run start/finish,
//!   generation failure, annotation drops, channel fallback, batch completion
//!
//! Events are emitted at `info!` (failures at `warn!`), filterable through
//! `SPAN_EVALS_LOG` / `RUST_LOG`.

use tracing::{info, warn};

/// Span for one generate-evaluate-annotate unit. Attach it with
/// `tracing::Instrument` so it follows the future across await points.
pub fn unit_span(theme: &str, model: &str) -> tracing::Span {
    tracing::info_span!("span_evals.unit", theme = %theme, model = %model)
}

/// Emit event: unit of work started and its trace span opened.
pub fn emit_run_started(span_id: &str, theme: &str, model: &str) {
    info!(event = "run.started", span_id = %span_id, theme = %theme, model = %model);
}

/// Emit event: unit of work finished.
pub fn emit_run_finished(span_id: &str, duration_ms: u64, judgments: usize, success: bool) {
    info!(
        event = "run.finished",
        span_id = %span_id,
        duration_ms = duration_ms,
        judgments = judgments,
        success = success,
    );
}

/// Emit event: generation produced no usable text (warning level).
pub fn emit_generation_failed(span_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "run.generation_failed", span_id = %span_id, error = %error);
}

/// Emit event: one annotation record lost to a transient failure.
pub fn emit_annotation_dropped(span_id: &str, identifier: &str, error: &dyn std::fmt::Display) {
    warn!(
        event = "annotation.dropped",
        span_id = %span_id,
        identifier = %identifier,
        error = %error,
    );
}

/// Emit event: primary annotation channel is unsupported; span attributes from now on.
pub fn emit_channel_tripped(span_id: &str, error: &dyn std::fmt::Display) {
    warn!(
        event = "annotation.channel_tripped",
        span_id = %span_id,
        error = %error,
        "primary annotation channel unavailable, falling back to span attributes"
    );
}

/// Emit event: a batch of concurrent units completed.
pub fn emit_batch_finished(total: usize, succeeded: usize, failed: usize) {
    info!(
        event = "batch.finished",
        total = total,
        succeeded = succeeded,
        failed = failed,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn test_channel_tripped_is_a_warning() {
        emit_channel_tripped("abc123", &"404 Not Found");
        assert!(logs_contain("annotation.channel_tripped"));
        assert!(logs_contain("404 Not Found"));
    }

    #[traced_test]
    #[test]
    fn test_unit_span_carries_theme() {
        let span = unit_span("nature", "gpt-4o");
        let _entered = span.enter();
        emit_run_started("abc123", "nature", "gpt-4o");
        assert!(logs_contain("run.started"));
        assert!(logs_contain("nature"));
    }
}
