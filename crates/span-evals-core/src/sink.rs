//! Annotation sink with a one-way fallback to span attributes.
//!
//! Records go to the primary [`AnnotationService`] one at a time, in order.
//! The first `ChannelUnsupported` failure trips the sink for the rest of the
//! process: that record and every later one (in this call and all future
//! calls) are written onto the span as `eval.{name}` attributes instead.
//! Transient failures drop the single record and leave health untouched.
//!
//! Health is a field of the sink instance, not a global, so independently
//! constructed sinks never influence each other. Concurrent units sharing a
//! sink may both observe "healthy" and both trip it; the flag only ever moves
//! to `false`, so the race is harmless.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::annotation::AnnotationService;
use crate::backend::{SpanBackend, SpanHandle};
use crate::domain::{AnnotationError, AnnotationRecord, EvaluatorKind, Judgment};
use crate::metrics::METRICS;
use crate::obs::{emit_annotation_dropped, emit_channel_tripped};

/// Prefix of fallback span attribute keys.
pub const FALLBACK_ATTRIBUTE_PREFIX: &str = "eval.";

/// Outcome counts of one `deliver` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    /// Accepted by the annotation service.
    pub primary: usize,
    /// Written as span attributes.
    pub fallback: usize,
    /// Lost to transient failures.
    pub dropped: usize,
}

impl DeliveryReport {
    pub fn total(&self) -> usize {
        self.primary + self.fallback + self.dropped
    }
}

/// Serialized value of a fallback attribute.
#[derive(Debug, Serialize)]
struct FallbackValue<'a> {
    score: Option<f64>,
    label: Option<&'a str>,
    explanation: &'a str,
    evaluator_kind: EvaluatorKind,
    annotator_kind: &'static str,
    metadata: &'a std::collections::BTreeMap<String, serde_json::Value>,
}

/// Fallback attribute key for a judgment.
pub fn fallback_key(judgment: &Judgment) -> String {
    format!("{}{}", FALLBACK_ATTRIBUTE_PREFIX, judgment.name)
}

/// Delivers judgments for a span, degrading to span attributes.
pub struct AnnotationSink {
    service: Arc<dyn AnnotationService>,
    backend: Arc<dyn SpanBackend>,
    primary_healthy: AtomicBool,
}

impl AnnotationSink {
    pub fn new(service: Arc<dyn AnnotationService>, backend: Arc<dyn SpanBackend>) -> Self {
        Self {
            service,
            backend,
            primary_healthy: AtomicBool::new(true),
        }
    }

    /// Whether records still go to the primary channel.
    pub fn is_primary_healthy(&self) -> bool {
        self.primary_healthy.load(Ordering::SeqCst)
    }

    fn trip(&self, span: &SpanHandle, error: &AnnotationError) {
        if self.primary_healthy.swap(false, Ordering::SeqCst) {
            emit_channel_tripped(span.id.as_str(), error);
        }
    }

    /// Deliver `judgments` for `span`, tagged with `kind`.
    ///
    /// Never fails; problems are logged and reflected in the returned counts.
    pub async fn deliver(
        &self,
        span: &SpanHandle,
        judgments: &[Judgment],
        kind: EvaluatorKind,
    ) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        let mut fallback_from = 0;

        if self.is_primary_healthy() {
            fallback_from = judgments.len();
            for (index, judgment) in judgments.iter().enumerate() {
                let record = AnnotationRecord::new(span.id.clone(), judgment.clone(), kind);
                match self.service.submit(&record).await {
                    Ok(()) => {
                        report.primary += 1;
                        METRICS.inc_annotations_delivered();
                    }
                    Err(error) if error.is_unsupported() => {
                        self.trip(span, &error);
                        fallback_from = index;
                        break;
                    }
                    Err(error) => {
                        report.dropped += 1;
                        METRICS.inc_annotations_dropped();
                        emit_annotation_dropped(span.id.as_str(), &record.identifier, &error);
                    }
                }
            }
        }

        for judgment in &judgments[fallback_from..] {
            self.write_fallback(span, judgment, kind);
            report.fallback += 1;
            METRICS.inc_annotations_fallback();
        }

        debug!(
            span_id = %span.id,
            kind = %kind,
            primary = report.primary,
            fallback = report.fallback,
            dropped = report.dropped,
            "annotations delivered"
        );
        report
    }

    fn write_fallback(&self, span: &SpanHandle, judgment: &Judgment, kind: EvaluatorKind) {
        let value = FallbackValue {
            score: judgment.score,
            label: judgment.label.as_deref(),
            explanation: &judgment.explanation,
            evaluator_kind: judgment.evaluator_kind,
            annotator_kind: kind.annotator_kind(),
            metadata: &judgment.metadata,
        };
        match serde_json::to_string(&value) {
            Ok(json) => self.backend.set_attribute(span, &fallback_key(judgment), json),
            Err(e) => warn!(
                span_id = %span.id,
                judgment = %judgment.name,
                error = %e,
                "failed to serialize fallback annotation"
            ),
        }
    }
}

impl std::fmt::Debug for AnnotationSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnnotationSink")
            .field("primary_healthy", &self.is_primary_healthy())
            .finish()
    }
}
