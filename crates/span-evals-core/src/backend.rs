//! Tracing backend seam.
//!
//! The core only ever talks to spans through [`SpanBackend`]: open, attach
//! string attributes, set a terminal status, end. Structured values are
//! serialized before they reach the backend.
//!
//! [`LogSpanBackend`] renders span lifecycle into the process's `tracing`
//! subscriber; an in-memory recorder for tests lives in [`crate::fakes`].

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::domain::SpanId;

/// Handle to an open span.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpanHandle {
    pub id: SpanId,
    pub name: String,
}

/// Terminal status of a span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanStatus {
    Ok,
    Error(String),
}

/// Span lifecycle operations consumed by the core.
#[async_trait]
pub trait SpanBackend: Send + Sync {
    fn start_span(&self, name: &str, attributes: &[(&str, String)]) -> SpanHandle;

    fn set_attribute(&self, span: &SpanHandle, key: &str, value: String);

    fn set_status(&self, span: &SpanHandle, status: SpanStatus);

    fn end(&self, span: &SpanHandle);

    /// Push buffered span data to the backend's sink.
    async fn flush(&self);

    /// Flush and release resources; spans still open are ended.
    async fn shutdown(&self);
}

struct OpenSpan {
    span: tracing::Span,
    attributes: BTreeMap<String, String>,
    status: Option<SpanStatus>,
}

/// Emits span lifecycle as `tracing` spans and events.
///
/// Attributes are logged at `debug` as they arrive and summarized at `info`
/// when the span ends.
#[derive(Default)]
pub struct LogSpanBackend {
    open: Mutex<HashMap<SpanId, OpenSpan>>,
}

impl LogSpanBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of spans started but not yet ended.
    pub fn open_spans(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SpanId, OpenSpan>> {
        self.open.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn close(id: &SpanId, open: OpenSpan) {
        let status = match &open.status {
            Some(SpanStatus::Ok) | None => "ok",
            Some(SpanStatus::Error(_)) => "error",
        };
        info!(
            parent: &open.span,
            event = "span.ended",
            span_id = %id,
            status = status,
            attributes = ?open.attributes,
        );
    }
}

#[async_trait]
impl SpanBackend for LogSpanBackend {
    fn start_span(&self, name: &str, attributes: &[(&str, String)]) -> SpanHandle {
        let id = SpanId::new();
        let span = tracing::info_span!("span_evals.span", span_name = %name, span_id = %id);
        debug!(parent: &span, event = "span.started");

        let attributes = attributes
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        self.lock().insert(
            id.clone(),
            OpenSpan {
                span,
                attributes,
                status: None,
            },
        );

        SpanHandle {
            id,
            name: name.to_string(),
        }
    }

    fn set_attribute(&self, span: &SpanHandle, key: &str, value: String) {
        let mut open = self.lock();
        match open.get_mut(&span.id) {
            Some(state) => {
                debug!(parent: &state.span, event = "span.attribute", key = %key, value = %value);
                state.attributes.insert(key.to_string(), value);
            }
            None => warn!(span_id = %span.id, key = %key, "attribute set on a closed span"),
        }
    }

    fn set_status(&self, span: &SpanHandle, status: SpanStatus) {
        let mut open = self.lock();
        if let Some(state) = open.get_mut(&span.id) {
            if let SpanStatus::Error(message) = &status {
                warn!(parent: &state.span, event = "span.error", reason = %message);
            }
            state.status = Some(status);
        }
    }

    fn end(&self, span: &SpanHandle) {
        let closed = self.lock().remove(&span.id);
        match closed {
            Some(open) => Self::close(&span.id, open),
            None => debug!(span_id = %span.id, "span already ended"),
        }
    }

    async fn flush(&self) {
        info!(event = "backend.flush", open_spans = self.open_spans());
    }

    async fn shutdown(&self) {
        let drained: Vec<(SpanId, OpenSpan)> = self.lock().drain().collect();
        for (id, open) in drained {
            warn!(span_id = %id, "span still open at shutdown");
            Self::close(&id, open);
        }
        info!(event = "backend.shutdown");
    }
}
