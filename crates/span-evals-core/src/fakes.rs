//! In-memory fakes for the external collaborators (testing only)
//!
//! Provides `MemorySpanBackend`, `ScriptedAnnotationService`, and
//! `StaticGenerator` that satisfy the trait contracts without any network.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::annotation::AnnotationService;
use crate::backend::{SpanBackend, SpanHandle, SpanStatus};
use crate::domain::{AnnotationError, AnnotationRecord, EvalError, Result, SpanId};
use crate::generation::{Completion, GenerationService};

// ---------------------------------------------------------------------------
// MemorySpanBackend
// ---------------------------------------------------------------------------

/// Everything observed for one span.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedSpan {
    pub handle: SpanHandle,
    pub attributes: BTreeMap<String, String>,
    pub status: Option<SpanStatus>,
    pub end_calls: usize,
}

#[derive(Debug, Default)]
struct BackendState {
    order: Vec<SpanId>,
    spans: HashMap<SpanId, RecordedSpan>,
    flushes: usize,
    shut_down: bool,
}

/// Span backend that records every call.
#[derive(Debug, Default)]
pub struct MemorySpanBackend {
    state: Mutex<BackendState>,
}

impl MemorySpanBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// All spans in start order.
    pub fn spans(&self) -> Vec<RecordedSpan> {
        let state = self.state.lock().unwrap();
        state
            .order
            .iter()
            .filter_map(|id| state.spans.get(id).cloned())
            .collect()
    }

    pub fn span(&self, id: &SpanId) -> Option<RecordedSpan> {
        self.state.lock().unwrap().spans.get(id).cloned()
    }

    pub fn attribute(&self, span: &SpanHandle, key: &str) -> Option<String> {
        self.span(&span.id)
            .and_then(|s| s.attributes.get(key).cloned())
    }

    pub fn flushes(&self) -> usize {
        self.state.lock().unwrap().flushes
    }

    pub fn is_shut_down(&self) -> bool {
        self.state.lock().unwrap().shut_down
    }
}

#[async_trait]
impl SpanBackend for MemorySpanBackend {
    fn start_span(&self, name: &str, attributes: &[(&str, String)]) -> SpanHandle {
        let handle = SpanHandle {
            id: SpanId::new(),
            name: name.to_string(),
        };
        let mut state = self.state.lock().unwrap();
        state.order.push(handle.id.clone());
        state.spans.insert(
            handle.id.clone(),
            RecordedSpan {
                handle: handle.clone(),
                attributes: attributes
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
                status: None,
                end_calls: 0,
            },
        );
        handle
    }

    fn set_attribute(&self, span: &SpanHandle, key: &str, value: String) {
        if let Some(s) = self.state.lock().unwrap().spans.get_mut(&span.id) {
            s.attributes.insert(key.to_string(), value);
        }
    }

    fn set_status(&self, span: &SpanHandle, status: SpanStatus) {
        if let Some(s) = self.state.lock().unwrap().spans.get_mut(&span.id) {
            s.status = Some(status);
        }
    }

    fn end(&self, span: &SpanHandle) {
        if let Some(s) = self.state.lock().unwrap().spans.get_mut(&span.id) {
            s.end_calls += 1;
        }
    }

    async fn flush(&self) {
        self.state.lock().unwrap().flushes += 1;
    }

    async fn shutdown(&self) {
        self.state.lock().unwrap().shut_down = true;
    }
}

// ---------------------------------------------------------------------------
// ScriptedAnnotationService
// ---------------------------------------------------------------------------

/// Scripted reply to one `submit` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accept,
    Unsupported,
    Transient,
}

#[derive(Debug, Default)]
struct ServiceState {
    script: VecDeque<SubmitOutcome>,
    submitted: Vec<AnnotationRecord>,
    accepted: Vec<AnnotationRecord>,
}

/// Annotation service replying from a script; accepts once the script runs out.
#[derive(Debug, Default)]
pub struct ScriptedAnnotationService {
    state: Mutex<ServiceState>,
    always_unsupported: bool,
}

impl ScriptedAnnotationService {
    pub fn accepting() -> Self {
        Self::default()
    }

    pub fn scripted(outcomes: Vec<SubmitOutcome>) -> Self {
        Self {
            state: Mutex::new(ServiceState {
                script: outcomes.into(),
                ..Default::default()
            }),
            always_unsupported: false,
        }
    }

    /// Every call fails as unsupported.
    pub fn unsupported() -> Self {
        Self {
            always_unsupported: true,
            ..Default::default()
        }
    }

    /// Number of `submit` calls so far.
    pub fn attempts(&self) -> usize {
        self.state.lock().unwrap().submitted.len()
    }

    pub fn submitted_names(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.submitted.iter().map(|r| r.judgment.name.clone()).collect()
    }

    pub fn accepted_names(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.accepted.iter().map(|r| r.judgment.name.clone()).collect()
    }

    pub fn accepted(&self) -> Vec<AnnotationRecord> {
        self.state.lock().unwrap().accepted.clone()
    }
}

#[async_trait]
impl AnnotationService for ScriptedAnnotationService {
    async fn submit(&self, record: &AnnotationRecord) -> std::result::Result<(), AnnotationError> {
        let mut state = self.state.lock().unwrap();
        state.submitted.push(record.clone());

        let outcome = if self.always_unsupported {
            SubmitOutcome::Unsupported
        } else {
            state.script.pop_front().unwrap_or(SubmitOutcome::Accept)
        };

        match outcome {
            SubmitOutcome::Accept => {
                state.accepted.push(record.clone());
                Ok(())
            }
            SubmitOutcome::Unsupported => Err(AnnotationError::ChannelUnsupported(
                "POST /v1/span_annotations returned 404 Not Found".to_string(),
            )),
            SubmitOutcome::Transient => Err(AnnotationError::TransientDelivery(
                "POST /v1/span_annotations returned 503 Service Unavailable".to_string(),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// StaticGenerator
// ---------------------------------------------------------------------------

/// Generation service answering from a fixed table keyed by prompt.
#[derive(Debug, Default)]
pub struct StaticGenerator {
    default: Completion,
    responses: HashMap<String, Completion>,
    failing: Vec<String>,
    calls: Mutex<Vec<(String, String)>>,
}

impl StaticGenerator {
    /// Answer every prompt with `text`.
    pub fn new(text: &str) -> Self {
        Self {
            default: Completion::text(text),
            ..Default::default()
        }
    }

    /// Answer every prompt with an empty completion.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, prompt: &str, completion: Completion) -> Self {
        self.responses.insert(prompt.to_string(), completion);
        self
    }

    /// Fail with a transport-style error for `prompt`.
    pub fn failing_for(mut self, prompt: &str) -> Self {
        self.failing.push(prompt.to_string());
        self
    }

    /// `(prompt, model)` pairs received so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationService for StaticGenerator {
    async fn complete(&self, prompt: &str, model: &str) -> Result<Completion> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), model.to_string()));

        if self.failing.iter().any(|p| p == prompt) {
            return Err(EvalError::Generation(format!(
                "connection refused for prompt {:?}",
                prompt
            )));
        }
        Ok(self
            .responses
            .get(prompt)
            .cloned()
            .unwrap_or_else(|| self.default.clone()))
    }
}
