//! Primary annotation channel.
//!
//! [`AnnotationService`] is the seam the sink delivers through.
//! [`HttpAnnotationClient`] posts records to a Phoenix-style
//! `/v1/span_annotations` endpoint and classifies failures:
//! a missing or unimplemented endpoint is `ChannelUnsupported`, everything
//! else is `TransientDelivery`.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;
use tracing::debug;

use crate::config::AnnotationConfig;
use crate::domain::{AnnotationError, AnnotationRecord, Result};

/// Accepts annotation records keyed by the record's span id.
#[async_trait]
pub trait AnnotationService: Send + Sync {
    async fn submit(&self, record: &AnnotationRecord) -> std::result::Result<(), AnnotationError>;
}

/// Status codes meaning the endpoint cannot take span annotations at all.
fn is_unsupported_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::NOT_FOUND | StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED
    )
}

/// HTTP client for the span annotation endpoint.
pub struct HttpAnnotationClient {
    config: AnnotationConfig,
    http_client: reqwest::Client,
}

impl HttpAnnotationClient {
    pub fn new(config: AnnotationConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("span-evals/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(HttpAnnotationClient {
            config,
            http_client: builder.build()?,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(AnnotationConfig::from_env())
    }

    pub fn endpoint_url(&self) -> String {
        format!(
            "{}/v1/span_annotations",
            self.config.endpoint.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl AnnotationService for HttpAnnotationClient {
    async fn submit(&self, record: &AnnotationRecord) -> std::result::Result<(), AnnotationError> {
        let url = self.endpoint_url();
        let body = json!({ "data": [record.to_payload()] });

        let mut request = self
            .http_client
            .post(&url)
            .query(&[("sync", "false")])
            .json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AnnotationError::TransientDelivery(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!(identifier = %record.identifier, "annotation accepted");
            return Ok(());
        }

        let detail = format!("POST {} returned {}", url, status);
        if is_unsupported_status(status) {
            Err(AnnotationError::ChannelUnsupported(detail))
        } else {
            Err(AnnotationError::TransientDelivery(detail))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EvaluatorKind, Judgment, SpanId};
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record() -> AnnotationRecord {
        AnnotationRecord::new(
            SpanId("00f067aa0ba902b7".into()),
            Judgment::scored("creativity", 0.5, "Unique words ratio: 50.0%", EvaluatorKind::Model),
            EvaluatorKind::Model,
        )
    }

    fn client(server: &MockServer) -> HttpAnnotationClient {
        HttpAnnotationClient::new(AnnotationConfig::new(&server.uri()).with_api_key("px-key"))
            .expect("client")
    }

    #[tokio::test]
    async fn test_submit_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/span_annotations"))
            .and(query_param("sync", "false"))
            .and(header("authorization", "Bearer px-key"))
            .and(body_partial_json(json!({
                "data": [{
                    "span_id": "00f067aa0ba902b7",
                    "name": "creativity",
                    "annotator_kind": "LLM",
                    "result": { "score": 0.5 }
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .expect(1)
            .mount(&server)
            .await;

        assert!(client(&server).submit(&record()).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_endpoint_is_unsupported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/span_annotations"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client(&server).submit(&record()).await.unwrap_err();
        assert!(err.is_unsupported(), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_method_not_allowed_is_unsupported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(405))
            .mount(&server)
            .await;

        let err = client(&server).submit(&record()).await.unwrap_err();
        assert!(err.is_unsupported());
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(&server).submit(&record()).await.unwrap_err();
        assert!(matches!(err, AnnotationError::TransientDelivery(_)));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transient() {
        let client =
            HttpAnnotationClient::new(AnnotationConfig::new("http://127.0.0.1:1")).expect("client");
        let err = client.submit(&record()).await.unwrap_err();
        assert!(matches!(err, AnnotationError::TransientDelivery(_)));
    }

    #[test]
    fn test_endpoint_url_trims_trailing_slash() {
        let client = HttpAnnotationClient::new(AnnotationConfig::new("http://localhost:6006/"))
            .expect("client");
        assert_eq!(client.endpoint_url(), "http://localhost:6006/v1/span_annotations");
    }

    #[test]
    fn test_new_rejects_invalid_endpoint() {
        let result = HttpAnnotationClient::new(AnnotationConfig::new("localhost:6006"));
        assert!(matches!(result, Err(crate::domain::EvalError::Config(_))));
    }
}
