//! Language-generation seam.
//!
//! An empty completion is a valid answer ("no content"), not an error; the
//! orchestrator decides what that means for the unit of work.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::GenerationConfig;
use crate::domain::{EvalError, Result, TokenUsage};

/// Output of one completion request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub text: Option<String>,
    pub usage: Option<TokenUsage>,
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            usage: None,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// The text if it contains anything besides whitespace.
    pub fn usable_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// Produces text for a prompt.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn complete(&self, prompt: &str, model: &str) -> Result<Completion>;
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

/// Chat-completions client for OpenAI-compatible APIs.
pub struct OpenAiGenerator {
    config: GenerationConfig,
    http_client: reqwest::Client,
}

impl OpenAiGenerator {
    pub fn new(config: GenerationConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("span-evals/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(OpenAiGenerator {
            config,
            http_client: builder.build()?,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(GenerationConfig::from_env())
    }

    pub fn default_model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl GenerationService for OpenAiGenerator {
    async fn complete(&self, prompt: &str, model: &str) -> Result<Completion> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let body = json!({
            "model": model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.config.temperature,
        });

        let mut request = self.http_client.post(&url).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(EvalError::Generation(format!(
                "{} returned {}: {}",
                url, status, detail
            )));
        }

        let parsed: ChatResponse = response.json().await?;
        debug!(model = %model, choices = parsed.choices.len(), "completion received");

        Ok(Completion {
            text: parsed
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content),
            usage: parsed.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn generator(server: &MockServer) -> OpenAiGenerator {
        OpenAiGenerator::new(
            GenerationConfig::new(&format!("{}/v1", server.uri())).with_api_key("sk-test"),
        )
        .expect("generator")
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice_and_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o",
                "messages": [{ "role": "user", "content": "Write a haiku." }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [
                    { "message": { "role": "assistant", "content": "first" } },
                    { "message": { "role": "assistant", "content": "second" } }
                ],
                "usage": { "prompt_tokens": 11, "completion_tokens": 17, "total_tokens": 28 }
            })))
            .mount(&server)
            .await;

        let completion = generator(&server)
            .complete("Write a haiku.", "gpt-4o")
            .await
            .expect("complete");

        assert_eq!(completion.usable_text(), Some("first"));
        assert_eq!(completion.usage.expect("usage").total_tokens, 28);
    }

    #[tokio::test]
    async fn test_null_content_is_empty_not_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": null } }]
            })))
            .mount(&server)
            .await;

        let completion = generator(&server)
            .complete("p", "gpt-4o")
            .await
            .expect("complete");
        assert_eq!(completion.usable_text(), None);
        assert!(completion.usage.is_none());
    }

    #[tokio::test]
    async fn test_http_failure_is_generation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let err = generator(&server).complete("p", "gpt-4o").await.unwrap_err();
        assert!(matches!(err, EvalError::Generation(_)));
        assert!(err.to_string().contains("401"));
    }

    #[test]
    fn test_whitespace_completion_is_not_usable() {
        assert_eq!(Completion::text("  \n").usable_text(), None);
        assert_eq!(Completion::empty().usable_text(), None);
        assert_eq!(Completion::text("ok").usable_text(), Some("ok"));
    }

    #[test]
    fn test_new_rejects_invalid_base_url() {
        let result = OpenAiGenerator::new(GenerationConfig::new("api.openai.com/v1"));
        assert!(matches!(result, Err(EvalError::Config(_))));
    }
}
