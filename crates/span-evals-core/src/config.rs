//! Environment-driven configuration for the external collaborators.
//!
//! Each struct's `Default` reads its environment variables; builder methods
//! override individual fields.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{default_human_judgments, EvalError, Judgment, Result};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_COLLECTOR_ENDPOINT: &str = "http://localhost:6006";
pub const DEFAULT_DATASET_NAME: &str = "comprehensive-evals";

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn check_http_url(field: &str, url: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(EvalError::Config(format!(
            "{} must be an http(s) URL, got {:?}",
            field, url
        )))
    }
}

/// Chat-completion service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// API base URL (`OPENAI_BASE_URL`)
    pub base_url: String,
    /// Bearer key (`OPENAI_API_KEY`)
    pub api_key: Option<String>,
    /// Default model (`SPAN_EVALS_MODEL`)
    pub model: String,
    pub temperature: f32,
    /// Per-request timeout; none means wait indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        GenerationConfig {
            base_url: env_nonempty("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            api_key: env_nonempty("OPENAI_API_KEY"),
            model: env_nonempty("SPAN_EVALS_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: DEFAULT_TEMPERATURE,
            timeout: None,
        }
    }
}

impl GenerationConfig {
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Config for a specific endpoint, ignoring the environment.
    pub fn new(base_url: &str) -> Self {
        GenerationConfig {
            base_url: base_url.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            timeout: None,
        }
    }

    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Reject settings no request could succeed with.
    pub fn validate(&self) -> Result<()> {
        check_http_url("OPENAI_BASE_URL", &self.base_url)?;
        if self.model.trim().is_empty() {
            return Err(EvalError::Config("model name is empty".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(EvalError::Config(format!(
                "temperature {} outside 0.0..=2.0",
                self.temperature
            )));
        }
        Ok(())
    }
}

/// Annotation service settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationConfig {
    /// Collector base URL (`PHOENIX_COLLECTOR_ENDPOINT`)
    pub endpoint: String,
    /// Bearer key (`PHOENIX_API_KEY`)
    pub api_key: Option<String>,
    pub timeout: Option<Duration>,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        AnnotationConfig {
            endpoint: env_nonempty("PHOENIX_COLLECTOR_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_COLLECTOR_ENDPOINT.to_string()),
            api_key: env_nonempty("PHOENIX_API_KEY"),
            timeout: None,
        }
    }
}

impl AnnotationConfig {
    pub fn from_env() -> Self {
        Self::default()
    }

    pub fn new(endpoint: &str) -> Self {
        AnnotationConfig {
            endpoint: endpoint.to_string(),
            api_key: None,
            timeout: None,
        }
    }

    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_http_url("PHOENIX_COLLECTOR_ENDPOINT", &self.endpoint)
    }
}

/// Settings for one orchestrated unit of work.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    pub model: String,
    /// Value of the `phoenix.dataset.name` span attribute.
    pub dataset_name: String,
    /// Human judgments delivered after the automatic ones; empty disables.
    pub human_judgments: Vec<Judgment>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        OrchestratorConfig {
            model: env_nonempty("SPAN_EVALS_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            dataset_name: DEFAULT_DATASET_NAME.to_string(),
            human_judgments: default_human_judgments(),
        }
    }
}

impl OrchestratorConfig {
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_dataset(mut self, dataset: &str) -> Self {
        self.dataset_name = dataset.to_string();
        self
    }

    pub fn with_human_judgments(mut self, judgments: Vec<Judgment>) -> Self {
        self.human_judgments = judgments;
        self
    }

    pub fn without_human_judgments(self) -> Self {
        self.with_human_judgments(Vec::new())
    }
}
