//! AI provider adapters
//!
//! Every backend implements [`LlmProvider`]; the concrete backend is chosen
//! once from configuration and handed to the services as a trait object.

mod claude;
mod client;
mod mistral;
pub mod parsing;
mod schema;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

use crate::model::ProviderSettings;

pub use claude::ClaudeProvider;
pub use client::{ProviderClient, RetryPolicy};
pub use mistral::MistralProvider;
pub use schema::{ResponseSchema, StructuredOutput};

/// Sampling temperature shared by all analysis calls
const TEMPERATURE: f64 = 0.1;

#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum ProviderError {
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Provider call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Provider rate limited")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Malformed provider output: {0}")]
    MalformedOutput(String),

    #[error("Provider rejected request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },
}

impl ProviderError {
    /// Rejections (bad credentials, invalid request) will not improve on retry
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ProviderError::Rejected { .. })
    }

    fn from_transport(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(timeout)
        } else {
            ProviderError::Unavailable(err.to_string())
        }
    }

    fn from_status(status: StatusCode, body: String, retry_after: Option<Duration>) -> Self {
        match status.as_u16() {
            429 => ProviderError::RateLimited { retry_after },
            // 529: Anthropic "overloaded"
            500..=599 => ProviderError::Unavailable(format!("HTTP {}: {}", status, truncate(&body))),
            408 => ProviderError::Unavailable(format!("HTTP {}", status)),
            code => ProviderError::Rejected {
                status: code,
                message: truncate(&body),
            },
        }
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(300).collect()
}

fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// A single completion call
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    /// Contract name of the expected output
    pub schema_name: &'a str,
    pub system: &'a str,
    pub prompt: &'a str,
    pub max_tokens: u32,
}

/// Capability shared by every AI backend
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Backend name for logs and the config endpoint
    fn name(&self) -> &'static str;

    /// Model identifier in use
    fn model(&self) -> &str;

    /// Send one completion request and return the raw text answer
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, ProviderError>;

    /// Send a rendered prompt and return the JSON object matching `schema`
    async fn generate(&self, prompt: &str, schema: &ResponseSchema) -> Result<Value, ProviderError> {
        let system = schema.instructions();
        let text = self
            .complete(CompletionRequest {
                schema_name: schema.name,
                system: &system,
                prompt,
                max_tokens: schema.max_tokens,
            })
            .await?;
        parsing::extract_structured(&text, schema)
    }
}

/// Supported provider backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Claude,
    Mistral,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Claude => "claude",
            ProviderKind::Mistral => "mistral",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "claude" | "anthropic" => Ok(ProviderKind::Claude),
            "mistral" => Ok(ProviderKind::Mistral),
            other => Err(format!("unknown AI provider '{}'", other)),
        }
    }
}

/// Build the configured provider backend
pub fn build_provider(
    settings: &ProviderSettings,
    api_key: &str,
    timeout: Duration,
) -> Result<Arc<dyn LlmProvider>, ProviderError> {
    let provider: Arc<dyn LlmProvider> = match settings.kind {
        ProviderKind::Claude => Arc::new(ClaudeProvider::new(
            api_key,
            &settings.model,
            settings.base_url.as_deref(),
            timeout,
        )?),
        ProviderKind::Mistral => Arc::new(MistralProvider::new(
            api_key,
            &settings.model,
            settings.base_url.as_deref(),
            timeout,
        )?),
    };

    tracing::info!(
        provider = provider.name(),
        model = provider.model(),
        "AI provider initialized"
    );

    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            ProviderError::from_status(StatusCode::TOO_MANY_REQUESTS, String::new(), None),
            ProviderError::RateLimited { .. }
        ));
        assert!(matches!(
            ProviderError::from_status(StatusCode::BAD_GATEWAY, String::new(), None),
            ProviderError::Unavailable(_)
        ));
        assert!(matches!(
            ProviderError::from_status(StatusCode::from_u16(529).unwrap(), String::new(), None),
            ProviderError::Unavailable(_)
        ));

        let rejected = ProviderError::from_status(
            StatusCode::UNAUTHORIZED,
            "invalid x-api-key".to_string(),
            None,
        );
        assert!(matches!(rejected, ProviderError::Rejected { status: 401, .. }));
        assert!(!rejected.is_retryable());
    }

    #[test]
    fn test_provider_kind_parsing() {
        assert_eq!("Claude".parse::<ProviderKind>(), Ok(ProviderKind::Claude));
        assert_eq!("mistral".parse::<ProviderKind>(), Ok(ProviderKind::Mistral));
        assert!("openai".parse::<ProviderKind>().is_err());
    }
}
