//! In-process fakes for provider and search backends

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::model::{Language, Source};
use crate::provider::{CompletionRequest, LlmProvider, ProviderError};
use crate::search::{SearchAdapter, SearchError};

/// Answers each call by the name of the requested output contract
#[derive(Default)]
pub struct FakeProvider {
    answers: HashMap<&'static str, Result<String, ProviderError>>,
    delay: Option<Duration>,
    calls: Mutex<HashMap<String, usize>>,
    prompts: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, schema: &'static str, json: &str) -> Self {
        self.answers.insert(schema, Ok(json.to_string()));
        self
    }

    pub fn fail(mut self, schema: &'static str, error: ProviderError) -> Self {
        self.answers.insert(schema, Err(error));
        self
    }

    /// Delay every call, for deadline tests
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self, schema: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(schema)
            .copied()
            .unwrap_or(0)
    }

    /// Every prompt received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    /// A provider answering every analysis with the given classification
    pub fn with_defaults(classification: &str) -> Self {
        Self::new()
            .answer("classification", classification)
            .answer(
                "political_analysis",
                r#"{"scores": {"Left": 0.1, "Center": 0.2, "Neutral": 0.7}}"#,
            )
            .answer(
                "intent_analysis",
                r#"{"scores": {"Informative": 0.9, "Persuasive": 0.1}}"#,
            )
            .answer(
                "veracity",
                r#"{"status": "Factually Correct", "justification": "NASA confirms that the Earth orbits the Sun once per year.", "sources": [{"title": "Earth's orbit", "url": "https://nasa.example/orbit", "snippet": ""}]}"#,
            )
    }
}

#[async_trait]
impl LlmProvider for FakeProvider {
    fn name(&self) -> &'static str {
        "Fake"
    }

    fn model(&self) -> &str {
        "fake-1"
    }

    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, ProviderError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(request.schema_name.to_string())
            .or_insert(0) += 1;
        self.prompts.lock().unwrap().push(request.prompt.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.answers
            .get(request.schema_name)
            .cloned()
            .unwrap_or_else(|| {
                Err(ProviderError::Unavailable(format!(
                    "no answer scripted for {}",
                    request.schema_name
                )))
            })
    }
}

/// Returns fixed results, or fails every query
pub struct FakeSearch {
    /// Outcome per call; the last one repeats once the script runs out
    script: Vec<Result<Vec<Source>, SearchError>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FakeSearch {
    pub fn ok(results: Vec<Source>) -> Self {
        Self::scripted(vec![Ok(results)])
    }

    pub fn failing(error: SearchError) -> Self {
        Self::scripted(vec![Err(error)])
    }

    pub fn scripted(script: Vec<Result<Vec<Source>, SearchError>>) -> Self {
        Self {
            script,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Delay every call, for per-query timeout tests
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Results about the Earth's orbit
    pub fn orbit() -> Self {
        Self::ok(orbit_sources())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn orbit_sources() -> Vec<Source> {
    vec![
        Source {
            title: "Earth's orbit".to_string(),
            url: "https://nasa.example/orbit".to_string(),
            snippet: "The Earth revolves around the Sun, completing one orbit every 365.25 days."
                .to_string(),
        },
        Source {
            title: "Heliocentrism".to_string(),
            url: "https://encyclopedia.example/helio".to_string(),
            snippet: "Copernicus proposed that the Earth and planets revolve around the Sun."
                .to_string(),
        },
    ]
}

#[async_trait]
impl SearchAdapter for FakeSearch {
    fn name(&self) -> &'static str {
        "Fake"
    }

    async fn search(
        &self,
        _query: &str,
        count: usize,
        _language: Language,
    ) -> Result<Vec<Source>, SearchError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let outcome = self
            .script
            .get(call)
            .or_else(|| self.script.last())
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()));
        outcome.map(|results| results.into_iter().take(count).collect())
    }
}
