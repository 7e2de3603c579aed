//! Brave Search API adapter

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::query::strip_html;
use super::{SearchAdapter, SearchError};
use crate::model::{Language, Source};

const BRAVE_BASE_URL: &str = "https://api.search.brave.com/res/v1/web/search";
/// Brave caps `count` at 20
const MAX_COUNT: usize = 20;

/// Web search through the Brave Search API
pub struct BraveSearch {
    client: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
    freshness: Option<String>,
}

#[derive(Deserialize)]
struct BraveResponse {
    #[serde(default)]
    web: Option<BraveWeb>,
}

#[derive(Deserialize)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<BraveResult>,
}

#[derive(Deserialize)]
struct BraveResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    description: String,
}

impl BraveSearch {
    pub fn new(
        api_key: &str,
        base_url: Option<&str>,
        timeout: Duration,
        freshness: Option<String>,
    ) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::Unavailable(format!("Failed to build HTTP client: {}", e)))?;

        tracing::info!("Brave Search API initialized");

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.unwrap_or(BRAVE_BASE_URL).to_string(),
            timeout,
            freshness,
        })
    }

    fn query_params(&self, query: &str, count: usize, language: Language) -> Vec<(&'static str, String)> {
        let country = match language {
            Language::De => "de",
            Language::En => "us",
        };
        let mut params = vec![
            ("q", query.to_string()),
            ("count", count.clamp(1, MAX_COUNT).to_string()),
            ("search_lang", language.code().to_string()),
            ("country", country.to_string()),
            ("safesearch", "moderate".to_string()),
        ];
        if let Some(ref freshness) = self.freshness {
            params.push(("freshness", freshness.clone()));
        }
        params
    }
}

#[async_trait]
impl SearchAdapter for BraveSearch {
    fn name(&self) -> &'static str {
        "Brave"
    }

    async fn search(
        &self,
        query: &str,
        count: usize,
        language: Language,
    ) -> Result<Vec<Source>, SearchError> {
        tracing::debug!(query = %query, count = count, language = %language, "Brave search");

        let response = self
            .client
            .get(&self.base_url)
            .header("Accept", "application/json")
            .header("X-Subscription-Token", &self.api_key)
            .query(&self.query_params(query, count, language))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Timeout(self.timeout)
                } else {
                    SearchError::Unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let parsed: BraveResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Unavailable(format!("Failed to parse response: {}", e)))?;

        let results: Vec<Source> = parsed
            .web
            .map(|web| web.results)
            .unwrap_or_default()
            .into_iter()
            .take(count)
            .map(|r| Source {
                title: strip_html(&r.title),
                url: r.url,
                snippet: strip_html(&r.description),
            })
            .collect();

        tracing::info!(query = %query, results = results.len(), "Search returned results");
        Ok(results)
    }
}

/// Map a non-success Brave status onto a search error
///
/// 402 and 429 both mean the subscription quota is spent.
fn status_error(status: StatusCode, body: &str) -> SearchError {
    if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::PAYMENT_REQUIRED {
        tracing::warn!(status = status.as_u16(), "Brave Search quota exceeded");
        return SearchError::QuotaExceeded;
    }
    SearchError::Unavailable(format!(
        "HTTP {}: {}",
        status,
        body.chars().take(200).collect::<String>()
    ))
}
