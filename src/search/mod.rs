//! Web search adapters for claim verification

mod brave;
pub mod query;

use std::time::Duration;

use async_trait::async_trait;

use crate::model::{Language, Source};

pub use brave::BraveSearch;

#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum SearchError {
    #[error("Search unavailable: {0}")]
    Unavailable(String),

    #[error("Search timed out after {0:?}")]
    Timeout(Duration),

    #[error("Search quota exceeded")]
    QuotaExceeded,
}

/// Trait for web search backends
#[async_trait]
pub trait SearchAdapter: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    /// Search the web, returning at most `count` results in relevance order
    async fn search(
        &self,
        query: &str,
        count: usize,
        language: Language,
    ) -> Result<Vec<Source>, SearchError>;
}
