//! Application state and service initialization
//!
//! All startup validation happens here: a misconfigured provider or a
//! missing template stops the process before the server binds.

use std::sync::Arc;

use crate::model::Config;
use crate::provider::{ProviderClient, build_provider};
use crate::search::{BraveSearch, SearchAdapter};
use crate::service::evaluation::{EvaluationService, EvaluationSettings};
use crate::service::prompts::{PromptError, PromptStore};

/// Application state containing all services and shared resources
pub struct AppState {
    /// Post evaluation pipeline
    pub evaluation_service: Arc<EvaluationService>,
}

impl AppState {
    /// Initialize all services and build application state
    ///
    /// This performs:
    /// 1. Provider selection and credential check
    /// 2. Web search initialization (optional)
    /// 3. Prompt template loading and validation
    /// 4. Service dependency graph construction
    pub fn new(config: Config) -> Result<Self, AppError> {
        let policy = &config.policy;

        let (settings, api_key) = config.provider_settings().map_err(AppError::InvalidConfig)?;
        let provider = build_provider(&settings, &api_key, policy.timeouts.provider_call())
            .map_err(|e| AppError::InvalidConfig(e.to_string()))?;

        let provider_client = ProviderClient::new(
            provider,
            policy.retry.policy(),
            policy.timeouts.provider_call(),
        );

        let search = Self::build_search(&config)?;

        let prompts = PromptStore::load(
            config.prompts_dir.as_deref(),
            policy.prompts.fallback_to_english,
        )?;

        let evaluation_service = EvaluationService::new(
            provider_client,
            search,
            Arc::new(prompts),
            EvaluationSettings::from_config(policy),
        );

        Ok(Self {
            evaluation_service: Arc::new(evaluation_service),
        })
    }

    /// Build the web search backend, if enabled and configured
    fn build_search(config: &Config) -> Result<Option<Arc<dyn SearchAdapter>>, AppError> {
        let policy = &config.policy;

        if !policy.features.web_search {
            tracing::info!("Web search disabled by configuration");
            return Ok(None);
        }

        let Some(api_key) = config.brave_api_key.as_deref() else {
            tracing::warn!("BRAVE_API_KEY not set, claims will be reported as unverifiable");
            return Ok(None);
        };

        let search = BraveSearch::new(
            api_key,
            config.brave_base_url.as_deref(),
            policy.timeouts.search_call(),
            policy.search.freshness.clone(),
        )
        .map_err(|e| AppError::InvalidConfig(e.to_string()))?;

        Ok(Some(Arc::new(search)))
    }
}

/// Application-level errors
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AppError {
    /// Invalid or missing configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Prompt templates could not be loaded
    #[error("Prompt templates unavailable: {0}")]
    Prompt(#[from] PromptError),
}
