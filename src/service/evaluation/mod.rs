//! Post evaluation orchestrator
//!
//! A request moves through a fixed pipeline:
//!
//! ```text
//! Classifying ─┬─ spam / not a claim ─────────────────────┐
//!              └─ claim ── SearchingEvidence ── Verifying ┤
//!                          NuanceAnalyzing (concurrently) ┴─ Aggregating ── Done
//! ```
//!
//! Only classification is fatal. Veracity and nuance each produce a
//! [`StageOutcome`] that the aggregator turns into a response.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;

use crate::model::{
    AnalysisRequest, AnalysisResponse, ConfigFile, FeatureConfig, SearchConfig, ThresholdConfig,
};
use crate::provider::ProviderClient;
use crate::search::SearchAdapter;
use crate::service::prompts::PromptStore;

mod aggregate;
mod classification;
pub mod error;
mod nuance;
mod veracity;

pub use error::EvaluationError;

use aggregate::ResponseBuilder;
use nuance::NuanceStage;
use veracity::VeracityStage;

/// Pipeline states, logged on every transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Classifying,
    ClassifiedSkipVeracity,
    ClassifiedClaim,
    SearchingEvidence,
    VerifyingClaim,
    NuanceAnalyzing,
    Aggregating,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Classifying => "classifying",
            Stage::ClassifiedSkipVeracity => "classified_skip_veracity",
            Stage::ClassifiedClaim => "classified_claim",
            Stage::SearchingEvidence => "searching_evidence",
            Stage::VerifyingClaim => "verifying_claim",
            Stage::NuanceAnalyzing => "nuance_analyzing",
            Stage::Aggregating => "aggregating",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Result of an optional stage
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    Completed(T),
    /// A usable result produced under partial failure
    Degraded { result: T, reason: String },
    Failed(String),
    Skipped,
}

impl<T> StageOutcome<T> {
    fn label(&self) -> &'static str {
        match self {
            StageOutcome::Completed(_) => "completed",
            StageOutcome::Degraded { .. } => "degraded",
            StageOutcome::Failed(_) => "failed",
            StageOutcome::Skipped => "skipped",
        }
    }

    fn log(&self, post_id: &str, stage: Stage) {
        match self {
            StageOutcome::Degraded { reason, .. } | StageOutcome::Failed(reason) => {
                tracing::warn!(
                    post_id = %post_id,
                    stage = %stage,
                    outcome = self.label(),
                    reason = %reason,
                    "Stage did not complete normally"
                );
            }
            _ => {
                tracing::debug!(post_id = %post_id, stage = %stage, outcome = self.label(), "Stage finished");
            }
        }
    }
}

/// Evaluation policy derived from the configuration file
#[derive(Debug, Clone)]
pub struct EvaluationSettings {
    pub features: FeatureConfig,
    pub thresholds: ThresholdConfig,
    pub search: SearchConfig,
    pub search_timeout: Duration,
    pub request_timeout: Duration,
    pub max_post_chars: usize,
}

impl EvaluationSettings {
    pub fn from_config(config: &ConfigFile) -> Self {
        Self {
            features: config.features.clone(),
            thresholds: config.thresholds.clone(),
            search: config.search.clone(),
            search_timeout: config.timeouts.search_call(),
            request_timeout: config.timeouts.request(),
            max_post_chars: config.limits.max_post_chars,
        }
    }
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self::from_config(&ConfigFile::default())
    }
}

/// Runs the evaluation pipeline for one post at a time
pub struct EvaluationService {
    provider: ProviderClient,
    search: Option<Arc<dyn SearchAdapter>>,
    prompts: Arc<PromptStore>,
    settings: EvaluationSettings,
}

impl EvaluationService {
    pub fn new(
        provider: ProviderClient,
        search: Option<Arc<dyn SearchAdapter>>,
        prompts: Arc<PromptStore>,
        settings: EvaluationSettings,
    ) -> Self {
        tracing::info!(
            provider = provider.provider_name(),
            model = %provider.model(),
            web_search = search.is_some(),
            veracity_check = settings.features.veracity_check,
            nuance_analysis = settings.features.nuance_analysis,
            "Evaluation service initialized"
        );

        Self {
            provider,
            search,
            prompts,
            settings,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    pub fn search_enabled(&self) -> bool {
        self.search.is_some()
    }

    pub fn settings(&self) -> &EvaluationSettings {
        &self.settings
    }

    /// Evaluate a post within the request deadline
    ///
    /// Dropping the pipeline future on timeout abandons every in-flight
    /// provider and search call of this request.
    pub async fn evaluate(
        &self,
        request: &AnalysisRequest,
    ) -> Result<AnalysisResponse, EvaluationError> {
        request
            .validate(self.settings.max_post_chars)
            .map_err(EvaluationError::InvalidRequest)?;

        let start = Instant::now();
        let deadline = self.settings.request_timeout;

        match tokio::time::timeout(deadline, self.run_pipeline(request)).await {
            Ok(Ok(response)) => {
                tracing::info!(
                    post_id = %request.post_id,
                    stage = %Stage::Done,
                    elapsed_ms = start.elapsed().as_millis(),
                    "Evaluation completed"
                );
                Ok(response)
            }
            Ok(Err(e)) => {
                tracing::error!(
                    post_id = %request.post_id,
                    elapsed_ms = start.elapsed().as_millis(),
                    error = %e,
                    "Evaluation failed"
                );
                Err(e)
            }
            Err(_) => {
                tracing::error!(
                    post_id = %request.post_id,
                    timeout_secs = deadline.as_secs(),
                    "Evaluation timed out"
                );
                Err(EvaluationError::Timeout(deadline))
            }
        }
    }

    async fn run_pipeline(
        &self,
        request: &AnalysisRequest,
    ) -> Result<AnalysisResponse, EvaluationError> {
        let post_id = request.post_id.as_str();
        let text = request.post_text.trim();
        let language = request.language;

        tracing::info!(
            post_id = %post_id,
            stage = %Stage::Classifying,
            language = %language,
            text_length = text.chars().count(),
            "Evaluating post"
        );

        let classification = classification::classify(
            &self.provider,
            &self.prompts,
            text,
            language,
            self.settings.thresholds.spam_confidence,
        )
        .await?;

        let needs_veracity = classification.requires_veracity();
        let branch = if needs_veracity {
            Stage::ClassifiedClaim
        } else {
            Stage::ClassifiedSkipVeracity
        };
        tracing::info!(post_id = %post_id, stage = %branch, "Classification branch selected");

        let veracity_stage = VeracityStage {
            provider: &self.provider,
            search: self.search.as_deref(),
            prompts: &self.prompts,
            search_config: &self.settings.search,
            search_timeout: self.settings.search_timeout,
            enabled: self.settings.features.veracity_check,
        };
        let nuance_stage = NuanceStage {
            provider: &self.provider,
            prompts: &self.prompts,
            intent_threshold: self.settings.thresholds.intent_confidence,
            enabled: self.settings.features.nuance_analysis,
        };

        let veracity = async {
            if !needs_veracity {
                return StageOutcome::Skipped;
            }
            tracing::info!(post_id = %post_id, stage = %Stage::SearchingEvidence, "Verifying claim");
            let outcome = veracity_stage
                .run(text, language, Utc::now().date_naive())
                .await;
            outcome.log(post_id, Stage::VerifyingClaim);
            outcome
        };
        let nuance = async {
            tracing::info!(post_id = %post_id, stage = %Stage::NuanceAnalyzing, "Analysing nuance");
            let outcome = nuance_stage.run(text, language).await;
            outcome.log(post_id, Stage::NuanceAnalyzing);
            outcome
        };

        let (veracity, nuance) = tokio::join!(veracity, nuance);

        tracing::info!(
            post_id = %post_id,
            stage = %Stage::Aggregating,
            veracity = veracity.label(),
            nuance = nuance.label(),
            "Aggregating results"
        );

        ResponseBuilder::new(request, classification)
            .veracity(veracity)
            .nuance(nuance)
            .build(Utc::now())
            .inspect_err(|e| {
                tracing::error!(post_id = %post_id, error = %e, "Aggregate invariant violated");
            })
    }
}
