//! Response assembly and shape validation

use chrono::{DateTime, SecondsFormat, Utc};

use crate::model::{
    AnalysisRequest, AnalysisResponse, ClassificationResult, NuanceResult, VeracityResult,
};

use super::{EvaluationError, StageOutcome};

/// Tolerance for political scores summing to one after rounding
const SCORE_SUM_TOLERANCE: f64 = 0.01;

/// Builds an [`AnalysisResponse`] from stage outcomes
///
/// `veracity_analysis` is present exactly when the classification marks a
/// non-spam factual claim. Failed optional stages are filled with safe
/// defaults or omitted; anything that cannot satisfy the shape is an
/// [`EvaluationError::InvalidAggregateState`].
pub(super) struct ResponseBuilder<'a> {
    request: &'a AnalysisRequest,
    classification: ClassificationResult,
    veracity: StageOutcome<VeracityResult>,
    nuance: StageOutcome<NuanceResult>,
}

impl<'a> ResponseBuilder<'a> {
    pub fn new(request: &'a AnalysisRequest, classification: ClassificationResult) -> Self {
        Self {
            request,
            classification,
            veracity: StageOutcome::Skipped,
            nuance: StageOutcome::Skipped,
        }
    }

    pub fn veracity(mut self, outcome: StageOutcome<VeracityResult>) -> Self {
        self.veracity = outcome;
        self
    }

    pub fn nuance(mut self, outcome: StageOutcome<NuanceResult>) -> Self {
        self.nuance = outcome;
        self
    }

    pub fn build(self, now: DateTime<Utc>) -> Result<AnalysisResponse, EvaluationError> {
        let veracity_analysis = if self.classification.requires_veracity() {
            match self.veracity {
                StageOutcome::Completed(result) | StageOutcome::Degraded { result, .. } => {
                    Some(result)
                }
                StageOutcome::Failed(reason) => Some(VeracityResult::unverifiable(format!(
                    "The claim could not be verified: {}",
                    reason
                ))),
                StageOutcome::Skipped => {
                    return Err(EvaluationError::InvalidAggregateState(
                        "veracity stage skipped for a factual claim".to_string(),
                    ));
                }
            }
        } else {
            match self.veracity {
                StageOutcome::Skipped => None,
                _ => {
                    return Err(EvaluationError::InvalidAggregateState(format!(
                        "veracity result present for {:?} (spam: {})",
                        self.classification.post_type, self.classification.is_spam
                    )));
                }
            }
        };

        let nuance_analysis = match self.nuance {
            StageOutcome::Completed(result) | StageOutcome::Degraded { result, .. } => {
                check_nuance(&result)?;
                Some(result)
            }
            StageOutcome::Failed(_) | StageOutcome::Skipped => None,
        };

        Ok(AnalysisResponse {
            post_id: self.request.post_id.clone(),
            analysis_timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            language: self.request.language,
            post_analysis: self.classification,
            veracity_analysis,
            nuance_analysis,
        })
    }
}

fn check_nuance(result: &NuanceResult) -> Result<(), EvaluationError> {
    let scores = &result.political_tendency.scores;
    if scores.values().any(|s| !s.is_finite() || *s < 0.0) {
        return Err(EvaluationError::InvalidAggregateState(
            "political scores must be finite and non-negative".to_string(),
        ));
    }

    let sum: f64 = scores.values().sum();
    if (sum - 1.0).abs() > SCORE_SUM_TOLERANCE {
        return Err(EvaluationError::InvalidAggregateState(format!(
            "political scores sum to {}",
            sum
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Language, PostType, VeracityStatus, VerificationMethod};
    use crate::service::evaluation::nuance::neutral_political;

    fn request() -> AnalysisRequest {
        AnalysisRequest {
            post_id: "post-1".to_string(),
            post_text: "text".to_string(),
            language: Language::De,
        }
    }

    fn classification(post_type: PostType, is_spam: bool) -> ClassificationResult {
        ClassificationResult { post_type, is_spam }
    }

    fn nuance() -> NuanceResult {
        NuanceResult {
            political_tendency: neutral_political(),
            detected_intents: Vec::new(),
        }
    }

    #[test]
    fn test_claim_keeps_veracity() {
        let request = request();
        let response = ResponseBuilder::new(&request, classification(PostType::FactualClaim, false))
            .veracity(StageOutcome::Completed(VeracityResult {
                status: VeracityStatus::FactuallyCorrect,
                justification: "Confirmed".to_string(),
                verification_method: VerificationMethod::WebSearch,
                sources: Vec::new(),
            }))
            .nuance(StageOutcome::Completed(nuance()))
            .build(Utc::now())
            .unwrap();

        assert_eq!(response.post_id, "post-1");
        assert_eq!(response.language, Language::De);
        assert!(response.veracity_analysis.is_some());
        assert!(response.nuance_analysis.is_some());
        assert!(response.analysis_timestamp.ends_with('Z'));
    }

    #[test]
    fn test_failed_veracity_filled_with_default() {
        let request = request();
        let response = ResponseBuilder::new(&request, classification(PostType::FactualClaim, false))
            .veracity(StageOutcome::Failed("boom".to_string()))
            .build(Utc::now())
            .unwrap();

        let veracity = response.veracity_analysis.unwrap();
        assert_eq!(veracity.status, VeracityStatus::Unverifiable);
        assert_eq!(veracity.verification_method, VerificationMethod::None);
        assert!(response.nuance_analysis.is_none());
    }

    #[test]
    fn test_missing_veracity_for_claim_is_invalid() {
        let request = request();
        let err = ResponseBuilder::new(&request, classification(PostType::FactualClaim, false))
            .build(Utc::now())
            .unwrap_err();
        assert!(matches!(err, EvaluationError::InvalidAggregateState(_)));
    }

    #[test]
    fn test_veracity_for_spam_is_invalid() {
        let request = request();
        let err = ResponseBuilder::new(&request, classification(PostType::FactualClaim, true))
            .veracity(StageOutcome::Completed(VeracityResult::unverifiable("x")))
            .build(Utc::now())
            .unwrap_err();
        assert!(matches!(err, EvaluationError::InvalidAggregateState(_)));
    }

    #[test]
    fn test_opinion_without_veracity() {
        let request = request();
        let response = ResponseBuilder::new(&request, classification(PostType::Opinion, false))
            .nuance(StageOutcome::Failed("both failed".to_string()))
            .build(Utc::now())
            .unwrap();
        assert!(response.veracity_analysis.is_none());
        assert!(response.nuance_analysis.is_none());
    }

    #[test]
    fn test_unnormalised_scores_are_invalid() {
        let request = request();
        let mut bad = nuance();
        bad.political_tendency
            .scores
            .insert("Left".to_string(), 5.0);
        let err = ResponseBuilder::new(&request, classification(PostType::Opinion, false))
            .nuance(StageOutcome::Completed(bad))
            .build(Utc::now())
            .unwrap_err();
        assert!(matches!(err, EvaluationError::InvalidAggregateState(_)));
    }
}
