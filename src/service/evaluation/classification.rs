//! Classification stage: post type and spam detection

use crate::model::labels::{joined, parse_post_type, post_type_labels};
use crate::model::{ClassificationResult, ExtractedClassification, Language, PostType};
use crate::provider::ProviderClient;
use crate::service::prompts::{PromptStore, TemplateName};

use super::EvaluationError;

/// Classify a post; failure here aborts the request
pub(super) async fn classify(
    provider: &ProviderClient,
    prompts: &PromptStore,
    text: &str,
    language: Language,
    spam_threshold: f64,
) -> Result<ClassificationResult, EvaluationError> {
    let labels = joined(post_type_labels(language));
    let prompt = prompts.render(
        TemplateName::Classification,
        language,
        &[("text", text), ("labels", labels.as_str())],
    )?;

    let extracted = provider
        .generate::<ExtractedClassification>(&prompt)
        .await
        .map_err(EvaluationError::ClassificationFailed)?;

    let result = interpret(&extracted, spam_threshold).ok_or_else(|| {
        EvaluationError::InvalidAggregateState(format!(
            "validated classification label '{}' did not map",
            extracted.primary_label
        ))
    })?;

    tracing::info!(
        post_type = ?result.post_type,
        is_spam = result.is_spam,
        confidence = extracted.confidence,
        "Post classified"
    );

    Ok(result)
}

/// Turn the model's answer into a classification, applying the spam policy
///
/// A post is spam when the model flags it explicitly, or when it is
/// promotional with confidence above `spam_threshold`.
pub(super) fn interpret(
    extracted: &ExtractedClassification,
    spam_threshold: f64,
) -> Option<ClassificationResult> {
    let post_type = parse_post_type(&extracted.primary_label)?;
    let promotional_spam =
        post_type == PostType::Promotional && extracted.confidence > spam_threshold;

    Some(ClassificationResult {
        post_type,
        is_spam: extracted.is_spam.unwrap_or(false) || promotional_spam,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn extracted(label: &str, confidence: f64, is_spam: Option<bool>) -> ExtractedClassification {
        ExtractedClassification {
            primary_label: label.to_string(),
            confidence,
            scores: BTreeMap::new(),
            is_spam,
        }
    }

    #[test]
    fn test_confident_promotion_is_spam() {
        let result = interpret(&extracted("Promotional", 0.9, None), 0.7).unwrap();
        assert_eq!(result.post_type, PostType::Promotional);
        assert!(result.is_spam);
    }

    #[test]
    fn test_tentative_promotion_is_not_spam() {
        let result = interpret(&extracted("Werbung / Spam", 0.6, None), 0.7).unwrap();
        assert_eq!(result.post_type, PostType::Promotional);
        assert!(!result.is_spam);
    }

    #[test]
    fn test_explicit_spam_flag_wins() {
        let result = interpret(&extracted("Factual Claim", 0.9, Some(true)), 0.7).unwrap();
        assert_eq!(result.post_type, PostType::FactualClaim);
        assert!(result.is_spam);
        assert!(!result.requires_veracity());
    }

    #[test]
    fn test_unknown_label() {
        assert!(interpret(&extracted("Recipe", 0.9, None), 0.7).is_none());
    }
}
