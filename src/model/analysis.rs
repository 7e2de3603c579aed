//! Request, response and domain types for post evaluation

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Language of a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    De,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::De => "de",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Inbound evaluation request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AnalysisRequest {
    /// Caller-supplied post identifier
    pub post_id: String,
    /// Text content of the post
    pub post_text: String,
    /// Post language (en/de, default: en)
    #[serde(default)]
    pub language: Language,
}

impl AnalysisRequest {
    /// Check the request shape before any provider is contacted
    pub fn validate(&self, max_chars: usize) -> Result<(), String> {
        if self.post_id.trim().is_empty() {
            return Err("post_id must not be empty".to_string());
        }
        if self.post_text.trim().is_empty() {
            return Err("post_text must not be empty".to_string());
        }
        let chars = self.post_text.chars().count();
        if chars > max_chars {
            return Err(format!(
                "post_text is too long ({} characters, maximum {})",
                chars, max_chars
            ));
        }
        Ok(())
    }
}

/// Post type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum PostType {
    #[serde(rename = "Factual Claim")]
    FactualClaim,
    Opinion,
    Question,
    #[serde(rename = "Personal Update")]
    PersonalUpdate,
    Promotional,
}

/// Result of the classification stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClassificationResult {
    pub post_type: PostType,
    pub is_spam: bool,
}

impl ClassificationResult {
    /// Whether this post must carry a veracity analysis
    pub fn requires_veracity(&self) -> bool {
        self.post_type == PostType::FactualClaim && !self.is_spam
    }
}

/// Veracity verdict for a factual claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum VeracityStatus {
    #[serde(rename = "Factually Correct")]
    FactuallyCorrect,
    #[serde(rename = "Factually Incorrect")]
    FactuallyIncorrect,
    Unverifiable,
    #[serde(rename = "Partially Correct")]
    PartiallyCorrect,
}

/// How a veracity verdict was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum VerificationMethod {
    #[serde(rename = "Web Search")]
    WebSearch,
    None,
}

/// A web source backing a verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Source {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Result of the veracity stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VeracityResult {
    pub status: VeracityStatus,
    pub justification: String,
    pub verification_method: VerificationMethod,
    pub sources: Vec<Source>,
}

impl VeracityResult {
    /// Safe default used when verification could not be performed
    pub fn unverifiable(justification: impl Into<String>) -> Self {
        Self {
            status: VeracityStatus::Unverifiable,
            justification: justification.into(),
            verification_method: VerificationMethod::None,
            sources: Vec::new(),
        }
    }
}

/// Political tendency labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub enum PoliticalTendency {
    Left,
    #[serde(rename = "Center-Left")]
    CenterLeft,
    Center,
    #[serde(rename = "Center-Right")]
    CenterRight,
    Right,
    Neutral,
}

impl PoliticalTendency {
    pub const ALL: [PoliticalTendency; 6] = [
        PoliticalTendency::Left,
        PoliticalTendency::CenterLeft,
        PoliticalTendency::Center,
        PoliticalTendency::CenterRight,
        PoliticalTendency::Right,
        PoliticalTendency::Neutral,
    ];

    /// Canonical (English) label, also used as the score key
    pub fn label(&self) -> &'static str {
        match self {
            PoliticalTendency::Left => "Left",
            PoliticalTendency::CenterLeft => "Center-Left",
            PoliticalTendency::Center => "Center",
            PoliticalTendency::CenterRight => "Center-Right",
            PoliticalTendency::Right => "Right",
            PoliticalTendency::Neutral => "Neutral",
        }
    }
}

/// Communicative intents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Intent {
    Informative,
    Persuasive,
    Satirical,
    Provocative,
    Commercial,
    Entertaining,
}

impl Intent {
    pub const ALL: [Intent; 6] = [
        Intent::Informative,
        Intent::Persuasive,
        Intent::Satirical,
        Intent::Provocative,
        Intent::Commercial,
        Intent::Entertaining,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Intent::Informative => "Informative",
            Intent::Persuasive => "Persuasive",
            Intent::Satirical => "Satirical",
            Intent::Provocative => "Provocative",
            Intent::Commercial => "Commercial",
            Intent::Entertaining => "Entertaining",
        }
    }
}

/// Political tendency with per-label scores summing to ~1.0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PoliticalTendencyResult {
    pub primary: PoliticalTendency,
    pub scores: BTreeMap<String, f64>,
}

/// Result of the nuance stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NuanceResult {
    pub political_tendency: PoliticalTendencyResult,
    pub detected_intents: Vec<Intent>,
}

/// Aggregated evaluation report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AnalysisResponse {
    pub post_id: String,
    /// RFC 3339 UTC timestamp
    pub analysis_timestamp: String,
    pub language: Language,
    pub post_analysis: ClassificationResult,
    /// Present only for non-spam factual claims
    pub veracity_analysis: Option<VeracityResult>,
    /// Null when nuance analysis is disabled or failed entirely
    pub nuance_analysis: Option<NuanceResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults_to_english() {
        let req: AnalysisRequest =
            serde_json::from_str(r#"{"post_id":"p1","post_text":"Hello there"}"#).unwrap();
        assert_eq!(req.language, Language::En);
    }

    #[test]
    fn test_request_rejects_unknown_language() {
        let result = serde_json::from_str::<AnalysisRequest>(
            r#"{"post_id":"p1","post_text":"Hallo","language":"fr"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_request_validation() {
        let mut req = AnalysisRequest {
            post_id: "p1".to_string(),
            post_text: "   ".to_string(),
            language: Language::En,
        };
        assert!(req.validate(100).is_err());

        req.post_text = "x".repeat(101);
        assert!(req.validate(100).is_err());

        req.post_text = "The Earth revolves around the Sun.".to_string();
        assert!(req.validate(100).is_ok());
    }

    #[test]
    fn test_display_names_on_the_wire() {
        let classification = ClassificationResult {
            post_type: PostType::FactualClaim,
            is_spam: false,
        };
        let json = serde_json::to_value(&classification).unwrap();
        assert_eq!(json["post_type"], "Factual Claim");

        let veracity = VeracityResult::unverifiable("n/a");
        let json = serde_json::to_value(&veracity).unwrap();
        assert_eq!(json["status"], "Unverifiable");
        assert_eq!(json["verification_method"], "None");
        assert_eq!(json["sources"], serde_json::json!([]));
    }

    #[test]
    fn test_requires_veracity() {
        let claim = ClassificationResult {
            post_type: PostType::FactualClaim,
            is_spam: false,
        };
        assert!(claim.requires_veracity());

        let spam_claim = ClassificationResult {
            post_type: PostType::FactualClaim,
            is_spam: true,
        };
        assert!(!spam_claim.requires_veracity());

        let promo = ClassificationResult {
            post_type: PostType::Promotional,
            is_spam: false,
        };
        assert!(!promo.requires_veracity());
    }
}
