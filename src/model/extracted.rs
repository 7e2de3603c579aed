//! LLM-extractable models for the analysis stages
//!
//! Each shape doubles as the response contract handed to the provider: its
//! JSON schema is embedded in the prompt and checked before decoding.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::labels::{parse_intent, parse_political, parse_post_type};
use crate::provider::StructuredOutput;

/// Post type classification as returned by the model
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedClassification {
    /// One of the offered post type labels
    pub primary_label: String,
    /// Confidence in the primary label (0.0 - 1.0)
    pub confidence: f64,
    /// Optional scores for every offered label
    #[serde(default)]
    pub scores: BTreeMap<String, f64>,
    /// Explicit spam verdict, if the model gave one
    #[serde(default)]
    pub is_spam: Option<bool>,
}

impl StructuredOutput for ExtractedClassification {
    const NAME: &'static str = "classification";

    fn validate(&self) -> Result<(), String> {
        if parse_post_type(&self.primary_label).is_none() {
            return Err(format!("unknown post type label '{}'", self.primary_label));
        }
        if !self.confidence.is_finite() {
            return Err("confidence is not a finite number".to_string());
        }
        Ok(())
    }
}

/// Political tendency scores as returned by the model
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedPolitical {
    /// Score per offered political label
    pub scores: BTreeMap<String, f64>,
}

impl StructuredOutput for ExtractedPolitical {
    const NAME: &'static str = "political_analysis";

    fn validate(&self) -> Result<(), String> {
        if !self.scores.keys().any(|k| parse_political(k).is_some()) {
            return Err("no recognised political label in scores".to_string());
        }
        Ok(())
    }
}

/// Intent scores as returned by the model
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedIntents {
    /// Score per offered intent label
    pub scores: BTreeMap<String, f64>,
}

impl StructuredOutput for ExtractedIntents {
    const NAME: &'static str = "intent_analysis";

    fn validate(&self) -> Result<(), String> {
        if !self.scores.keys().any(|k| parse_intent(k).is_some()) {
            return Err("no recognised intent label in scores".to_string());
        }
        Ok(())
    }
}

/// Claim verdict as returned by the model
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedVeracity {
    /// Factually Correct | Factually Incorrect | Partially Correct | Unverifiable
    pub status: String,
    /// Explanation of the verdict grounded in the search results
    pub justification: String,
    /// Search results the verdict relies on
    #[serde(default)]
    pub sources: Vec<ExtractedSource>,
}

/// A source cited by the model
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedSource {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub snippet: String,
}

impl StructuredOutput for ExtractedVeracity {
    const NAME: &'static str = "veracity";
    const MAX_TOKENS: u32 = 4096;

    fn validate(&self) -> Result<(), String> {
        if self.justification.trim().is_empty() {
            return Err("justification is empty".to_string());
        }
        Ok(())
    }
}
