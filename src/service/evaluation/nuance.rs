//! Nuance stage: political tendency and communicative intent

use std::collections::BTreeMap;

use futures::future::join;

use crate::model::labels::{intent_labels, joined, parse_intent, parse_political, political_labels};
use crate::model::{
    ExtractedIntents, ExtractedPolitical, Intent, Language, NuanceResult, PoliticalTendency,
    PoliticalTendencyResult,
};
use crate::provider::ProviderClient;
use crate::service::prompts::{PromptStore, TemplateName};

use super::StageOutcome;

/// Decimal places kept for normalised political scores
const SCORE_PRECISION: f64 = 10_000.0;

pub(super) struct NuanceStage<'a> {
    pub provider: &'a ProviderClient,
    pub prompts: &'a PromptStore,
    pub intent_threshold: f64,
    pub enabled: bool,
}

impl NuanceStage<'_> {
    /// Analyse political tendency and intents concurrently
    ///
    /// One failed half degrades to its neutral default; both failing fails
    /// the stage.
    pub async fn run(&self, text: &str, language: Language) -> StageOutcome<NuanceResult> {
        if !self.enabled {
            return StageOutcome::Skipped;
        }

        let (political, intents) = join(
            self.political(text, language),
            self.intents(text, language),
        )
        .await;

        match (political, intents) {
            (Ok(political_tendency), Ok(detected_intents)) => StageOutcome::Completed(NuanceResult {
                political_tendency,
                detected_intents,
            }),
            (Ok(political_tendency), Err(reason)) => StageOutcome::Degraded {
                result: NuanceResult {
                    political_tendency,
                    detected_intents: Vec::new(),
                },
                reason: format!("intent analysis failed: {}", reason),
            },
            (Err(reason), Ok(detected_intents)) => StageOutcome::Degraded {
                result: NuanceResult {
                    political_tendency: neutral_political(),
                    detected_intents,
                },
                reason: format!("political analysis failed: {}", reason),
            },
            (Err(political), Err(intents)) => StageOutcome::Failed(format!(
                "political analysis failed: {}; intent analysis failed: {}",
                political, intents
            )),
        }
    }

    async fn political(
        &self,
        text: &str,
        language: Language,
    ) -> Result<PoliticalTendencyResult, String> {
        let labels = joined(political_labels(language));
        let prompt = self
            .prompts
            .render(
                TemplateName::PoliticalAnalysis,
                language,
                &[("text", text), ("labels", labels.as_str())],
            )
            .map_err(|e| e.to_string())?;

        let extracted = self
            .provider
            .generate::<ExtractedPolitical>(&prompt)
            .await
            .map_err(|e| e.to_string())?;

        let result = normalize_political(&extracted.scores);
        tracing::debug!(primary = ?result.primary, "Political tendency analysed");
        Ok(result)
    }

    async fn intents(&self, text: &str, language: Language) -> Result<Vec<Intent>, String> {
        let labels = joined(intent_labels(language));
        let prompt = self
            .prompts
            .render(
                TemplateName::IntentAnalysis,
                language,
                &[("text", text), ("labels", labels.as_str())],
            )
            .map_err(|e| e.to_string())?;

        let extracted = self
            .provider
            .generate::<ExtractedIntents>(&prompt)
            .await
            .map_err(|e| e.to_string())?;

        let intents = detect_intents(&extracted.scores, self.intent_threshold);
        tracing::debug!(intents = ?intents, "Intents analysed");
        Ok(intents)
    }
}

/// Uniform scores with a neutral primary tendency
pub(super) fn neutral_political() -> PoliticalTendencyResult {
    let share = round_score(1.0 / PoliticalTendency::ALL.len() as f64);
    PoliticalTendencyResult {
        primary: PoliticalTendency::Neutral,
        scores: PoliticalTendency::ALL
            .iter()
            .map(|t| (t.label().to_string(), share))
            .collect(),
    }
}

/// Map raw model scores onto canonical labels and normalise them to sum to 1
///
/// Unknown labels are dropped, missing labels count as 0, and negative or
/// non-finite scores are clamped to 0. The primary tendency is the highest
/// score, earlier labels winning ties.
pub(super) fn normalize_political(raw: &BTreeMap<String, f64>) -> PoliticalTendencyResult {
    let mut totals: BTreeMap<PoliticalTendency, f64> =
        PoliticalTendency::ALL.iter().map(|t| (*t, 0.0)).collect();

    for (label, score) in raw {
        if let Some(tendency) = parse_political(label) {
            *totals.entry(tendency).or_insert(0.0) += sanitize_score(*score);
        }
    }

    let sum: f64 = totals.values().sum();
    if sum <= 0.0 || !sum.is_finite() {
        return neutral_political();
    }

    let mut primary = PoliticalTendency::Neutral;
    let mut best = f64::NEG_INFINITY;
    for tendency in PoliticalTendency::ALL {
        let score = totals.get(&tendency).copied().unwrap_or(0.0);
        if score > best {
            best = score;
            primary = tendency;
        }
    }

    PoliticalTendencyResult {
        primary,
        scores: PoliticalTendency::ALL
            .iter()
            .map(|t| {
                let score = totals.get(t).copied().unwrap_or(0.0);
                (t.label().to_string(), round_score(score / sum))
            })
            .collect(),
    }
}

/// Intents scoring above `threshold`, in label order
pub(super) fn detect_intents(raw: &BTreeMap<String, f64>, threshold: f64) -> Vec<Intent> {
    let mut best: BTreeMap<&'static str, f64> = BTreeMap::new();
    for (label, score) in raw {
        if let Some(intent) = parse_intent(label) {
            let entry = best.entry(intent.label()).or_insert(0.0);
            *entry = entry.max(sanitize_score(*score));
        }
    }

    Intent::ALL
        .into_iter()
        .filter(|i| best.get(i.label()).is_some_and(|s| *s > threshold))
        .collect()
}

fn sanitize_score(score: f64) -> f64 {
    if score.is_finite() { score.max(0.0) } else { 0.0 }
}

fn round_score(score: f64) -> f64 {
    (score * SCORE_PRECISION).round() / SCORE_PRECISION
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn sum(result: &PoliticalTendencyResult) -> f64 {
        result.scores.values().sum()
    }

    #[test]
    fn test_normalize_fills_and_scales() {
        let result = normalize_political(&scores(&[("Left", 2.0), ("Center", 6.0)]));
        assert_eq!(result.primary, PoliticalTendency::Center);
        assert_eq!(result.scores.len(), PoliticalTendency::ALL.len());
        assert_eq!(result.scores["Center"], 0.75);
        assert_eq!(result.scores["Left"], 0.25);
        assert_eq!(result.scores["Right"], 0.0);
        assert!((sum(&result) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_normalize_maps_german_labels() {
        let result = normalize_political(&scores(&[
            ("Politisch Mitte-Rechts", 0.5),
            ("Politisch Neutral", 0.3),
            ("Unbekannt", 0.9),
        ]));
        assert_eq!(result.primary, PoliticalTendency::CenterRight);
        assert_eq!(result.scores["Center-Right"], 0.625);
    }

    #[test]
    fn test_normalize_clamps_bad_scores() {
        let result = normalize_political(&scores(&[
            ("Left", -3.0),
            ("Right", f64::NAN),
            ("Neutral", 0.4),
        ]));
        assert_eq!(result.primary, PoliticalTendency::Neutral);
        assert_eq!(result.scores["Neutral"], 1.0);
        assert_eq!(result.scores["Left"], 0.0);
    }

    #[test]
    fn test_ties_resolve_in_label_order() {
        let result = normalize_political(&scores(&[("Right", 0.5), ("Left", 0.5)]));
        assert_eq!(result.primary, PoliticalTendency::Left);
    }

    #[test]
    fn test_all_zero_is_neutral() {
        let result = normalize_political(&scores(&[("Left", 0.0)]));
        assert_eq!(result, neutral_political());
        assert!((sum(&result) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_detect_intents_threshold_and_order() {
        let raw = scores(&[
            ("Commercial", 0.8),
            ("Informativ", 0.5),
            ("Satirical", 0.3),
            ("Persuasive", 0.1),
            ("Sarcastic", 0.9),
        ]);
        assert_eq!(
            detect_intents(&raw, 0.3),
            vec![Intent::Informative, Intent::Commercial]
        );
        assert!(detect_intents(&raw, 0.9).is_empty());
    }
}
