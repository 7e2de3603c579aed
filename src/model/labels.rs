//! Localised label sets and mapping back to canonical enums
//!
//! Prompts list labels in the post's language; model answers may use either
//! language and are mapped back to the canonical (English) values.

use crate::model::{Intent, Language, PoliticalTendency, PostType, VeracityStatus};

const EN_POST_TYPES: &[&str] = &[
    "Factual Claim",
    "Opinion",
    "Question",
    "Personal Update",
    "Promotional",
];

const DE_POST_TYPES: &[&str] = &[
    "Faktische Behauptung",
    "Meinungsäußerung",
    "Frage",
    "Persönliche Mitteilung",
    "Werbung / Spam",
];

const EN_POLITICAL_LABELS: &[&str] = &[
    "Left",
    "Center-Left",
    "Center",
    "Center-Right",
    "Right",
    "Neutral",
];

const DE_POLITICAL_LABELS: &[&str] = &[
    "Politisch Links",
    "Politisch Mitte-Links",
    "Politisch Mitte",
    "Politisch Mitte-Rechts",
    "Politisch Rechts",
    "Politisch Neutral",
];

const EN_INTENT_LABELS: &[&str] = &[
    "Informative",
    "Persuasive",
    "Satirical",
    "Provocative",
    "Commercial",
    "Entertaining",
];

const DE_INTENT_LABELS: &[&str] = &[
    "Informativ",
    "Überzeugend",
    "Satirisch",
    "Provozierend",
    "Kommerziell",
    "Unterhaltend",
];

pub fn post_type_labels(language: Language) -> &'static [&'static str] {
    match language {
        Language::En => EN_POST_TYPES,
        Language::De => DE_POST_TYPES,
    }
}

pub fn political_labels(language: Language) -> &'static [&'static str] {
    match language {
        Language::En => EN_POLITICAL_LABELS,
        Language::De => DE_POLITICAL_LABELS,
    }
}

pub fn intent_labels(language: Language) -> &'static [&'static str] {
    match language {
        Language::En => EN_INTENT_LABELS,
        Language::De => DE_INTENT_LABELS,
    }
}

/// Comma-joined label list for the `{labels}` template variable
pub fn joined(labels: &[&str]) -> String {
    labels.join(", ")
}

fn normalize(label: &str) -> String {
    label.trim().trim_matches('"').to_lowercase()
}

/// Map a post type label in either language to its canonical value
pub fn parse_post_type(label: &str) -> Option<PostType> {
    match normalize(label).as_str() {
        "factual claim" | "faktische behauptung" => Some(PostType::FactualClaim),
        "opinion" | "meinungsäußerung" | "meinungsaeusserung" => Some(PostType::Opinion),
        "question" | "frage" => Some(PostType::Question),
        "personal update" | "persönliche mitteilung" | "persoenliche mitteilung" => {
            Some(PostType::PersonalUpdate)
        }
        "promotional" | "promotion" | "werbung / spam" | "werbung" | "spam" => {
            Some(PostType::Promotional)
        }
        _ => None,
    }
}

pub fn parse_political(label: &str) -> Option<PoliticalTendency> {
    let normalized = normalize(label);
    let stripped = normalized
        .strip_prefix("politisch ")
        .unwrap_or(normalized.as_str());
    match stripped {
        "left" | "links" => Some(PoliticalTendency::Left),
        "center-left" | "centre-left" | "mitte-links" => Some(PoliticalTendency::CenterLeft),
        "center" | "centre" | "mitte" => Some(PoliticalTendency::Center),
        "center-right" | "centre-right" | "mitte-rechts" => Some(PoliticalTendency::CenterRight),
        "right" | "rechts" => Some(PoliticalTendency::Right),
        "neutral" => Some(PoliticalTendency::Neutral),
        _ => None,
    }
}

pub fn parse_intent(label: &str) -> Option<Intent> {
    match normalize(label).as_str() {
        "informative" | "informativ" => Some(Intent::Informative),
        "persuasive" | "überzeugend" | "ueberzeugend" => Some(Intent::Persuasive),
        "satirical" | "satirisch" => Some(Intent::Satirical),
        "provocative" | "provozierend" => Some(Intent::Provocative),
        "commercial" | "kommerziell" => Some(Intent::Commercial),
        "entertaining" | "unterhaltend" => Some(Intent::Entertaining),
        _ => None,
    }
}

/// Map a veracity verdict, including legacy and German spellings
pub fn parse_veracity_status(label: &str) -> Option<VeracityStatus> {
    match normalize(label).as_str() {
        "factually correct" | "correct" | "true" | "faktisch korrekt" | "wahr" => {
            Some(VeracityStatus::FactuallyCorrect)
        }
        "factually incorrect" | "incorrect" | "false" | "untruth" | "faktisch falsch"
        | "falsch" | "unwahr" => Some(VeracityStatus::FactuallyIncorrect),
        "partially correct" | "mixed" | "mixed/partially correct" | "misleading"
        | "teilweise korrekt" | "irreführend" => Some(VeracityStatus::PartiallyCorrect),
        "unverifiable" | "nicht überprüfbar" | "nicht verifizierbar" => {
            Some(VeracityStatus::Unverifiable)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_localised_post_type_maps() {
        for language in [Language::En, Language::De] {
            for label in post_type_labels(language) {
                assert!(parse_post_type(label).is_some(), "unmapped: {label}");
            }
        }
        assert_eq!(parse_post_type("Promotion"), Some(PostType::Promotional));
        assert_eq!(parse_post_type("Weather report"), None);
    }

    #[test]
    fn test_every_localised_political_label_maps() {
        for (en, de) in EN_POLITICAL_LABELS.iter().zip(DE_POLITICAL_LABELS) {
            assert_eq!(parse_political(en), parse_political(de));
            assert!(parse_political(en).is_some());
        }
    }

    #[test]
    fn test_every_localised_intent_maps() {
        for (i, (en, de)) in EN_INTENT_LABELS.iter().zip(DE_INTENT_LABELS).enumerate() {
            assert_eq!(parse_intent(en), Some(Intent::ALL[i]));
            assert_eq!(parse_intent(de), Some(Intent::ALL[i]));
        }
    }

    #[test]
    fn test_veracity_aliases() {
        assert_eq!(
            parse_veracity_status("Untruth"),
            Some(VeracityStatus::FactuallyIncorrect)
        );
        assert_eq!(
            parse_veracity_status("Misleading"),
            Some(VeracityStatus::PartiallyCorrect)
        );
        assert_eq!(
            parse_veracity_status("factually correct"),
            Some(VeracityStatus::FactuallyCorrect)
        );
        assert_eq!(parse_veracity_status("probably"), None);
    }

    #[test]
    fn test_joined_labels() {
        assert_eq!(
            joined(post_type_labels(Language::En)),
            "Factual Claim, Opinion, Question, Personal Update, Promotional"
        );
    }
}
