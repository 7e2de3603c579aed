//! Veracity stage: web evidence gathering followed by claim verification

use std::collections::HashSet;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};

use crate::model::labels::parse_veracity_status;
use crate::model::{
    ExtractedSource, ExtractedVeracity, Language, SearchConfig, Source, VeracityResult,
    VeracityStatus, VerificationMethod,
};
use crate::provider::ProviderClient;
use crate::search::query::{
    dedupe_by_url, derive_queries, filter_and_rank, sanitize_quotes, truncate_chars,
};
use crate::search::{SearchAdapter, SearchError};
use crate::service::prompts::{PromptStore, TemplateName};

use super::StageOutcome;

/// Snippets handed back to the caller are capped at this length
const MAX_SOURCE_SNIPPET_CHARS: usize = 200;
/// Justification words must be longer than this to link a source
const MIN_JUSTIFICATION_WORD_LENGTH: usize = 4;
/// Shared words needed before a search result counts as cited
const MIN_SHARED_WORDS: usize = 2;
/// Results used when no search result can be linked to the justification
const FALLBACK_SOURCES: usize = 2;

const GERMAN_MONTHS: [&str; 12] = [
    "Januar",
    "Februar",
    "März",
    "April",
    "Mai",
    "Juni",
    "Juli",
    "August",
    "September",
    "Oktober",
    "November",
    "Dezember",
];

/// Everything the veracity stage needs for one request
pub(super) struct VeracityStage<'a> {
    pub provider: &'a ProviderClient,
    pub search: Option<&'a dyn SearchAdapter>,
    pub prompts: &'a PromptStore,
    pub search_config: &'a SearchConfig,
    pub search_timeout: Duration,
    pub enabled: bool,
}

impl VeracityStage<'_> {
    /// Verify a claim; never fails, degrading to `Unverifiable` instead
    pub async fn run(
        &self,
        claim: &str,
        language: Language,
        today: NaiveDate,
    ) -> StageOutcome<VeracityResult> {
        if !self.enabled {
            return StageOutcome::Degraded {
                result: VeracityResult::unverifiable(disabled_justification(language)),
                reason: "veracity check disabled".to_string(),
            };
        }

        let evidence = self.gather_evidence(claim, language).await;
        let search_context = match &evidence {
            Ok(results) => build_search_context(results, language),
            Err(_) => search_failed_context(language),
        };

        let current_date = format_current_date(today, language);
        let prompt = match self.prompts.render(
            TemplateName::Veracity,
            language,
            &[
                ("claim", claim),
                ("current_date", current_date.as_str()),
                ("search_context", search_context.as_str()),
            ],
        ) {
            Ok(prompt) => prompt,
            Err(e) => {
                return StageOutcome::Degraded {
                    result: VeracityResult::unverifiable(unavailable_justification(language)),
                    reason: e.to_string(),
                };
            }
        };

        let extracted = match self.provider.generate::<ExtractedVeracity>(&prompt).await {
            Ok(extracted) => extracted,
            Err(e) => {
                return StageOutcome::Degraded {
                    result: VeracityResult::unverifiable(unavailable_justification(language)),
                    reason: e.to_string(),
                };
            }
        };

        match evidence {
            Ok(results) => {
                let status = parse_veracity_status(&extracted.status).unwrap_or_else(|| {
                    tracing::warn!(status = %extracted.status, "Unknown veracity status, using Unverifiable");
                    VeracityStatus::Unverifiable
                });
                let sources = select_sources(&extracted.sources, &results, &extracted.justification);

                StageOutcome::Completed(VeracityResult {
                    status,
                    justification: extracted.justification,
                    verification_method: VerificationMethod::WebSearch,
                    sources,
                })
            }
            // Without evidence the verdict cannot stand; keep only the explanation
            Err(e) => StageOutcome::Degraded {
                result: VeracityResult::unverifiable(extracted.justification),
                reason: e.to_string(),
            },
        }
    }

    /// Run the derived queries and keep the most relevant unique results
    ///
    /// Fails only when search is disabled or every query failed.
    async fn gather_evidence(
        &self,
        claim: &str,
        language: Language,
    ) -> Result<Vec<Source>, SearchError> {
        let Some(search) = self.search else {
            tracing::warn!("Web search disabled, claim cannot be verified against sources");
            return Err(SearchError::Unavailable("web search disabled".to_string()));
        };

        let queries = derive_queries(claim, self.search_config.max_queries);
        let spacing = Duration::from_millis(self.search_config.query_spacing_ms);
        let mut results = Vec::new();
        let mut last_error = None;
        let mut succeeded = 0;

        for (i, query) in queries.iter().enumerate() {
            if i > 0 && !spacing.is_zero() {
                tokio::time::sleep(spacing).await;
            }

            let outcome = match tokio::time::timeout(
                self.search_timeout,
                search.search(query, self.search_config.results_per_query, language),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(SearchError::Timeout(self.search_timeout)),
            };

            match outcome {
                Ok(found) => {
                    tracing::debug!(
                        query_index = i + 1,
                        query_count = queries.len(),
                        results = found.len(),
                        "Search query completed"
                    );
                    succeeded += 1;
                    results.extend(found);
                }
                Err(e) => {
                    tracing::warn!(
                        search = search.name(),
                        query_index = i + 1,
                        error = %e,
                        "Search query failed"
                    );
                    // Quota errors will not clear up within this request
                    let quota = matches!(e, SearchError::QuotaExceeded);
                    last_error = Some(e);
                    if quota {
                        break;
                    }
                }
            }
        }

        if succeeded == 0 {
            return Err(last_error
                .unwrap_or_else(|| SearchError::Unavailable("no search queries".to_string())));
        }

        let unique = dedupe_by_url(results);
        let unique_count = unique.len();
        let ranked = filter_and_rank(unique, claim, self.search_config.max_sources);

        tracing::info!(
            queries = queries.len(),
            succeeded = succeeded,
            unique_results = unique_count,
            sources = ranked.len(),
            "Evidence gathered"
        );

        Ok(ranked)
    }
}

/// Numbered search results for the verification prompt
pub(super) fn build_search_context(results: &[Source], language: Language) -> String {
    if results.is_empty() {
        return match language {
            Language::En => "\n\n[NONE] NO WEB SEARCH RESULTS FOUND\n\nNo evidence is available for this claim. \
                 Answer Unverifiable unless the claim is settled, widely known fact."
                .to_string(),
            Language::De => "\n\n[NONE] KEINE WEB-SUCHERGEBNISSE GEFUNDEN\n\nZu dieser Behauptung liegen keine Belege vor. \
                 Antworte mit Unverifiable, sofern es sich nicht um gesichertes Allgemeinwissen handelt."
                .to_string(),
        };
    }

    let blocks: Vec<String> = results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "[SOURCE {}] Title: {}\nURL: {}\nSnippet: {}",
                i + 1,
                sanitize_quotes(&r.title),
                r.url,
                sanitize_quotes(&r.snippet)
            )
        })
        .collect();

    let footer = match language {
        Language::En => "[OK] The above web search results are your ONLY source of information.",
        Language::De => "[OK] Die obigen Web-Suchergebnisse sind deine EINZIGE Informationsquelle.",
    };

    format!(
        "\n\n=== WEB SEARCH RESULTS ===\n{}\n\n{}",
        blocks.join("\n\n"),
        footer
    )
}

fn search_failed_context(language: Language) -> String {
    match language {
        Language::En => "\n\n[UNAVAILABLE] WEB SEARCH COULD NOT BE PERFORMED\n\nNo evidence could be gathered. \
             Explain briefly what evidence would be needed to verify the claim."
            .to_string(),
        Language::De => "\n\n[UNAVAILABLE] DIE WEBSUCHE KONNTE NICHT DURCHGEFÜHRT WERDEN\n\nEs konnten keine Belege gesammelt werden. \
             Erkläre kurz, welche Belege zur Überprüfung nötig wären."
            .to_string(),
    }
}

fn unavailable_justification(language: Language) -> &'static str {
    match language {
        Language::En => "The claim could not be verified because the analysis service was unavailable.",
        Language::De => "Die Behauptung konnte nicht überprüft werden, da der Analysedienst nicht verfügbar war.",
    }
}

fn disabled_justification(language: Language) -> &'static str {
    match language {
        Language::En => "Fact-checking is disabled for this service.",
        Language::De => "Die Faktenprüfung ist für diesen Dienst deaktiviert.",
    }
}

/// Date string for the `{current_date}` variable
pub(super) fn format_current_date(date: NaiveDate, language: Language) -> String {
    match language {
        Language::En => date.format("%B %d, %Y").to_string(),
        Language::De => format!(
            "{:02}. {} {}",
            date.day(),
            GERMAN_MONTHS[date.month0() as usize],
            date.year()
        ),
    }
}

/// Pick the sources to report for a verdict
///
/// Sources cited by the model are kept only when they are among the search
/// results. Otherwise results are linked through words shared with the
/// justification, falling back to the top results.
pub(super) fn select_sources(
    cited: &[ExtractedSource],
    results: &[Source],
    justification: &str,
) -> Vec<Source> {
    if results.is_empty() {
        return Vec::new();
    }

    let mut seen = HashSet::new();
    let grounded: Vec<Source> = cited
        .iter()
        .filter_map(|c| {
            let url = c.url.trim();
            results.iter().find(|r| !url.is_empty() && r.url.trim() == url)
        })
        .filter(|r| seen.insert(r.url.clone()))
        .map(to_reported_source)
        .collect();

    if !grounded.is_empty() {
        return grounded;
    }

    if !cited.is_empty() {
        tracing::warn!(
            cited = cited.len(),
            "Cited sources not found in search results, mapping from justification"
        );
    }

    let justification_lower = justification.to_lowercase();
    let words: HashSet<&str> = justification_lower
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| w.chars().count() > MIN_JUSTIFICATION_WORD_LENGTH)
        .collect();

    let linked: Vec<Source> = results
        .iter()
        .filter(|r| {
            let haystack = format!("{} {}", r.title, r.snippet).to_lowercase();
            words.iter().filter(|w| haystack.contains(**w)).count() >= MIN_SHARED_WORDS
        })
        .map(to_reported_source)
        .collect();

    if !linked.is_empty() {
        return linked;
    }

    results
        .iter()
        .take(FALLBACK_SOURCES)
        .map(to_reported_source)
        .collect()
}

fn to_reported_source(result: &Source) -> Source {
    Source {
        title: result.title.clone(),
        url: result.url.clone(),
        snippet: truncate_chars(&result.snippet, MAX_SOURCE_SNIPPET_CHARS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(title: &str, url: &str, snippet: &str) -> Source {
        Source {
            title: title.to_string(),
            url: url.to_string(),
            snippet: snippet.to_string(),
        }
    }

    fn cited(url: &str) -> ExtractedSource {
        ExtractedSource {
            title: "whatever the model wrote".to_string(),
            url: url.to_string(),
            snippet: String::new(),
        }
    }

    fn results() -> Vec<Source> {
        vec![
            result(
                "Earth's orbit",
                "https://nasa.example/orbit",
                "The Earth completes one orbit around the Sun every 365.25 days.",
            ),
            result(
                "Heliocentrism",
                "https://encyclopedia.example/helio",
                "Copernicus proposed that the planets revolve around the Sun.",
            ),
            result(
                "Seasons",
                "https://weather.example/seasons",
                "Seasons are caused by the tilt of the axis.",
            ),
        ]
    }

    #[test]
    fn test_cited_sources_must_be_search_results() {
        let sources = select_sources(
            &[cited("https://encyclopedia.example/helio"), cited("https://made-up.example")],
            &results(),
            "Confirmed.",
        );
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].url, "https://encyclopedia.example/helio");
        assert_eq!(sources[0].title, "Heliocentrism");
    }

    #[test]
    fn test_sources_linked_through_justification() {
        let sources = select_sources(
            &[cited("https://made-up.example")],
            &results(),
            "Copernicus showed the planets revolve around the Sun.",
        );
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].url, "https://encyclopedia.example/helio");
    }

    #[test]
    fn test_fallback_to_top_results() {
        let sources = select_sources(&[], &results(), "Yes.");
        assert_eq!(sources.len(), FALLBACK_SOURCES);
        assert_eq!(sources[0].url, "https://nasa.example/orbit");
    }

    #[test]
    fn test_no_results_means_no_sources() {
        let sources = select_sources(&[cited("https://nasa.example/orbit")], &[], "Yes.");
        assert!(sources.is_empty());
    }

    #[test]
    fn test_snippets_are_capped() {
        let long = result("Long", "https://long.example", &"a".repeat(500));
        let sources = select_sources(&[cited("https://long.example")], &[long], "");
        assert_eq!(sources[0].snippet.chars().count(), MAX_SOURCE_SNIPPET_CHARS);
    }

    #[test]
    fn test_search_context_variants() {
        let with_results = build_search_context(&results(), Language::En);
        assert!(with_results.contains("[SOURCE 1] Title: Earth's orbit"));
        assert!(with_results.contains("[SOURCE 3]"));
        assert!(with_results.contains("ONLY source"));

        let empty = build_search_context(&[], Language::De);
        assert!(empty.contains("KEINE WEB-SUCHERGEBNISSE"));

        assert!(search_failed_context(Language::En).contains("COULD NOT BE PERFORMED"));
    }

    #[test]
    fn test_current_date_formats() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        assert_eq!(format_current_date(date, Language::En), "March 07, 2026");
        assert_eq!(format_current_date(date, Language::De), "07. März 2026");
    }
}
