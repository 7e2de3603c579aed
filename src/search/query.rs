//! Search query derivation and result ranking

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::model::Source;

/// Longest query sent to the search backend
const MAX_QUERY_CHARS: usize = 300;
const MIN_SNIPPET_LENGTH: usize = 50;
const MIN_URL_LENGTH: usize = 5;
/// Claim words must be longer than this to count as a match
const MIN_WORD_LENGTH_FOR_MATCHING: usize = 3;

static PROPER_NOUN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\b\p{Lu}\p{Ll}+(?:\s+\p{Lu}\p{Ll}+)*\b").ok());
static YEAR: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").ok());
static HTML_TAG: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"<[^>]+>").ok());

/// Derive search queries from a claim, the claim itself first
pub fn derive_queries(claim: &str, max_queries: usize) -> Vec<String> {
    let mut queries = vec![truncate_chars(claim.trim(), MAX_QUERY_CHARS)];

    let proper_nouns: Vec<&str> = PROPER_NOUN
        .as_ref()
        .map(|re| re.find_iter(claim).map(|m| m.as_str()).collect())
        .unwrap_or_default();

    for noun in &proper_nouns {
        if noun.chars().count() > 3 {
            queries.push((*noun).to_string());
        }
    }

    if let (Some(re), Some(noun)) = (YEAR.as_ref(), proper_nouns.first()) {
        for year in re.find_iter(claim) {
            queries.push(format!("{} {}", noun, year.as_str()));
        }
    }

    let mut seen = HashSet::new();
    queries
        .into_iter()
        .filter(|q| q.chars().count() > 2 && seen.insert(q.to_lowercase()))
        .take(max_queries.max(1))
        .collect()
}

/// Keep the first result for each URL
pub fn dedupe_by_url(results: Vec<Source>) -> Vec<Source> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter(|r| seen.insert(r.url.clone()))
        .collect()
}

/// Drop thin or irrelevant results and rank the rest by relevance to the claim
pub fn filter_and_rank(results: Vec<Source>, claim: &str, max_results: usize) -> Vec<Source> {
    let claim_lower = claim.to_lowercase();
    let claim_words: HashSet<&str> = claim_lower
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| w.chars().count() > MIN_WORD_LENGTH_FOR_MATCHING)
        .collect();

    let total = results.len();
    let mut scored: Vec<(usize, usize, Source)> = results
        .into_iter()
        .enumerate()
        .filter_map(|(rank, result)| {
            let score = relevance_score(&result, &claim_words)?;
            Some((score, rank, result))
        })
        .collect();

    tracing::debug!(
        total = total,
        accepted = scored.len(),
        "Filtered search results"
    );

    // Highest score first; backend order breaks ties
    scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    scored
        .into_iter()
        .take(max_results)
        .map(|(_, _, result)| result)
        .collect()
}

fn relevance_score(result: &Source, claim_words: &HashSet<&str>) -> Option<usize> {
    let snippet_len = result.snippet.trim().chars().count();
    if snippet_len < MIN_SNIPPET_LENGTH {
        return None;
    }
    if result.url.trim().len() < MIN_URL_LENGTH || !is_web_url(&result.url) {
        return None;
    }

    let mut score = if snippet_len >= 100 { 2 } else { 1 };

    let snippet_lower = result.snippet.to_lowercase();
    let title_lower = result.title.to_lowercase();
    let snippet_matches = claim_words
        .iter()
        .filter(|w| snippet_lower.contains(**w))
        .count();
    let title_matches = claim_words
        .iter()
        .filter(|w| title_lower.contains(**w))
        .count();

    score += snippet_matches * 2 + title_matches * 3;
    Some(score)
}

fn is_web_url(raw: &str) -> bool {
    Url::parse(raw.trim())
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

/// Remove HTML tags from search backend markup
pub fn strip_html(text: &str) -> String {
    match HTML_TAG.as_ref() {
        Some(re) => re.replace_all(text, "").into_owned(),
        None => text.to_string(),
    }
}

/// Normalise typographic quotes so prompt text stays JSON-friendly
pub fn sanitize_quotes(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{00AB}' | '\u{00BB}' => '\'',
            '"' => '\'',
            other => other,
        })
        .collect()
}

/// Truncate to at most `max` characters on a char boundary
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
