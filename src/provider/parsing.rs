//! Recovery of JSON objects from free-form model text
//!
//! Models wrap JSON in code fences, surround it with prose, or leave inner
//! quotes unescaped. Strategies are tried in order: direct parse, fence
//! stripping, first balanced object, quote repair.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::{ProviderError, ResponseSchema};

static OPENING_FENCE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^```[A-Za-z]*\s*").ok());
static CLOSING_FENCE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\s*```\s*$").ok());

/// Extract the structured object for `schema` from raw model text
pub fn extract_structured(text: &str, schema: &ResponseSchema) -> Result<Value, ProviderError> {
    let value = extract_json(text).ok_or_else(|| {
        ProviderError::MalformedOutput(format!(
            "{} output contains no parsable JSON object ({} chars)",
            schema.name,
            text.len()
        ))
    })?;

    schema.check(&value).map_err(ProviderError::MalformedOutput)?;
    Ok(value)
}

/// Try every strategy in turn; `None` if the text holds no JSON object
pub fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        tracing::trace!("Direct JSON parse succeeded");
        return Some(value);
    }

    let cleaned = strip_code_fences(trimmed);
    if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
        tracing::debug!("JSON parse succeeded after stripping code fences");
        return Some(value);
    }

    let candidate = first_balanced_object(&cleaned).unwrap_or(cleaned.as_str());
    if let Ok(value) = serde_json::from_str::<Value>(candidate) {
        tracing::debug!("JSON parse succeeded on extracted object");
        return Some(value);
    }

    let repaired = repair_inner_quotes(candidate);
    match serde_json::from_str::<Value>(&repaired) {
        Ok(value) => {
            tracing::debug!("JSON parse succeeded after quote repair");
            Some(value)
        }
        Err(e) => {
            tracing::debug!(error = %e, "All JSON recovery strategies failed");
            None
        }
    }
}

/// Remove a leading ```lang fence and a trailing ``` fence
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }

    let without_open = match OPENING_FENCE.as_ref() {
        Some(re) => re.replace(trimmed, "").into_owned(),
        None => trimmed.to_string(),
    };
    let without_close = match CLOSING_FENCE.as_ref() {
        Some(re) => re.replace(&without_open, "").into_owned(),
        None => without_open,
    };

    without_close.trim().to_string()
}

/// Slice out the first `{...}` whose braces balance, ignoring braces in strings
pub fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    // Unbalanced: fall back to the last closing brace
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Escape quotes that appear inside string values
///
/// A quote closes a string only when the next non-space character is a
/// JSON delimiter (`,` `}` `]` `:`); any other quote inside a string is
/// escaped.
pub fn repair_inner_quotes(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 16);
    let mut in_string = false;
    let mut escaped = false;

    for (i, &ch) in chars.iter().enumerate() {
        if escaped {
            out.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' => {
                out.push(ch);
                escaped = true;
            }
            '"' if !in_string => {
                out.push(ch);
                in_string = true;
            }
            '"' => {
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if matches!(next, None | Some(',') | Some('}') | Some(']') | Some(':')) {
                    out.push(ch);
                    in_string = false;
                } else {
                    out.push_str("\\\"");
                }
            }
            _ => out.push(ch),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExtractedVeracity;

    #[test]
    fn test_direct_json() {
        let value = extract_json(r#"{"status": "Unverifiable"}"#).unwrap();
        assert_eq!(value["status"], "Unverifiable");
    }

    #[test]
    fn test_code_fenced_json() {
        let text = "```json\n{\"status\": \"Factually Correct\"}\n```";
        let value = extract_json(text).unwrap();
        assert_eq!(value["status"], "Factually Correct");
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("  ```JSON {\"a\": 1} ```  "), "{\"a\": 1}");
        assert_eq!(strip_code_fences("{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn test_json_surrounded_by_prose() {
        let text = r#"Here is my analysis: {"status": "Mixed", "note": "a {brace} in text"} Hope that helps!"#;
        let value = extract_json(text).unwrap();
        assert_eq!(value["status"], "Mixed");
        assert_eq!(value["note"], "a {brace} in text");
    }

    #[test]
    fn test_unescaped_inner_quotes_are_repaired() {
        let text = r#"{"status": "Factually Incorrect", "justification": "The so-called "fact" is wrong."}"#;
        let value = extract_json(text).unwrap();
        assert_eq!(value["justification"], "The so-called \"fact\" is wrong.");
    }

    #[test]
    fn test_no_json_at_all() {
        assert!(extract_json("I cannot answer that.").is_none());
        assert!(extract_json("   ").is_none());
    }

    #[test]
    fn test_extract_structured_checks_required_fields() {
        let schema = ResponseSchema::of::<ExtractedVeracity>();
        let err = extract_structured(r#"{"status": "Unverifiable"}"#, &schema).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedOutput(_)));

        let ok = extract_structured(
            r#"{"status": "Unverifiable", "justification": "No evidence found."}"#,
            &schema,
        );
        assert!(ok.is_ok());
    }
}
