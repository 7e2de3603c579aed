//! Prompt template store
//!
//! Templates are plain text with `{variable}` placeholders; `{{` and `}}`
//! produce literal braces. The built-in set is compiled into the binary and
//! can be replaced wholesale by pointing `PROMPTS_DIR` at a directory of
//! `<name>_<lang>.txt` files. All templates are loaded and checked once at
//! startup, so rendering only fails on a caller bug.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use crate::model::Language;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PromptError {
    #[error("Prompt template not found: {name} ({language})")]
    TemplateNotFound {
        name: &'static str,
        language: Language,
    },

    #[error("Prompt template {name} is invalid: {reason}")]
    InvalidTemplate { name: String, reason: String },

    #[error("Missing value for prompt variable '{{{variable}}}' in {template}")]
    MissingVariable { template: String, variable: String },

    #[error("Failed to read prompt file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Named prompt templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateName {
    Classification,
    PoliticalAnalysis,
    IntentAnalysis,
    Veracity,
}

impl TemplateName {
    pub const ALL: [TemplateName; 4] = [
        TemplateName::Classification,
        TemplateName::PoliticalAnalysis,
        TemplateName::IntentAnalysis,
        TemplateName::Veracity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateName::Classification => "classification",
            TemplateName::PoliticalAnalysis => "political_analysis",
            TemplateName::IntentAnalysis => "intent_analysis",
            TemplateName::Veracity => "veracity",
        }
    }

    /// Variables every template of this kind must reference
    pub fn variables(&self) -> &'static [&'static str] {
        match self {
            TemplateName::Classification
            | TemplateName::PoliticalAnalysis
            | TemplateName::IntentAnalysis => &["text", "labels"],
            TemplateName::Veracity => &["claim", "current_date", "search_context"],
        }
    }

    fn file_name(&self, language: Language) -> String {
        format!("{}_{}.txt", self.as_str(), language.code())
    }

    fn embedded(&self, language: Language) -> &'static str {
        match (self, language) {
            (TemplateName::Classification, Language::En) => {
                include_str!("../../prompts/classification_en.txt")
            }
            (TemplateName::Classification, Language::De) => {
                include_str!("../../prompts/classification_de.txt")
            }
            (TemplateName::PoliticalAnalysis, Language::En) => {
                include_str!("../../prompts/political_analysis_en.txt")
            }
            (TemplateName::PoliticalAnalysis, Language::De) => {
                include_str!("../../prompts/political_analysis_de.txt")
            }
            (TemplateName::IntentAnalysis, Language::En) => {
                include_str!("../../prompts/intent_analysis_en.txt")
            }
            (TemplateName::IntentAnalysis, Language::De) => {
                include_str!("../../prompts/intent_analysis_de.txt")
            }
            (TemplateName::Veracity, Language::En) => include_str!("../../prompts/veracity_en.txt"),
            (TemplateName::Veracity, Language::De) => include_str!("../../prompts/veracity_de.txt"),
        }
    }
}

/// Piece of a parsed template
#[derive(Debug, PartialEq)]
enum Segment<'a> {
    Literal(&'a str),
    Brace(char),
    Variable(&'a str),
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse(template: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let bytes = template.as_bytes();
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' if bytes.get(i + 1) == Some(&b'{') => {
                segments.push(Segment::Literal(&template[literal_start..i]));
                segments.push(Segment::Brace('{'));
                i += 2;
                literal_start = i;
            }
            b'}' if bytes.get(i + 1) == Some(&b'}') => {
                segments.push(Segment::Literal(&template[literal_start..i]));
                segments.push(Segment::Brace('}'));
                i += 2;
                literal_start = i;
            }
            b'{' => {
                let close = template[i + 1..].find('}').map(|off| i + 1 + off);
                match close {
                    Some(end) if is_identifier(&template[i + 1..end]) => {
                        segments.push(Segment::Literal(&template[literal_start..i]));
                        segments.push(Segment::Variable(&template[i + 1..end]));
                        i = end + 1;
                        literal_start = i;
                    }
                    // Not a placeholder: keep the brace verbatim
                    _ => i += 1,
                }
            }
            _ => i += 1,
        }
    }
    segments.push(Segment::Literal(&template[literal_start..]));
    segments.retain(|s| !matches!(s, Segment::Literal("")));
    segments
}

/// Placeholders referenced by a template
pub fn placeholders(template: &str) -> BTreeSet<&str> {
    parse(template)
        .into_iter()
        .filter_map(|s| match s {
            Segment::Variable(name) => Some(name),
            _ => None,
        })
        .collect()
}

/// Substitute variables into a template
///
/// Pure function: fails on the first placeholder without a value. Values are
/// inserted verbatim and never re-scanned.
pub fn render_template(
    template_name: &str,
    template: &str,
    vars: &[(&str, &str)],
) -> Result<String, PromptError> {
    let mut out = String::with_capacity(template.len() + vars.iter().map(|(_, v)| v.len()).sum::<usize>());

    for segment in parse(template) {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Brace(c) => out.push(c),
            Segment::Variable(name) => {
                let value = vars
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| *value)
                    .ok_or_else(|| PromptError::MissingVariable {
                        template: template_name.to_string(),
                        variable: name.to_string(),
                    })?;
                out.push_str(value);
            }
        }
    }

    Ok(out)
}

/// Loaded, validated templates for every supported language
#[derive(Debug, Clone)]
pub struct PromptStore {
    templates: HashMap<(TemplateName, Language), String>,
}

impl PromptStore {
    /// Load templates from `dir`, or the built-in set when `dir` is `None`
    ///
    /// English templates are mandatory. A missing German template falls
    /// back to English when `fallback_to_english` is set.
    pub fn load(dir: Option<&Path>, fallback_to_english: bool) -> Result<Self, PromptError> {
        let mut templates = HashMap::new();

        for name in TemplateName::ALL {
            for language in [Language::En, Language::De] {
                let template = match dir {
                    Some(dir) => Self::read_file(dir, name, language)?,
                    None => Some(name.embedded(language).to_string()),
                };

                let template = match template {
                    Some(t) => t,
                    None if language != Language::En && fallback_to_english => {
                        tracing::warn!(
                            template = name.as_str(),
                            language = %language,
                            "Prompt template missing, falling back to English"
                        );
                        match templates.get(&(name, Language::En)) {
                            Some(en) => String::clone(en),
                            None => {
                                return Err(PromptError::TemplateNotFound {
                                    name: name.as_str(),
                                    language: Language::En,
                                });
                            }
                        }
                    }
                    None => {
                        return Err(PromptError::TemplateNotFound {
                            name: name.as_str(),
                            language,
                        });
                    }
                };

                Self::check(name, language, &template)?;
                templates.insert((name, language), template);
            }
        }

        tracing::info!(
            source = %dir.map(|d| d.display().to_string()).unwrap_or_else(|| "built-in".to_string()),
            count = templates.len(),
            "Prompt templates loaded"
        );

        Ok(Self { templates })
    }

    fn read_file(
        dir: &Path,
        name: TemplateName,
        language: Language,
    ) -> Result<Option<String>, PromptError> {
        let path = dir.join(name.file_name(language));
        if !path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&path)
            .map(Some)
            .map_err(|source| PromptError::Io { path, source })
    }

    /// A template must use exactly the variables its kind provides
    fn check(name: TemplateName, language: Language, template: &str) -> Result<(), PromptError> {
        let used = placeholders(template);
        let allowed = name.variables();
        let label = format!("{}_{}", name.as_str(), language.code());

        if let Some(unknown) = used.iter().find(|v| !allowed.contains(v)) {
            return Err(PromptError::InvalidTemplate {
                name: label,
                reason: format!("unknown placeholder '{{{}}}'", unknown),
            });
        }
        if let Some(missing) = allowed.iter().find(|v| !used.contains(*v)) {
            return Err(PromptError::InvalidTemplate {
                name: label,
                reason: format!("placeholder '{{{}}}' is never used", missing),
            });
        }
        Ok(())
    }

    /// Render a named template for a language
    pub fn render(
        &self,
        name: TemplateName,
        language: Language,
        vars: &[(&str, &str)],
    ) -> Result<String, PromptError> {
        let template = self
            .templates
            .get(&(name, language))
            .ok_or(PromptError::TemplateNotFound {
                name: name.as_str(),
                language,
            })?;
        render_template(name.as_str(), template, vars)
    }
}
