//! Response-shape contracts for structured generation

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Default completion budget for short structured answers
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// A type the provider can be asked to produce
pub trait StructuredOutput: DeserializeOwned + JsonSchema + Send {
    /// Contract name, also used in logs
    const NAME: &'static str;

    /// Completion budget for this shape
    const MAX_TOKENS: u32 = DEFAULT_MAX_TOKENS;

    /// Semantic checks beyond the JSON schema
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Schema descriptor handed to a provider alongside the rendered prompt
#[derive(Debug, Clone)]
pub struct ResponseSchema {
    pub name: &'static str,
    pub schema: Value,
    pub required: Vec<String>,
    pub max_tokens: u32,
}

impl ResponseSchema {
    pub fn of<T: StructuredOutput>() -> Self {
        let schema = serde_json::to_value(schemars::schema_for!(T)).unwrap_or_default();
        let required = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(|f| f.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            name: T::NAME,
            schema,
            required,
            max_tokens: T::MAX_TOKENS,
        }
    }

    /// System instructions describing the expected output shape
    pub fn instructions(&self) -> String {
        let schema = serde_json::to_string_pretty(&self.schema).unwrap_or_default();
        format!(
            "Respond with a single JSON object and nothing else. \
             The object must conform to this JSON schema:\n{}",
            schema
        )
    }

    /// Check that a decoded value is an object carrying every required field
    pub fn check(&self, value: &Value) -> Result<(), String> {
        let object = value
            .as_object()
            .ok_or_else(|| format!("{} output is not a JSON object", self.name))?;

        let missing: Vec<&str> = self
            .required
            .iter()
            .filter(|field| object.get(field.as_str()).is_none_or(Value::is_null))
            .map(String::as_str)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!(
                "{} output is missing required fields: {}",
                self.name,
                missing.join(", ")
            ))
        }
    }
}
