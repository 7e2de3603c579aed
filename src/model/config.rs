use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::provider::{ProviderKind, RetryPolicy};

const ENV_CONFIG_PATH: &str = "UNITE_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

const ENV_AI_PROVIDER: &str = "AI_PROVIDER";
const ENV_ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
const ENV_CLAUDE_MODEL: &str = "CLAUDE_MODEL";
const ENV_CLAUDE_BASE_URL: &str = "CLAUDE_BASE_URL";
const ENV_MISTRAL_API_KEY: &str = "MISTRAL_API_KEY";
const ENV_MISTRAL_MODEL: &str = "MISTRAL_MODEL";
const ENV_MISTRAL_BASE_URL: &str = "MISTRAL_BASE_URL";
const ENV_BRAVE_API_KEY: &str = "BRAVE_API_KEY";
const ENV_BRAVE_BASE_URL: &str = "BRAVE_BASE_URL";
const ENV_PROMPTS_DIR: &str = "PROMPTS_DIR";

const DEFAULT_CLAUDE_MODEL: &str = "claude-sonnet-4-5-20250929";
const DEFAULT_MISTRAL_MODEL: &str = "mistral-large-latest";

/// Feature switches
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct FeatureConfig {
    pub veracity_check: bool,
    pub nuance_analysis: bool,
    pub web_search: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            veracity_check: true,
            nuance_analysis: true,
            web_search: true,
        }
    }
}

/// Decision thresholds
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Promotional posts above this classification confidence are spam
    pub spam_confidence: f64,
    /// Intents scoring above this are reported
    pub intent_confidence: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            spam_confidence: 0.7,
            intent_confidence: 0.3,
        }
    }
}

/// Provider retry policy
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 4000,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.clamp(1, 5),
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms.max(self.base_delay_ms)),
        }
    }
}

/// Deadlines for outbound calls and whole requests
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub provider_call_secs: u64,
    pub search_call_secs: u64,
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            provider_call_secs: 60,
            search_call_secs: 10,
            request_secs: 150,
        }
    }
}

impl TimeoutConfig {
    pub fn provider_call(&self) -> Duration {
        Duration::from_secs(self.provider_call_secs.max(1))
    }

    pub fn search_call(&self) -> Duration {
        Duration::from_secs(self.search_call_secs.max(1))
    }

    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs.max(1))
    }
}

/// Evidence gathering limits
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct SearchConfig {
    pub max_queries: usize,
    pub results_per_query: usize,
    /// Sources folded into the verification prompt
    pub max_sources: usize,
    /// Brave freshness filter (pd, pw, pm, py); unset searches all time
    pub freshness: Option<String>,
    /// Pause between consecutive queries of one request
    pub query_spacing_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_queries: 3,
            results_per_query: 3,
            max_sources: 5,
            freshness: None,
            query_spacing_ms: 250,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Use the English template when a language variant is missing
    pub fallback_to_english: bool,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            fallback_to_english: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitConfig {
    pub max_post_chars: usize,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            max_post_chars: 10_000,
        }
    }
}

/// YAML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub features: FeatureConfig,
    pub thresholds: ThresholdConfig,
    pub retry: RetryConfig,
    pub timeouts: TimeoutConfig,
    pub search: SearchConfig,
    pub prompts: PromptConfig,
    pub limits: LimitConfig,
}

/// Selected AI backend
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub model: String,
    pub base_url: Option<String>,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    /// Raw `AI_PROVIDER` value, validated at startup
    pub ai_provider: String,
    pub anthropic_api_key: Option<String>,
    pub claude_model: String,
    pub claude_base_url: Option<String>,
    pub mistral_api_key: Option<String>,
    pub mistral_model: String,
    pub mistral_base_url: Option<String>,
    pub brave_api_key: Option<String>,
    pub brave_base_url: Option<String>,
    pub prompts_dir: Option<PathBuf>,
    pub policy: ConfigFile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            host: "127.0.0.1".to_string(),
            ai_provider: "claude".to_string(),
            anthropic_api_key: None,
            claude_model: DEFAULT_CLAUDE_MODEL.to_string(),
            claude_base_url: None,
            mistral_api_key: None,
            mistral_model: DEFAULT_MISTRAL_MODEL.to_string(),
            mistral_base_url: None,
            brave_api_key: None,
            brave_base_url: None,
            prompts_dir: None,
            policy: ConfigFile::default(),
        }
    }
}

/// Non-empty environment variable
fn env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Load configuration from environment and config file
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = env_opt("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);

        let host = env_opt("HOST").unwrap_or(defaults.host);

        let config_path =
            env_opt(ENV_CONFIG_PATH).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        let policy = Self::load_config_file(&config_path).unwrap_or_default();

        Self {
            port,
            host,
            ai_provider: env_opt(ENV_AI_PROVIDER).unwrap_or(defaults.ai_provider),
            anthropic_api_key: env_opt(ENV_ANTHROPIC_API_KEY),
            claude_model: env_opt(ENV_CLAUDE_MODEL).unwrap_or(defaults.claude_model),
            claude_base_url: env_opt(ENV_CLAUDE_BASE_URL),
            mistral_api_key: env_opt(ENV_MISTRAL_API_KEY),
            mistral_model: env_opt(ENV_MISTRAL_MODEL).unwrap_or(defaults.mistral_model),
            mistral_base_url: env_opt(ENV_MISTRAL_BASE_URL),
            brave_api_key: env_opt(ENV_BRAVE_API_KEY),
            brave_base_url: env_opt(ENV_BRAVE_BASE_URL),
            prompts_dir: env_opt(ENV_PROMPTS_DIR).map(PathBuf::from),
            policy,
        }
    }

    /// Load configuration from YAML file
    fn load_config_file(path: &str) -> Option<ConfigFile> {
        let path = Path::new(path);

        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return None;
        }

        match fs::read_to_string(path) {
            Ok(contents) => match Self::parse_config(&contents) {
                Ok(config) => {
                    tracing::info!(path = %path.display(), "Loaded configuration from file");
                    Some(config)
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to parse config file, using defaults");
                    None
                }
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read config file, using defaults");
                None
            }
        }
    }

    /// Parse YAML policy; an empty document yields defaults
    pub fn parse_config(contents: &str) -> Result<ConfigFile, serde_yaml::Error> {
        let contents = contents.trim();
        if contents.is_empty() {
            return Ok(ConfigFile::default());
        }
        serde_yaml::from_str(contents)
    }

    /// Resolve the selected provider and its API key
    pub fn provider_settings(&self) -> Result<(ProviderSettings, String), String> {
        let kind: ProviderKind = self.ai_provider.parse()?;
        let (key, key_var, model, base_url) = match kind {
            ProviderKind::Claude => (
                &self.anthropic_api_key,
                ENV_ANTHROPIC_API_KEY,
                &self.claude_model,
                &self.claude_base_url,
            ),
            ProviderKind::Mistral => (
                &self.mistral_api_key,
                ENV_MISTRAL_API_KEY,
                &self.mistral_model,
                &self.mistral_base_url,
            ),
        };

        let key = key
            .clone()
            .ok_or_else(|| format!("{} is required for provider '{}'", key_var, kind.as_str()))?;

        Ok((
            ProviderSettings {
                kind,
                model: model.clone(),
                base_url: base_url.clone(),
            },
            key,
        ))
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
