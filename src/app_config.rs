use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::providers::Capability;
use crate::translation::placeholders::PlaceholderRule;

/// Application configuration module
/// This module handles loading, merging and validating the run configuration.
/// Values come from an optional JSON file and are then overridden by the CLI.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO)
    pub source_language: String,

    /// Target language code (ISO); may be filled from the environment
    #[serde(default)]
    pub target_language: String,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Per-run behaviour
    #[serde(default)]
    pub run: RunConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation backend type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TranslationProvider {
    /// Lingva, a Google Translate frontend
    #[default]
    Lingva,
    /// MyMemory free tier
    #[serde(rename = "mymemory")]
    MyMemory,
    /// LibreTranslate, public or self-hosted
    #[serde(rename = "libretranslate")]
    LibreTranslate,
    /// DeepL Pro
    #[serde(rename = "deepl")]
    DeepL,
    /// DeepL Free API
    #[serde(rename = "deepl-free")]
    DeepLFree,
    /// Google Cloud Translation v2
    Google,
    /// OpenAI chat completions
    #[serde(rename = "openai")]
    OpenAI,
    /// Anthropic messages
    Anthropic,
}

impl TranslationProvider {
    pub const ALL: [TranslationProvider; 8] = [
        Self::Lingva,
        Self::MyMemory,
        Self::LibreTranslate,
        Self::DeepL,
        Self::DeepLFree,
        Self::Google,
        Self::OpenAI,
        Self::Anthropic,
    ];

    /// Human readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Lingva => "Lingva",
            Self::MyMemory => "MyMemory",
            Self::LibreTranslate => "LibreTranslate",
            Self::DeepL => "DeepL",
            Self::DeepLFree => "DeepL Free",
            Self::Google => "Google Cloud Translation",
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
        }
    }

    /// Identifier used on the command line and in config files
    pub fn id(&self) -> &'static str {
        match self {
            Self::Lingva => "lingva",
            Self::MyMemory => "mymemory",
            Self::LibreTranslate => "libretranslate",
            Self::DeepL => "deepl",
            Self::DeepLFree => "deepl-free",
            Self::Google => "google",
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
        }
    }

    pub fn capability(&self) -> Capability {
        match self {
            Self::Lingva | Self::MyMemory | Self::LibreTranslate => Capability::Free,
            Self::DeepL | Self::DeepLFree | Self::Google => Capability::Keyed,
            Self::OpenAI | Self::Anthropic => Capability::AiContextAware,
        }
    }

    /// Whether the backend refuses to start without an API key
    pub fn requires_api_key(&self) -> bool {
        self.capability() != Capability::Free
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Self::Lingva => "https://lingva.ml",
            Self::MyMemory => "https://api.mymemory.translated.net",
            Self::LibreTranslate => "https://libretranslate.com",
            Self::DeepL => "https://api.deepl.com",
            Self::DeepLFree => "https://api-free.deepl.com",
            Self::Google => "https://translation.googleapis.com",
            Self::OpenAI => "https://api.openai.com/v1",
            Self::Anthropic => "https://api.anthropic.com",
        }
    }

    /// Model used by AI backends when none is configured
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAI => "gpt-4o-mini",
            Self::Anthropic => "claude-3-haiku-20240307",
            _ => "",
        }
    }

    fn default_timeout_secs(&self) -> u64 {
        match self {
            Self::OpenAI | Self::Anthropic => 60,
            _ => 30,
        }
    }
}

impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.id() == wanted)
            .ok_or_else(|| anyhow!("Invalid translation service: {}", s))
    }
}

/// Settings of one backend
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProviderConfig {
    /// Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: TranslationProvider,

    /// Model name (AI backends)
    #[serde(default)]
    pub model: String,

    /// API key
    #[serde(default)]
    pub api_key: String,

    /// Service URL; empty means the provider default
    #[serde(default)]
    pub endpoint: String,

    /// Contact e-mail sent to MyMemory for a higher quota
    #[serde(default)]
    pub email: String,

    /// Timeout seconds
    #[serde(default)]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    /// Provider config with defaults
    pub fn new(provider_type: TranslationProvider) -> Self {
        Self {
            provider_type,
            model: provider_type.default_model().to_string(),
            api_key: String::new(),
            endpoint: provider_type.default_endpoint().to_string(),
            email: String::new(),
            timeout_secs: provider_type.default_timeout_secs(),
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Translation provider to use
    #[serde(default)]
    pub provider: TranslationProvider,

    /// Per-provider settings
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Common translation settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TranslationCommonConfig {
    /// Delay in milliseconds between consecutive batches
    #[serde(default = "default_rate_limit_delay_ms")]
    pub rate_limit_delay_ms: u64,

    /// Delay in milliseconds between per-unit calls of free backends
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Extra attempts for rate-limited or network-failed batches
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Base backoff for retries (in milliseconds), doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Temperature parameter for AI backends (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens an AI backend may generate per batch
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Batches in flight at once; results are still merged in order
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            rate_limit_delay_ms: default_rate_limit_delay_ms(),
            request_delay_ms: default_request_delay_ms(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            concurrent_requests: default_concurrent_requests(),
        }
    }
}

/// What a run selects, how it batches and where results go
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RunConfig {
    /// Units per backend request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Report changes without writing files
    #[serde(default)]
    pub dry_run: bool,

    /// Descend into subdirectories of directory inputs
    #[serde(default = "default_true")]
    pub recursive: bool,

    /// Leave fuzzy units alone
    #[serde(default)]
    pub skip_fuzzy: bool,

    /// Optional glossary file
    #[serde(default)]
    pub glossary: Option<PathBuf>,

    /// Match glossary terms case-sensitively
    #[serde(default)]
    pub glossary_case_sensitive: bool,

    /// Write merged results of an interrupted run
    #[serde(default)]
    pub write_on_interrupt: bool,

    /// Placeholder rules replacing the built-in list
    #[serde(default)]
    pub placeholder_rules: Option<Vec<PlaceholderRule>>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            dry_run: false,
            recursive: true,
            skip_fuzzy: false,
            glossary: None,
            glossary_case_sensitive: false,
            write_on_interrupt: false,
            placeholder_rules: None,
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_rate_limit_delay_ms() -> u64 {
    500
}

fn default_request_delay_ms() -> u64 {
    100
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_concurrent_requests() -> usize {
    1
}

fn default_batch_size() -> usize {
    crate::translation::batch::DEFAULT_BATCH_SIZE
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Configuration with defaults for a language pair
    pub fn new(source_language: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            source_language: source_language.into(),
            target_language: target_language.into(),
            ..Default::default()
        }
    }

    /// Load a JSON configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.source_language.trim().is_empty() {
            return Err(anyhow!("Source language is required"));
        }
        if self.target_language.trim().is_empty() {
            return Err(anyhow!(
                "Target language is required (pass --target or set LANG)"
            ));
        }
        crate::language_utils::validate_language_code(&self.source_language)
            .context("Invalid source language")?;
        crate::language_utils::validate_language_code(&self.target_language)
            .context("Invalid target language")?;

        let provider = self.translation.provider;
        if provider.requires_api_key() && self.translation.get_api_key().is_empty() {
            return Err(anyhow!(
                "An API key is required for the {} service (use --api-key or PO_TRANSLATE_API_KEY)",
                provider.display_name()
            ));
        }
        url::Url::parse(&self.translation.get_endpoint())
            .with_context(|| format!("Invalid URL for the {} service", provider.display_name()))?;

        if self.translation.common.concurrent_requests == 0 {
            return Err(anyhow!("concurrent_requests must be at least 1"));
        }
        if !(0.0..=2.0).contains(&self.translation.common.temperature) {
            return Err(anyhow!("temperature must be between 0.0 and 2.0"));
        }
        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: "en".to_string(),
            target_language: String::new(),
            translation: TranslationConfig::default(),
            run: RunConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl TranslationConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    pub fn get_provider_config(&self, provider_type: &TranslationProvider) -> Option<&ProviderConfig> {
        self.available_providers
            .iter()
            .find(|p| p.provider_type == *provider_type)
    }

    /// Settings of the active provider, created with defaults when missing
    pub fn active_provider_config_mut(&mut self) -> &mut ProviderConfig {
        let provider = self.provider;
        let position = match self.available_providers.iter().position(|p| p.provider_type == provider) {
            Some(position) => position,
            None => {
                self.available_providers.push(ProviderConfig::new(provider));
                self.available_providers.len() - 1
            }
        };
        &mut self.available_providers[position]
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.model.clone())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }

    /// Get the API key for the active provider
    pub fn get_api_key(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.api_key.clone())
            .unwrap_or_default()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.endpoint.clone())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| self.provider.default_endpoint().to_string())
    }

    /// Contact e-mail for MyMemory, if any
    pub fn get_email(&self) -> Option<String> {
        self.get_active_provider_config()
            .map(|p| p.email.clone())
            .filter(|e| !e.is_empty())
    }

    pub fn get_timeout_secs(&self) -> u64 {
        self.get_active_provider_config()
            .map(|p| p.timeout_secs)
            .filter(|t| *t > 0)
            .unwrap_or_else(|| self.provider.default_timeout_secs())
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            available_providers: TranslationProvider::ALL.into_iter().map(ProviderConfig::new).collect(),
            common: TranslationCommonConfig::default(),
        }
    }
}
