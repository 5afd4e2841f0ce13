//! Provider configuration and built-in vendor defaults.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use validator::Validate;

/// Default Azure OpenAI API version
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-02-15-preview";

/// Default Ollama base URL
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Vendor family of a configured provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum ProviderKind {
    /// OpenAI chat completions
    #[serde(rename = "openai")]
    OpenAI,
    /// Azure OpenAI deployment
    #[serde(rename = "azure_openai")]
    AzureOpenAI,
    /// Google Gemini
    #[serde(rename = "google_gemini", alias = "gemini")]
    GoogleGemini,
    /// OpenRouter (OpenAI-compatible)
    #[serde(rename = "openrouter")]
    OpenRouter,
    /// Groq (OpenAI-compatible)
    #[serde(rename = "groq")]
    Groq,
    /// Local Ollama server
    #[serde(rename = "ollama")]
    Ollama,
}

impl ProviderKind {
    /// Configuration name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::AzureOpenAI => "azure_openai",
            Self::GoogleGemini => "google_gemini",
            Self::OpenRouter => "openrouter",
            Self::Groq => "groq",
            Self::Ollama => "ollama",
        }
    }

    /// Environment variable holding the API key
    #[must_use]
    pub fn default_api_key_env(&self) -> Option<&'static str> {
        match self {
            Self::OpenAI => Some("OPENAI_API_KEY"),
            Self::AzureOpenAI => Some("AZURE_OPENAI_API_KEY"),
            Self::GoogleGemini => Some("GOOGLE_GEMINI_API_KEY"),
            Self::OpenRouter => Some("OPENROUTER_API_KEY"),
            Self::Groq => Some("GROQ_API_KEY"),
            Self::Ollama => None,
        }
    }

    /// Environment variable holding the base URL, if the vendor has one
    #[must_use]
    pub fn base_url_env(&self) -> Option<&'static str> {
        match self {
            Self::AzureOpenAI => Some("AZURE_OPENAI_ENDPOINT"),
            Self::Ollama => Some("OLLAMA_BASE_URL"),
            _ => None,
        }
    }

    /// Public API base URL; Azure has none
    #[must_use]
    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            Self::OpenAI => Some("https://api.openai.com/v1"),
            Self::AzureOpenAI => None,
            Self::GoogleGemini => Some("https://generativelanguage.googleapis.com/v1beta"),
            Self::OpenRouter => Some("https://openrouter.ai/api/v1"),
            Self::Groq => Some("https://api.groq.com/openai/v1"),
            Self::Ollama => Some(DEFAULT_OLLAMA_BASE_URL),
        }
    }

    /// Whether an API key is needed to call the vendor
    #[must_use]
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Self::Ollama)
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One configured provider
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProviderConfig {
    /// Provider ID used in fallback lists and responses
    #[validate(length(min = 1, max = 64))]
    pub id: String,

    /// Human-readable name
    #[serde(default)]
    pub display_name: Option<String>,

    /// Vendor family
    pub kind: ProviderKind,

    /// Model identifier (deployment name for Azure)
    #[validate(length(min = 1, max = 256))]
    pub model: String,

    /// Inline API key
    #[serde(default)]
    pub api_key: Option<SecretString>,

    /// Environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Base URL override
    #[serde(default)]
    pub base_url: Option<String>,

    /// API version (Azure)
    #[serde(default)]
    pub api_version: Option<String>,

    /// Cost per 1K prompt tokens
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub input_cost_per_1k: f64,

    /// Cost per 1K completion tokens
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub output_cost_per_1k: f64,

    /// Disabled providers are built but never attempted
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// `HTTP-Referer` header (OpenRouter)
    #[serde(default)]
    pub site_url: Option<String>,

    /// `X-Title` header (OpenRouter)
    #[serde(default)]
    pub app_name: Option<String>,
}

fn default_true() -> bool {
    true
}

impl ProviderConfig {
    /// Create a configuration with defaults for `kind`
    #[must_use]
    pub fn new(id: impl Into<String>, kind: ProviderKind, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            kind,
            model: model.into(),
            api_key: None,
            api_key_env: None,
            base_url: None,
            api_version: None,
            input_cost_per_1k: 0.0,
            output_cost_per_1k: 0.0,
            enabled: true,
            site_url: None,
            app_name: None,
        }
    }

    /// Set the display name
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Set per-1K pricing
    #[must_use]
    pub fn with_pricing(mut self, input_per_1k: f64, output_per_1k: f64) -> Self {
        self.input_cost_per_1k = input_per_1k;
        self.output_cost_per_1k = output_per_1k;
        self
    }

    /// Set an inline API key
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::new(key.into()));
        self
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Enable or disable the provider
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Display name, falling back to the ID
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }

    /// Resolve the API key from the process environment
    #[must_use]
    pub fn resolve_api_key(&self) -> Option<SecretString> {
        self.resolve_api_key_with(&|name| std::env::var(name).ok())
    }

    /// Resolve the API key: inline value first, then the named variable
    pub fn resolve_api_key_with<F>(&self, lookup: &F) -> Option<SecretString>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = &self.api_key {
            if !key.expose_secret().trim().is_empty() {
                return Some(key.clone());
            }
        }

        let env_name = self
            .api_key_env
            .as_deref()
            .or_else(|| self.kind.default_api_key_env())?;

        lookup(env_name)
            .filter(|value| !value.trim().is_empty())
            .map(SecretString::new)
    }

    /// Resolve the base URL from the process environment
    #[must_use]
    pub fn resolve_base_url(&self) -> Option<String> {
        self.resolve_base_url_with(&|name| std::env::var(name).ok())
    }

    /// Resolve the base URL: explicit value, vendor variable, public default
    pub fn resolve_base_url_with<F>(&self, lookup: &F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.base_url
            .clone()
            .or_else(|| {
                self.kind
                    .base_url_env()
                    .and_then(lookup)
                    .filter(|value| !value.trim().is_empty())
            })
            .or_else(|| self.kind.default_base_url().map(str::to_string))
            .map(|url| url.trim_end_matches('/').to_string())
    }

    /// Resolve the API version (Azure)
    pub fn resolve_api_version_with<F>(&self, lookup: &F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        self.api_version
            .clone()
            .or_else(|| lookup("AZURE_OPENAI_API_VERSION"))
            .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string())
    }

    /// Enabled and holding every credential the vendor needs
    pub fn is_available_with<F>(&self, lookup: &F) -> bool
    where
        F: Fn(&str) -> Option<String>,
    {
        if !self.enabled {
            return false;
        }
        if self.kind.requires_api_key() && self.resolve_api_key_with(lookup).is_none() {
            return false;
        }
        self.resolve_base_url_with(lookup).is_some()
    }
}

/// Built-in provider set, cheapest first
#[must_use]
pub fn builtin_providers() -> Vec<ProviderConfig> {
    let mut openrouter_cheap = ProviderConfig::new(
        "openrouter_cheap",
        ProviderKind::OpenRouter,
        "meta-llama/llama-3.1-8b-instruct:free",
    )
    .with_display_name("OpenRouter (Llama 3.1 8B free)");
    openrouter_cheap.site_url = Some("https://localhost".to_string());
    openrouter_cheap.app_name = Some("LLM Fallback Gateway".to_string());

    let mut openrouter_premium = ProviderConfig::new(
        "openrouter_premium",
        ProviderKind::OpenRouter,
        "anthropic/claude-3.5-sonnet",
    )
    .with_display_name("OpenRouter (Claude 3.5 Sonnet)")
    .with_pricing(0.003, 0.015);
    openrouter_premium.site_url = openrouter_cheap.site_url.clone();
    openrouter_premium.app_name = openrouter_cheap.app_name.clone();

    vec![
        ProviderConfig::new("gemini", ProviderKind::GoogleGemini, "gemini-1.5-flash")
            .with_display_name("Google Gemini 1.5 Flash"),
        ProviderConfig::new("ollama", ProviderKind::Ollama, "llama3.1:8b")
            .with_display_name("Ollama (local)")
            .with_enabled(false),
        openrouter_cheap,
        ProviderConfig::new("groq", ProviderKind::Groq, "llama-3.1-8b-instant")
            .with_display_name("Groq Llama 3.1 8B")
            .with_pricing(0.00018, 0.00018),
        ProviderConfig::new("openai", ProviderKind::OpenAI, "gpt-4o-mini")
            .with_display_name("OpenAI GPT-4o mini")
            .with_pricing(0.00015, 0.0006),
        ProviderConfig::new("azure_openai", ProviderKind::AzureOpenAI, "gpt-4o")
            .with_display_name("Azure OpenAI GPT-4o")
            .with_pricing(0.005, 0.015),
        openrouter_premium,
    ]
}
