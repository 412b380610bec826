//! Hosted model provider configuration and credential checks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minimum length accepted for an API key without a recognised prefix.
pub const MIN_API_KEY_LEN: usize = 20;

/// The hosted model providers the backend can talk to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Anthropic Claude
    #[default]
    Anthropic,
    /// Google Gemini
    Google,
    /// xAI Grok
    Xai,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [ProviderKind::Anthropic, ProviderKind::Google, ProviderKind::Xai];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Google => "google",
            ProviderKind::Xai => "xai",
        }
    }

    /// Product name shown in user-facing messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "Claude",
            ProviderKind::Google => "Gemini",
            ProviderKind::Xai => "Grok",
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
            ProviderKind::Google => "GOOGLE_API_KEY",
            ProviderKind::Xai => "XAI_API_KEY",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "https://api.anthropic.com",
            ProviderKind::Google => "https://generativelanguage.googleapis.com",
            ProviderKind::Xai => "https://api.x.ai",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "claude-sonnet-4-20250514",
            ProviderKind::Google => "gemini-2.0-flash",
            ProviderKind::Xai => "grok-3",
        }
    }

    /// Key prefix the provider issues, if it has a stable one.
    fn key_prefix(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Anthropic => Some("sk-ant-"),
            ProviderKind::Google => None,
            ProviderKind::Xai => Some("xai-"),
        }
    }

    /// Infer the provider from a model id prefix (`claude-*`, `gemini-*`, `grok-*`).
    pub fn from_model(model: &str) -> Option<Self> {
        let model = model.to_ascii_lowercase();
        if model.starts_with("claude") {
            Some(ProviderKind::Anthropic)
        } else if model.starts_with("gemini") {
            Some(ProviderKind::Google)
        } else if model.starts_with("grok") {
            Some(ProviderKind::Xai)
        } else {
            None
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "google" | "gemini" => Ok(ProviderKind::Google),
            "xai" | "grok" => Ok(ProviderKind::Xai),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// Why a provider credential cannot be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// No key configured.
    Missing { env: &'static str },
    /// Key present but fails the format check.
    Invalid { reason: String },
}

/// Settings for a single provider.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// A disabled provider is reported as an unavailable dependency.
    pub enabled: bool,
    /// Override for the provider's API base URL.
    pub base_url: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Override for the model used when a request does not name one.
    pub default_model: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: None,
            api_key: None,
            default_model: None,
        }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("enabled", &self.enabled)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("default_model", &self.default_model)
            .finish()
    }
}

/// Provider section of the configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub default_provider: ProviderKind,
    /// Per-attempt deadline for buffered provider calls.
    pub request_timeout_seconds: u64,
    pub chat_max_tokens: u32,
    pub improve_max_tokens: u32,
    /// Model used by the improve-prompt endpoint.
    pub improve_model: String,
    pub anthropic: ProviderConfig,
    pub google: ProviderConfig,
    pub xai: ProviderConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            default_provider: ProviderKind::Anthropic,
            request_timeout_seconds: 120,
            chat_max_tokens: 4096,
            improve_max_tokens: 1024,
            improve_model: ProviderKind::Anthropic.default_model().to_string(),
            anthropic: ProviderConfig::default(),
            google: ProviderConfig::default(),
            xai: ProviderConfig::default(),
        }
    }
}

impl ProvidersConfig {
    pub fn get(&self, kind: ProviderKind) -> &ProviderConfig {
        match kind {
            ProviderKind::Anthropic => &self.anthropic,
            ProviderKind::Google => &self.google,
            ProviderKind::Xai => &self.xai,
        }
    }

    pub fn get_mut(&mut self, kind: ProviderKind) -> &mut ProviderConfig {
        match kind {
            ProviderKind::Anthropic => &mut self.anthropic,
            ProviderKind::Google => &mut self.google,
            ProviderKind::Xai => &mut self.xai,
        }
    }

    pub fn base_url(&self, kind: ProviderKind) -> String {
        self.get(kind)
            .base_url
            .clone()
            .unwrap_or_else(|| kind.default_base_url().to_string())
            .trim_end_matches('/')
            .to_string()
    }

    pub fn default_model(&self, kind: ProviderKind) -> String {
        self.get(kind)
            .default_model
            .clone()
            .unwrap_or_else(|| kind.default_model().to_string())
    }

    pub fn has_key(&self, kind: ProviderKind) -> bool {
        self.get(kind)
            .api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }

    /// Return the trimmed API key for `kind`, or why it cannot be used.
    pub fn credential(&self, kind: ProviderKind) -> Result<&str, CredentialError> {
        let key = match self.get(kind).api_key.as_deref() {
            Some(k) => k.trim(),
            None => {
                return Err(CredentialError::Missing {
                    env: kind.api_key_env(),
                })
            }
        };

        if key.is_empty() {
            return Err(CredentialError::Missing {
                env: kind.api_key_env(),
            });
        }

        let prefixed = kind.key_prefix().is_some_and(|p| key.starts_with(p));
        if !prefixed && key.len() < MIN_API_KEY_LEN {
            return Err(CredentialError::Invalid {
                reason: format!("Invalid {} API key format", kind),
            });
        }

        Ok(key)
    }
}
