//! Provider factory for creating `ChatProvider` trait objects from configuration.

use super::{
    anthropic::AnthropicProvider, google::GoogleProvider, xai::XaiProvider, ChatProvider,
};
use crate::config::{ProviderKind, ProvidersConfig};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;

/// Create the provider for `kind`, or `None` when it is disabled.
///
/// Credentials are not checked here; a provider built without a key is
/// never called because the chat endpoint rejects the request first.
///
/// # Examples
///
/// ```
/// use regis::agent::factory::create_provider;
/// use regis::config::{ProviderKind, ProvidersConfig};
/// use reqwest::Client;
/// use std::sync::Arc;
///
/// let config = ProvidersConfig::default();
/// let provider = create_provider(ProviderKind::Xai, &config, Arc::new(Client::new())).unwrap();
/// assert_eq!(provider.id(), "xai");
/// ```
pub fn create_provider(
    kind: ProviderKind,
    config: &ProvidersConfig,
    client: Arc<Client>,
) -> Option<Arc<dyn ChatProvider>> {
    if !config.get(kind).enabled {
        return None;
    }

    let base_url = config.base_url(kind);
    let api_key = config.credential(kind).unwrap_or_default().to_string();
    let timeout_ms = config.request_timeout_seconds.saturating_mul(1000);

    let provider: Arc<dyn ChatProvider> = match kind {
        ProviderKind::Anthropic => {
            Arc::new(AnthropicProvider::new(base_url, api_key, client, timeout_ms))
        }
        ProviderKind::Google => Arc::new(GoogleProvider::new(base_url, api_key, client, timeout_ms)),
        ProviderKind::Xai => Arc::new(XaiProvider::new(base_url, api_key, client, timeout_ms)),
    };
    Some(provider)
}

/// The providers available to request handlers, keyed by kind.
#[derive(Clone, Default)]
pub struct ProviderSet {
    providers: HashMap<ProviderKind, Arc<dyn ChatProvider>>,
}

impl ProviderSet {
    /// An empty set; every provider reports as unavailable.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build every enabled provider from configuration.
    pub fn from_config(config: &ProvidersConfig, client: Arc<Client>) -> Self {
        let mut set = Self::empty();
        for kind in ProviderKind::ALL {
            if let Some(provider) = create_provider(kind, config, Arc::clone(&client)) {
                set.insert(provider);
            }
        }
        set
    }

    /// Register a provider under its own kind, replacing any previous one.
    pub fn insert(&mut self, provider: Arc<dyn ChatProvider>) {
        self.providers.insert(provider.kind(), provider);
    }

    pub fn with(mut self, provider: Arc<dyn ChatProvider>) -> Self {
        self.insert(provider);
        self
    }

    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn ChatProvider>> {
        self.providers.get(&kind).cloned()
    }

    pub fn contains(&self, kind: ProviderKind) -> bool {
        self.providers.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.providers.keys().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        f.debug_struct("ProviderSet").field("providers", &kinds).finish()
    }
}
