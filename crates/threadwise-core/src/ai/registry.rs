use std::collections::HashMap;
use std::sync::Arc;

use super::providers::{builtin_backends, merge_params, BackendDescriptor, ProviderFactory};
use crate::config::AppConfig;
use crate::{Error, Result};

/// Provider factories keyed by lowercase provider identifier.
///
/// Holds only descriptors and factories. Adapters carrying a client's key are
/// built per request and never stored here.
#[derive(Clone)]
pub struct ProviderRegistry {
    factories: HashMap<String, Arc<dyn ProviderFactory>>,
}

impl ProviderRegistry {
    /// Registry with no backends
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with the built-in backends
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for descriptor in builtin_backends() {
            registry.register_backend(descriptor);
        }
        registry
    }

    /// Built-in backends with base URLs and default parameters taken from `[providers.*]`
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let mut backends = builtin_backends();

        for (key, backend_config) in &config.providers {
            let descriptor = backends
                .iter_mut()
                .find(|d| d.matches(key))
                .ok_or_else(|| Error::Config(format!("Unknown provider in configuration: {}", key)))?;

            if let Some(base_url) = &backend_config.base_url {
                url::Url::parse(base_url)?;
                tracing::info!(provider = %descriptor.id, base_url = %base_url, "Using custom provider endpoint");
                descriptor.base_url = base_url.clone();
            }

            if !backend_config.params.is_empty() {
                descriptor.defaults = merge_params(&descriptor.defaults, &backend_config.params);
            }
        }

        let mut registry = Self::empty();
        for descriptor in backends {
            registry.register_backend(descriptor);
        }
        tracing::debug!(providers = ?registry.provider_keys(), "Provider registry configured");
        Ok(registry)
    }

    /// Register a backend under its id and aliases
    pub fn register_backend(&mut self, descriptor: BackendDescriptor) {
        let keys: Vec<String> = std::iter::once(descriptor.id.clone())
            .chain(descriptor.aliases.iter().cloned())
            .collect();
        let factory: Arc<dyn ProviderFactory> = Arc::new(descriptor);
        for key in keys {
            self.register(&key, factory.clone());
        }
    }

    /// Register any factory under `key`, replacing an existing entry
    pub fn register(&mut self, key: &str, factory: Arc<dyn ProviderFactory>) {
        if self.factories.insert(normalize(key), factory).is_some() {
            tracing::debug!(provider = %key, "Replaced provider factory");
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<dyn ProviderFactory>> {
        self.factories.get(&normalize(key)).cloned()
    }

    /// Registered keys, sorted
    pub fn provider_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(key: &str) -> String {
    key.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::providers::WireFormat;

    #[test]
    fn test_builtin_keys() {
        let registry = ProviderRegistry::new();
        assert_eq!(registry.provider_keys(), vec!["deepseek", "gemini", "grok", "openai", "xai"]);
        assert!(registry.get("OpenAI").is_some());
        assert!(registry.get(" Gemini ").is_some());
        assert!(registry.get("Unknown").is_none());
        assert!(registry.get("Unknown").is_none());
    }

    #[test]
    fn test_register_new_backend_is_data_only() {
        let mut registry = ProviderRegistry::new();
        registry.register_backend(BackendDescriptor {
            id: "mistral".to_string(),
            display_name: "Mistral".to_string(),
            aliases: vec![],
            base_url: "https://api.mistral.ai/v1".to_string(),
            wire: WireFormat::OpenAiChat,
            defaults: BackendDescriptor::openai().defaults,
        });
        assert!(registry.get("Mistral").is_some());
    }

    #[tokio::test]
    async fn test_from_config_applies_overrides() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({ "model": "gpt-4o" })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"id":"chatcmpl-1","object":"chat.completion","created":1714564800,"model":"gpt-4o",
                "choices":[{"index":0,"message":{"role":"assistant","content":"ok"},"finish_reason":"stop","logprobs":null}]}"#,
            )
            .create_async()
            .await;

        let config = AppConfig::from_toml_str(&format!(
            r#"
            [providers.OpenAI]
            base_url = "{}"

            [providers.OpenAI.params]
            model = "gpt-4o"
            "#,
            server.url()
        ))
        .unwrap();

        let registry = ProviderRegistry::from_config(&config).unwrap();
        let provider = registry
            .get("openai")
            .unwrap()
            .build(Some("sk-test"), &serde_json::Map::new())
            .unwrap();

        assert_eq!(provider.invoke("hola").await.unwrap(), "ok");
        mock.assert_async().await;
    }

    #[test]
    fn test_from_config_rejects_unknown_backend_and_bad_url() {
        let unknown = AppConfig::from_toml_str("[providers.llama]\nbase_url = \"http://localhost\"").unwrap();
        assert!(matches!(ProviderRegistry::from_config(&unknown), Err(Error::Config(_))));

        let bad_url = AppConfig::from_toml_str("[providers.openai]\nbase_url = \"not a url\"").unwrap();
        assert!(matches!(ProviderRegistry::from_config(&bad_url), Err(Error::UrlParse(_))));
    }
}
