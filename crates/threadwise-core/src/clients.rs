//! Per-tenant client configuration and the lookup seam to the external config service.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use serde::Deserialize;

use crate::config::AppConfig;
use crate::{Error, Result};

/// Which feature a client configuration is requested for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigDomain {
    Moderation,
    Analysis,
}

impl ConfigDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigDomain::Moderation => "moderation",
            ConfigDomain::Analysis => "analysis",
        }
    }
}

impl fmt::Display for ConfigDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-tenant settings. Read-only; owned by the external configuration service.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfiguration {
    pub enabled: bool,
    /// Provider identifier, e.g. "OpenAI" or "Gemini"
    pub provider: String,
    #[serde(default, alias = "api_key")]
    pub api_key: Option<String>,
    /// Backend tuning parameters, either a JSON object or a JSON-encoded string
    #[serde(default, alias = "config_json")]
    pub config_json: Option<serde_json::Value>,
    /// Custom moderation template containing a `{text}` placeholder
    #[serde(default)]
    pub prompt: Option<String>,
}

impl ClientConfiguration {
    /// Validate a raw lookup result. `enabled` and `provider` must be present.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::Config(format!(
                "Client configuration must be an object, got {}",
                json_kind(&value)
            )));
        }

        let config: Self = serde_json::from_value(value)
            .map_err(|e| Error::Config(format!("Invalid client configuration: {}", e)))?;
        if config.provider.trim().is_empty() {
            return Err(Error::Config("Invalid client configuration: provider is empty".to_string()));
        }
        Ok(config)
    }
}

impl fmt::Debug for ClientConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfiguration")
            .field("enabled", &self.enabled)
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("config_json", &self.config_json)
            .field("prompt", &self.prompt)
            .finish()
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Lookup of raw client configuration documents.
///
/// Implementations return the document as stored; validation happens in
/// [`resolve`] so every source gets the same treatment.
#[async_trait::async_trait]
pub trait ClientConfigSource: Send + Sync {
    async fn client_config(&self, client_id: &str, domain: ConfigDomain) -> Result<serde_json::Value>;
}

/// Fetch and validate the configuration for `client_id`
pub async fn resolve(
    source: &dyn ClientConfigSource,
    client_id: &str,
    domain: ConfigDomain,
) -> Result<ClientConfiguration> {
    let value = source.client_config(client_id, domain).await.map_err(|e| match e {
        Error::Config(msg) => Error::Config(msg),
        other => Error::Config(format!("Failed to load client configuration: {}", other)),
    })?;

    ClientConfiguration::from_value(value)
}

/// In-memory configuration source, seeded from code or from `AppConfig::clients`
#[derive(Default)]
pub struct StaticConfigSource {
    entries: RwLock<HashMap<(String, ConfigDomain), serde_json::Value>>,
}

impl StaticConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let source = Self::new();
        for (client_id, domains) in &config.clients {
            for (domain, value) in domains {
                let domain = match domain.as_str() {
                    "moderation" => ConfigDomain::Moderation,
                    "analysis" => ConfigDomain::Analysis,
                    other => {
                        tracing::warn!(client_id = %client_id, domain = %other, "Ignoring unknown configuration domain");
                        continue;
                    }
                };
                source.insert(client_id, domain, value.clone());
            }
        }
        source
    }

    pub fn insert(&self, client_id: &str, domain: ConfigDomain, value: serde_json::Value) {
        let mut entries = match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.insert((client_id.to_string(), domain), value);
    }
}

#[async_trait::async_trait]
impl ClientConfigSource for StaticConfigSource {
    async fn client_config(&self, client_id: &str, domain: ConfigDomain) -> Result<serde_json::Value> {
        let entries = match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries
            .get(&(client_id.to_string(), domain))
            .cloned()
            .ok_or_else(|| Error::Config(format!("No {} configuration for client {}", domain, client_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_requires_enabled_and_provider() {
        let missing_provider = ClientConfiguration::from_value(json!({ "enabled": true }));
        assert!(matches!(missing_provider, Err(Error::Config(_))));

        let missing_enabled = ClientConfiguration::from_value(json!({ "provider": "OpenAI" }));
        assert!(matches!(missing_enabled, Err(Error::Config(_))));

        for provider in ["", "   "] {
            let blank = ClientConfiguration::from_value(json!({ "enabled": true, "provider": provider }));
            assert_eq!(
                blank.unwrap_err().to_string(),
                "Configuration error: Invalid client configuration: provider is empty"
            );
        }

        let not_object = ClientConfiguration::from_value(json!("OpenAI"));
        let err = not_object.unwrap_err().to_string();
        assert!(err.contains("a string"), "unexpected error: {err}");
    }

    #[test]
    fn test_from_value_accepts_camel_and_snake_case() {
        let camel = ClientConfiguration::from_value(json!({
            "enabled": true,
            "provider": "Gemini",
            "apiKey": "k1",
            "configJson": "{\"temperature\": 0.1}"
        }))
        .unwrap();
        assert_eq!(camel.api_key.as_deref(), Some("k1"));
        assert_eq!(camel.config_json, Some(json!("{\"temperature\": 0.1}")));

        let snake = ClientConfiguration::from_value(json!({
            "enabled": false,
            "provider": "Gemini",
            "api_key": "k2",
            "config_json": { "temperature": 0.1 }
        }))
        .unwrap();
        assert_eq!(snake.api_key.as_deref(), Some("k2"));
        assert!(!snake.enabled);
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = ClientConfiguration::from_value(json!({
            "enabled": true,
            "provider": "OpenAI",
            "apiKey": "sk-very-secret"
        }))
        .unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk-very-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[tokio::test]
    async fn test_static_source_lookup() {
        let source = StaticConfigSource::new();
        source.insert("ole", ConfigDomain::Moderation, json!({ "enabled": true, "provider": "OpenAI" }));

        let config = resolve(&source, "ole", ConfigDomain::Moderation).await.unwrap();
        assert_eq!(config.provider, "OpenAI");

        let err = resolve(&source, "ole", ConfigDomain::Analysis).await.unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: No analysis configuration for client ole");
    }

    #[tokio::test]
    async fn test_static_source_from_app_config() {
        let config = AppConfig::from_toml_str(
            r#"
            [clients.ole.analysis]
            enabled = true
            provider = "Gemini"

            [clients.ole.unknown]
            enabled = true
            "#,
        )
        .unwrap();

        let source = StaticConfigSource::from_config(&config);
        let resolved = resolve(&source, "ole", ConfigDomain::Analysis).await.unwrap();
        assert!(resolved.enabled);
        assert_eq!(resolved.provider, "Gemini");
    }
}
