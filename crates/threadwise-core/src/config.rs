use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    /// Per-backend overrides keyed by provider identifier (e.g. "openai", "gemini")
    #[serde(default)]
    pub providers: HashMap<String, BackendConfig>,
    /// Static client configurations: client id -> domain ("moderation" / "analysis") -> settings
    #[serde(default)]
    pub clients: HashMap<String, HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Replacement base endpoint, e.g. a proxy in front of the vendor API
    #[serde(default)]
    pub base_url: Option<String>,
    /// Default generation parameters, same keys as a client's `configJson`
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from file or return defaults
    pub fn load() -> crate::Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml_str(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Get the configuration file path
    /// Always uses ~/.config/threadwise/config.toml on all platforms
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("threadwise")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config.general.log_level, "info");
        assert!(config.providers.is_empty());
        assert!(config.clients.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let config = AppConfig::from_toml_str(
            r#"
            [general]
            log_level = "debug"

            [providers.deepseek]
            base_url = "http://localhost:9000/v1"

            [providers.deepseek.params]
            model = "deepseek-reasoner"
            maxTokens = 800

            [clients.ole.moderation]
            enabled = true
            provider = "DeepSeek"
            apiKey = "sk-test"
            prompt = "Revisar: {text}"
            "#,
        )
        .unwrap();

        assert_eq!(config.general.log_level, "debug");

        let deepseek = &config.providers["deepseek"];
        assert_eq!(deepseek.base_url.as_deref(), Some("http://localhost:9000/v1"));
        assert_eq!(deepseek.params["model"], serde_json::json!("deepseek-reasoner"));
        assert_eq!(deepseek.params["maxTokens"], serde_json::json!(800));

        let moderation = &config.clients["ole"]["moderation"];
        assert_eq!(moderation["provider"], serde_json::json!("DeepSeek"));
        assert_eq!(moderation["enabled"], serde_json::json!(true));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let err = AppConfig::from_toml_str("[general\nlog_level = ").unwrap_err();
        assert!(matches!(err, crate::Error::TomlParse(_)));
    }
}
