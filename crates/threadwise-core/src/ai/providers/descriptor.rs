use serde_json::{Map, Value};

use super::{ChatAdapter, GenerationParams, LlmProvider, ProviderFactory};
use crate::Result;

/// Request shape a backend expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    /// Flat chat-completions body (`model`, `temperature`, `max_tokens`, ...)
    OpenAiChat,
    /// `generateContent` body with a nested `generationConfig`
    GeminiGenerate,
}

/// Everything that distinguishes one backend from another.
/// Adding a backend means adding one of these, nothing else.
#[derive(Debug, Clone)]
pub struct BackendDescriptor {
    /// Registry key, lowercase
    pub id: String,
    pub display_name: String,
    /// Additional registry keys
    pub aliases: Vec<String>,
    pub base_url: String,
    pub wire: WireFormat,
    pub defaults: GenerationParams,
}

impl BackendDescriptor {
    pub fn openai() -> Self {
        Self {
            id: "openai".to_string(),
            display_name: "OpenAI".to_string(),
            aliases: Vec::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            wire: WireFormat::OpenAiChat,
            defaults: GenerationParams {
                model: "gpt-4o-mini".to_string(),
                temperature: Some(0.7),
                max_tokens: Some(5000),
                top_p: None,
                top_k: None,
                max_retries: 2,
                timeout_ms: 60_000,
            },
        }
    }

    pub fn grok() -> Self {
        Self {
            id: "grok".to_string(),
            display_name: "Grok".to_string(),
            aliases: vec!["xai".to_string()],
            base_url: "https://api.x.ai/v1".to_string(),
            wire: WireFormat::OpenAiChat,
            defaults: GenerationParams {
                model: "grok-2-latest".to_string(),
                temperature: Some(0.7),
                max_tokens: Some(1000),
                top_p: None,
                top_k: None,
                max_retries: 2,
                timeout_ms: 30_000,
            },
        }
    }

    pub fn deepseek() -> Self {
        Self {
            id: "deepseek".to_string(),
            display_name: "DeepSeek".to_string(),
            aliases: Vec::new(),
            base_url: "https://api.deepseek.com".to_string(),
            wire: WireFormat::OpenAiChat,
            defaults: GenerationParams {
                model: "deepseek-chat".to_string(),
                temperature: Some(0.7),
                max_tokens: Some(2000),
                top_p: None,
                top_k: None,
                max_retries: 2,
                timeout_ms: 30_000,
            },
        }
    }

    pub fn gemini() -> Self {
        Self {
            id: "gemini".to_string(),
            display_name: "Gemini".to_string(),
            aliases: Vec::new(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            wire: WireFormat::GeminiGenerate,
            defaults: GenerationParams {
                model: "gemini-1.5-flash".to_string(),
                temperature: Some(0.7),
                max_tokens: Some(2048),
                top_p: Some(0.95),
                top_k: Some(40),
                max_retries: 2,
                timeout_ms: 30_000,
            },
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Whether `key` names this backend, ignoring case
    pub fn matches(&self, key: &str) -> bool {
        let key = key.trim();
        self.id.eq_ignore_ascii_case(key) || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(key))
    }
}

/// The backends available without any configuration
pub fn builtin_backends() -> Vec<BackendDescriptor> {
    vec![
        BackendDescriptor::openai(),
        BackendDescriptor::grok(),
        BackendDescriptor::deepseek(),
        BackendDescriptor::gemini(),
    ]
}

impl ProviderFactory for BackendDescriptor {
    fn build(
        &self,
        api_key: Option<&str>,
        overrides: &Map<String, Value>,
    ) -> Result<Box<dyn LlmProvider>> {
        Ok(Box::new(ChatAdapter::new(self, api_key, overrides)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_defaults() {
        let openai = BackendDescriptor::openai();
        assert_eq!(openai.defaults.max_tokens, Some(5000));
        assert_eq!(openai.defaults.timeout_ms, 60_000);

        let grok = BackendDescriptor::grok();
        assert_eq!(grok.defaults.max_tokens, Some(1000));
        assert_eq!(grok.defaults.timeout_ms, 30_000);

        let deepseek = BackendDescriptor::deepseek();
        assert_eq!(deepseek.wire, WireFormat::OpenAiChat);
        assert_ne!(deepseek.base_url, openai.base_url);
        assert_eq!(deepseek.defaults.timeout_ms, 30_000);

        assert_eq!(BackendDescriptor::gemini().wire, WireFormat::GeminiGenerate);
    }

    #[test]
    fn test_matches_ids_and_aliases() {
        let grok = BackendDescriptor::grok();
        assert!(grok.matches("Grok"));
        assert!(grok.matches("XAI"));
        assert!(!grok.matches("openai"));
    }

    #[test]
    fn test_builtin_ids_are_unique() {
        let backends = builtin_backends();
        for (i, a) in backends.iter().enumerate() {
            for b in backends.iter().skip(i + 1) {
                assert!(!a.matches(&b.id), "{} shadows {}", a.id, b.id);
            }
        }
    }
}
