mod adapter;
mod descriptor;
mod gemini_api;
mod openai_compat;
mod params;
mod retry;

pub use adapter::ChatAdapter;
pub use descriptor::{builtin_backends, BackendDescriptor, WireFormat};
pub use params::{merge_params, parse_overrides, GenerationParams};

use serde_json::{Map, Value};

use crate::Result;

/// A language-model backend ready to take prompts
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Backend name used in logs and errors
    fn name(&self) -> &str;

    /// Send `prompt` as a single user message and return the first completion's text
    async fn invoke(&self, prompt: &str) -> Result<String>;
}

/// Builds a request-scoped [`LlmProvider`] from a client's secret and tuning overrides
pub trait ProviderFactory: Send + Sync {
    fn build(
        &self,
        api_key: Option<&str>,
        overrides: &Map<String, Value>,
    ) -> Result<Box<dyn LlmProvider>>;
}
