mod analyzer;
mod moderator;
pub mod prompts;
pub mod providers;
mod registry;

#[cfg(test)]
mod test_support;

pub use analyzer::{Analyzer, ANALYSIS_DISABLED, ANALYSIS_FAILED};
pub use moderator::{Moderator, MODERATION_DISABLED, MODERATION_FAILED};
pub use registry::ProviderRegistry;

use serde_json::{Map, Value};

use crate::Result;
use providers::ProviderFactory;

/// Build a request-scoped provider and send it one prompt
async fn run_provider(
    factory: &dyn ProviderFactory,
    api_key: Option<&str>,
    overrides: &Map<String, Value>,
    prompt: &str,
) -> Result<String> {
    let provider = factory.build(api_key, overrides)?;
    tracing::debug!(provider = %provider.name(), prompt_chars = prompt.chars().count(), "Invoking provider");
    provider.invoke(prompt).await
}
