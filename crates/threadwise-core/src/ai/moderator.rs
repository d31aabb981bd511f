use std::sync::Arc;

use serde_json::Value;

use super::providers::parse_overrides;
use super::{prompts, run_provider, ProviderRegistry};
use crate::clients::{self, ClientConfigSource, ConfigDomain};
use crate::models::ModerationVerdict;
use crate::Error;

pub const MODERATION_DISABLED: &str = "Moderation disabled.";
pub const MODERATION_FAILED: &str = "Error moderating with the provider.";

/// Accept/reject verdicts for single comments
pub struct Moderator {
    registry: Arc<ProviderRegistry>,
    configs: Arc<dyn ClientConfigSource>,
}

impl Moderator {
    pub fn new(registry: Arc<ProviderRegistry>, configs: Arc<dyn ClientConfigSource>) -> Self {
        Self { registry, configs }
    }

    /// Moderate `text` for `client_id`.
    ///
    /// Never fails: problems come back as a verdict with `is_rejected: None`.
    /// An object passed as `config_override` replaces the client's tuning
    /// parameters for this call only.
    pub async fn moderate(&self, client_id: &str, text: &str, config_override: Option<&Value>) -> ModerationVerdict {
        let config = match clients::resolve(self.configs.as_ref(), client_id, ConfigDomain::Moderation).await {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(client_id = %client_id, error = %e, "Moderation configuration unavailable");
                return ModerationVerdict::failed(e.to_string());
            }
        };

        if !config.enabled {
            tracing::info!(client_id = %client_id, "Moderation disabled for client");
            return ModerationVerdict::failed(MODERATION_DISABLED);
        }

        let Some(factory) = self.registry.get(&config.provider) else {
            tracing::warn!(client_id = %client_id, provider = %config.provider, "Unsupported moderation provider");
            return ModerationVerdict::failed(Error::UnsupportedProvider(config.provider).to_string());
        };

        let tuning = match config_override {
            Some(value) if value.is_object() => Some(value),
            _ => config.config_json.as_ref(),
        };
        let overrides = parse_overrides(tuning);
        let prompt = prompts::moderation_prompt(text, config.prompt.as_deref());

        match run_provider(factory.as_ref(), config.api_key.as_deref(), &overrides, &prompt).await {
            Ok(raw) => {
                let verdict = ModerationVerdict::from_response(raw);
                tracing::debug!(client_id = %client_id, rejected = ?verdict.is_rejected, "Comment moderated");
                verdict
            }
            Err(e) => {
                tracing::error!(
                    client_id = %client_id,
                    provider = %config.provider,
                    error = %e,
                    "Error moderating with the provider"
                );
                ModerationVerdict::failed(MODERATION_FAILED)
            }
        }
    }
}
