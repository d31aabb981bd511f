use serde_json::{Map, Value};

use super::gemini_api::GeminiTransport;
use super::openai_compat::OpenAiCompatTransport;
use super::retry::{self, AttemptError};
use super::{merge_params, BackendDescriptor, GenerationParams, LlmProvider, WireFormat};
use crate::{Error, Result};

enum Transport {
    OpenAiCompat(OpenAiCompatTransport),
    Gemini(GeminiTransport),
}

/// Provider adapter for any [`BackendDescriptor`].
///
/// Built per request from the client's key and overrides; never shared between clients.
pub struct ChatAdapter {
    name: String,
    params: GenerationParams,
    transport: Transport,
}

impl ChatAdapter {
    pub fn new(descriptor: &BackendDescriptor, api_key: Option<&str>, overrides: &Map<String, Value>) -> Result<Self> {
        let api_key = api_key
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| Error::Config(format!("{} API key not configured", descriptor.display_name)))?;

        let params = merge_params(&descriptor.defaults, overrides);
        let http = reqwest::Client::builder().timeout(params.timeout()).build()?;

        let transport = match descriptor.wire {
            WireFormat::OpenAiChat => {
                Transport::OpenAiCompat(OpenAiCompatTransport::new(http, &descriptor.base_url, api_key))
            }
            WireFormat::GeminiGenerate => Transport::Gemini(GeminiTransport::new(http, &descriptor.base_url, api_key)),
        };

        Ok(Self {
            name: descriptor.display_name.clone(),
            params,
            transport,
        })
    }

    async fn invoke_once(&self, prompt: &str) -> std::result::Result<String, AttemptError> {
        match &self.transport {
            Transport::OpenAiCompat(transport) => transport.chat(prompt, &self.params).await,
            Transport::Gemini(transport) => transport.generate(prompt, &self.params).await,
        }
    }
}

#[async_trait::async_trait]
impl LlmProvider for ChatAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, prompt: &str) -> Result<String> {
        retry::with_retry(&self.name, self.params.max_retries, || self.invoke_once(prompt))
            .await
            .map_err(|e| Error::provider(&self.name, e.message))
    }
}
