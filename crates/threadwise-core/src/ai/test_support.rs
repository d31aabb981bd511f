//! Recording fakes for orchestrator tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};

use super::providers::{LlmProvider, ProviderFactory};
use crate::clients::{ClientConfigSource, ConfigDomain};
use crate::{Error, Result};

/// Factory whose providers return a canned reply and record every prompt
pub(crate) struct FakeFactory {
    reply: std::result::Result<String, String>,
    builds: AtomicUsize,
    prompts: Arc<Mutex<Vec<String>>>,
    last_overrides: Mutex<Map<String, Value>>,
}

impl FakeFactory {
    pub fn replying(reply: &str) -> Arc<Self> {
        Self::with_reply(Ok(reply.to_string()))
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Self::with_reply(Err(message.to_string()))
    }

    fn with_reply(reply: std::result::Result<String, String>) -> Arc<Self> {
        Arc::new(Self {
            reply,
            builds: AtomicUsize::new(0),
            prompts: Arc::new(Mutex::new(Vec::new())),
            last_overrides: Mutex::new(Map::new()),
        })
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn last_overrides(&self) -> Map<String, Value> {
        self.last_overrides.lock().unwrap().clone()
    }
}

impl ProviderFactory for FakeFactory {
    fn build(
        &self,
        api_key: Option<&str>,
        overrides: &Map<String, Value>,
    ) -> Result<Box<dyn LlmProvider>> {
        if api_key.is_none() {
            return Err(Error::Config("Fake API key not configured".to_string()));
        }
        self.builds.fetch_add(1, Ordering::SeqCst);
        *self.last_overrides.lock().unwrap() = overrides.clone();

        Ok(Box::new(FakeProvider {
            reply: self.reply.clone(),
            prompts: self.prompts.clone(),
        }))
    }
}

struct FakeProvider {
    reply: std::result::Result<String, String>,
    prompts: Arc<Mutex<Vec<String>>>,
}

#[async_trait::async_trait]
impl LlmProvider for FakeProvider {
    fn name(&self) -> &str {
        "Fake"
    }

    async fn invoke(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone().map_err(|message| Error::provider("Fake", message))
    }
}

/// Config source standing in for an unreachable config service
pub(crate) struct FailingSource;

#[async_trait::async_trait]
impl ClientConfigSource for FailingSource {
    async fn client_config(&self, _client_id: &str, _domain: ConfigDomain) -> Result<Value> {
        Err(Error::Other("config service unreachable".to_string()))
    }
}
