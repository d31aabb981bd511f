use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    error::{ApiError, OpenAIError},
    types::{ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
    Client,
};
use backoff::ExponentialBackoffBuilder;

use super::retry::AttemptError;
use super::GenerationParams;

/// Chat-completions transport shared by OpenAI, X.AI and DeepSeek.
/// The backends differ only in base endpoint and defaults.
///
/// The client's own rate-limit backoff is disabled; rate limiting surfaces as a
/// transient [`AttemptError`] and is retried by the adapter within `max_retries`.
pub(crate) struct OpenAiCompatTransport {
    client: Client<OpenAIConfig>,
}

impl OpenAiCompatTransport {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(base_url.trim_end_matches('/'));
        let no_backoff = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(Duration::ZERO))
            .build();
        let client = Client::with_config(config)
            .with_http_client(http)
            .with_backoff(no_backoff);

        Self { client }
    }

    pub async fn chat(&self, prompt: &str, params: &GenerationParams) -> Result<String, AttemptError> {
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| AttemptError::permanent(e.to_string()))?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(params.model.as_str())
            .messages(vec![ChatCompletionRequestMessage::User(message)]);
        if let Some(temperature) = params.temperature {
            args.temperature(temperature);
        }
        if let Some(max_tokens) = params.max_tokens {
            args.max_tokens(max_tokens);
        }
        if let Some(top_p) = params.top_p {
            args.top_p(top_p);
        }
        let request = args.build().map_err(|e| AttemptError::permanent(e.to_string()))?;

        let response = self.client.chat().create(request).await.map_err(classify)?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AttemptError::permanent("Response contained no completion"))
    }
}

fn classify(err: OpenAIError) -> AttemptError {
    match err {
        OpenAIError::Reqwest(e) => AttemptError::from_reqwest(e),
        OpenAIError::ApiError(e) if is_rate_limited(&e) => AttemptError::transient(e.to_string()),
        other => AttemptError::permanent(other.to_string()),
    }
}

/// Rate-limit replies as reported by OpenAI-compatible backends.
/// Quota exhaustion shares the 429 status but is not worth retrying.
fn is_rate_limited(err: &ApiError) -> bool {
    let code_or_type = [err.code.as_deref(), err.r#type.as_deref()];
    if code_or_type.contains(&Some("insufficient_quota")) {
        return false;
    }
    code_or_type
        .iter()
        .flatten()
        .any(|s| s.contains("rate_limit"))
        || err.message.to_ascii_lowercase().contains("rate limit")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(message: &str, r#type: Option<&str>, code: Option<&str>) -> ApiError {
        ApiError {
            message: message.to_string(),
            r#type: r#type.map(str::to_string),
            param: None,
            code: code.map(str::to_string),
        }
    }

    #[test]
    fn test_rate_limit_errors_are_transient() {
        let limited = api_error("Rate limit reached for gpt-4o-mini", Some("requests"), Some("rate_limit_exceeded"));
        assert!(classify(OpenAIError::ApiError(limited)).transient);

        let by_message = api_error("Rate limit exceeded, slow down", None, None);
        assert!(classify(OpenAIError::ApiError(by_message)).transient);
    }

    #[test]
    fn test_quota_and_auth_errors_are_permanent() {
        let quota = api_error(
            "You exceeded your current quota",
            Some("insufficient_quota"),
            Some("insufficient_quota"),
        );
        assert!(!classify(OpenAIError::ApiError(quota)).transient);

        let auth = api_error("Incorrect API key provided", Some("invalid_request_error"), Some("invalid_api_key"));
        assert!(!classify(OpenAIError::ApiError(auth)).transient);
    }
}
