use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::retry::{is_transient_status, AttemptError};
use super::GenerationParams;

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent {
    role: &'static str,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(rename = "topP", skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(rename = "topK", skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiError>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContentResponse>,
}

#[derive(Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Deserialize)]
struct GeminiPartResponse {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct GeminiError {
    message: String,
}

fn build_request(prompt: &str, params: &GenerationParams) -> GeminiRequest {
    GeminiRequest {
        contents: vec![GeminiContent {
            role: "user",
            parts: vec![GeminiPart {
                text: prompt.to_string(),
            }],
        }],
        generation_config: GenerationConfig {
            temperature: params.temperature,
            top_p: params.top_p,
            top_k: params.top_k,
            max_output_tokens: params.max_tokens,
        },
    }
}

/// Gemini `generateContent` transport
pub(crate) struct GeminiTransport {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GeminiTransport {
    pub fn new(client: Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, AttemptError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, params.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&build_request(prompt, params))
            .send()
            .await
            .map_err(AttemptError::from_reqwest)?;

        let status = response.status();
        let body = response.text().await.map_err(AttemptError::from_reqwest)?;
        let parsed = serde_json::from_str::<GeminiResponse>(&body);

        if !status.is_success() {
            let detail = match parsed {
                Ok(GeminiResponse { error: Some(error), .. }) => error.message,
                _ => body,
            };
            let message = format!("Gemini API error ({}): {}", status, detail);
            return Err(if is_transient_status(status) {
                AttemptError::transient(message)
            } else {
                AttemptError::permanent(message)
            });
        }

        let gemini_response =
            parsed.map_err(|e| AttemptError::permanent(format!("Failed to parse Gemini response: {}", e)))?;

        if let Some(error) = gemini_response.error {
            return Err(AttemptError::permanent(format!("Gemini API error: {}", error.message)));
        }

        gemini_response
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| AttemptError::permanent("Gemini response contained no candidates"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_config_is_nested() {
        let params = GenerationParams {
            model: "gemini-1.5-flash".to_string(),
            temperature: Some(0.5),
            max_tokens: Some(256),
            top_p: Some(0.95),
            top_k: Some(40),
            max_retries: 0,
            timeout_ms: 1000,
        };

        let value = serde_json::to_value(build_request("hola", &params)).unwrap();
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hola");

        let config = &value["generationConfig"];
        assert_eq!(config["temperature"], 0.5);
        assert_eq!(config["topK"], 40);
        assert_eq!(config["maxOutputTokens"], 256);
        assert!(config["topP"].is_number());
        assert!(value.get("temperature").is_none());
        assert!(value.get("model").is_none());
    }

    #[test]
    fn test_unset_parameters_are_omitted() {
        let params = GenerationParams {
            model: "gemini-1.5-flash".to_string(),
            temperature: None,
            max_tokens: None,
            top_p: None,
            top_k: None,
            max_retries: 0,
            timeout_ms: 1000,
        };

        let value = serde_json::to_value(build_request("hola", &params)).unwrap();
        assert_eq!(value["generationConfig"], serde_json::json!({}));
    }
}
