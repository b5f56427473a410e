//! OpenAI-compatible completions client (https://api.openai.com/v1 by default).
//! One non-streaming POST /completions per prompt.

use crate::config::Config;
use crate::llm::CompletionBackend;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "text-davinci-003";
const DEFAULT_MAX_TOKENS: u32 = 150;

/// Client for the text completions endpoint.
#[derive(Clone)]
pub struct CompletionClient {
    base_url: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
    client: reqwest::Client,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("completion request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("completion api error: {0}")]
    Api(String),
    #[error("completion response had no choices")]
    EmptyResponse,
    #[error("completion api key not configured")]
    MissingApiKey,
}

impl CompletionClient {
    pub fn new(base_url: Option<String>, api_key: Option<String>) -> Self {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            base_url,
            api_key,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            client: reqwest::Client::new(),
        }
    }

    /// Build from the completion section as given; env overrides are applied earlier by
    /// `config::apply_env_overrides`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Some(config.completion.base_url.clone()),
            config.completion.api_key(),
        )
        .with_model(&config.completion.model)
        .with_max_tokens(config.completion.max_tokens)
    }

    pub fn with_model(mut self, model: &str) -> Self {
        let model = model.trim();
        if !model.is_empty() {
            self.model = model.to_string();
        }
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// POST /completions — returns the first choice's text as generated (not trimmed).
    pub async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::MissingApiKey)?;
        let url = format!("{}/completions", self.base_url);
        let body = CompletionRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            max_tokens: self.max_tokens,
        };
        let res = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ProviderError::Api(format!("{} {}", status, body)));
        }
        let data: CompletionResponse = res.json().await?;
        data.into_text().ok_or(ProviderError::EmptyResponse)
    }
}

#[async_trait]
impl CompletionBackend for CompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        CompletionClient::complete(self, prompt).await
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionChoice {
    #[serde(default)]
    pub text: String,
}

impl CompletionResponse {
    /// Text of the first choice, if any.
    pub fn into_text(self) -> Option<String> {
        self.choices.into_iter().next().map(|c| c.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_snake_case_max_tokens() {
        let req = CompletionRequest {
            model: "text-davinci-003".to_string(),
            prompt: "hello".to_string(),
            max_tokens: 150,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(
            v,
            serde_json::json!({ "model": "text-davinci-003", "prompt": "hello", "max_tokens": 150 })
        );
    }

    #[test]
    fn response_takes_first_choice() {
        let data: CompletionResponse = serde_json::from_str(
            r#"{ "id": "cmpl-1", "choices": [ { "text": "\n\nHi there", "index": 0 }, { "text": "other" } ] }"#,
        )
        .unwrap();
        assert_eq!(data.into_text().as_deref(), Some("\n\nHi there"));
    }

    #[test]
    fn response_without_choices_is_empty() {
        let data: CompletionResponse = serde_json::from_str(r#"{ "id": "cmpl-1" }"#).unwrap();
        assert!(data.into_text().is_none());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = CompletionClient::new(Some("http://127.0.0.1:9/v1/".to_string()), None);
        assert_eq!(client.base_url, "http://127.0.0.1:9/v1");
        assert_eq!(client.model(), DEFAULT_MODEL);
    }

    #[test]
    fn blank_model_keeps_default() {
        let client = CompletionClient::new(None, None).with_model("  ");
        assert_eq!(client.model(), DEFAULT_MODEL);
    }

    #[test]
    fn from_config_ignores_ambient_api_key() {
        let mut config = Config::default();
        config.completion.api_key = Some("sk-file".to_string());
        config.completion.max_tokens = 42;
        let client = crate::config::with_env(&[("OPENAI_API_KEY", Some("sk-env"))], || {
            CompletionClient::from_config(&config)
        });
        assert_eq!(client.api_key.as_deref(), Some("sk-file"));
        assert_eq!(client.max_tokens, 42);

        config.completion.api_key = Some("  ".to_string());
        let client = crate::config::with_env(&[("OPENAI_API_KEY", Some("sk-env"))], || {
            CompletionClient::from_config(&config)
        });
        assert!(client.api_key.is_none());
    }

    #[tokio::test]
    async fn missing_api_key_fails_before_request() {
        let client = CompletionClient::new(Some("http://127.0.0.1:9/v1".to_string()), None);
        let err = client.complete("hi").await.unwrap_err();
        assert!(matches!(err, ProviderError::MissingApiKey));
    }
}
