use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

use fusion_core::config::{LlmConfig, LlmProvider};

const OPENAI_DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const OLLAMA_DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Opaque text completion: prompt in, text out.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Calls a hosted chat-completions endpoint (OpenAI) or a local Ollama server.
pub struct HttpLlmClient {
    client: Client,
    provider: LlmProvider,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
}

impl HttpLlmClient {
    /// `None` when the provider is disabled.
    pub fn from_config(config: &LlmConfig) -> Result<Option<Self>> {
        let default_base_url = match config.provider {
            LlmProvider::Disabled => return Ok(None),
            LlmProvider::OpenAi => OPENAI_DEFAULT_BASE_URL,
            LlmProvider::Ollama => OLLAMA_DEFAULT_BASE_URL,
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .context("failed to build llm http client")?;

        let base_url = config
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(default_base_url)
            .trim_end_matches('/')
            .to_string();

        Ok(Some(Self {
            client,
            provider: config.provider,
            base_url,
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        }))
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let (url, body) = completion_request(self.provider, &self.base_url, &self.model, prompt)?;

        let mut request = self.client.post(&url).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response =
            request.send().await.with_context(|| format!("llm request to {url} failed"))?;
        if !response.status().is_success() {
            return Err(anyhow!("llm endpoint returned {}", response.status()));
        }

        let payload: Value =
            response.json().await.context("failed to decode llm response body")?;
        completion_text(self.provider, &payload)
    }
}

fn completion_request(
    provider: LlmProvider,
    base_url: &str,
    model: &str,
    prompt: &str,
) -> Result<(String, Value)> {
    match provider {
        LlmProvider::OpenAi => Ok((
            format!("{base_url}/chat/completions"),
            json!({
                "model": model,
                "messages": [{ "role": "user", "content": prompt }],
            }),
        )),
        LlmProvider::Ollama => Ok((
            format!("{base_url}/api/generate"),
            json!({ "model": model, "prompt": prompt, "stream": false }),
        )),
        LlmProvider::Disabled => Err(anyhow!("llm provider is disabled")),
    }
}

fn completion_text(provider: LlmProvider, payload: &Value) -> Result<String> {
    let text = match provider {
        LlmProvider::OpenAi => payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str),
        LlmProvider::Ollama => payload.get("response").and_then(Value::as_str),
        LlmProvider::Disabled => None,
    };

    text.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("llm response did not contain completion text"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use fusion_core::config::{LlmConfig, LlmProvider};

    use super::{completion_request, completion_text, HttpLlmClient};

    fn config(provider: LlmProvider, base_url: Option<&str>) -> LlmConfig {
        LlmConfig {
            provider,
            api_key: None,
            base_url: base_url.map(str::to_string),
            model: "test-model".to_string(),
            timeout_secs: 2,
        }
    }

    #[test]
    fn disabled_provider_builds_no_client() {
        let client = HttpLlmClient::from_config(&config(LlmProvider::Disabled, None)).expect("ok");
        assert!(client.is_none());
    }

    #[test]
    fn base_url_falls_back_to_provider_default() {
        let client = HttpLlmClient::from_config(&config(LlmProvider::OpenAi, Some("  ")))
            .expect("ok")
            .expect("client");
        assert_eq!(client.base_url, "https://api.openai.com/v1");

        let client =
            HttpLlmClient::from_config(&config(LlmProvider::Ollama, Some("http://gpu:11434/")))
                .expect("ok")
                .expect("client");
        assert_eq!(client.base_url, "http://gpu:11434");
        assert_eq!(client.provider(), LlmProvider::Ollama);
    }

    #[test]
    fn openai_request_uses_chat_completions() {
        let (url, body) =
            completion_request(LlmProvider::OpenAi, "https://api.example", "m", "hi").expect("req");

        assert_eq!(url, "https://api.example/chat/completions");
        assert_eq!(body["messages"][0]["content"], "hi");
        assert_eq!(body["model"], "m");
    }

    #[test]
    fn ollama_request_disables_streaming() {
        let (url, body) =
            completion_request(LlmProvider::Ollama, "http://localhost:11434", "m", "hi")
                .expect("req");

        assert_eq!(url, "http://localhost:11434/api/generate");
        assert_eq!(body["stream"], false);
    }

    #[test]
    fn completion_text_reads_provider_specific_fields() {
        let openai = json!({ "choices": [{ "message": { "content": " Hello there " } }] });
        assert_eq!(completion_text(LlmProvider::OpenAi, &openai).expect("text"), "Hello there");

        let ollama = json!({ "response": "Hi", "done": true });
        assert_eq!(completion_text(LlmProvider::Ollama, &ollama).expect("text"), "Hi");

        let empty = json!({ "response": "   " });
        assert!(completion_text(LlmProvider::Ollama, &empty).is_err());
    }
}
