//! OpenAI-compatible chat completions backend.

use crate::config::ModelConfig;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use drafter_core::{LanguageModel, Message};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct ChatCompletionsRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiCompatibleModel {
    config: ModelConfig,
    api_key: Option<String>,
    client: Client,
}

impl OpenAiCompatibleModel {
    pub fn new(config: ModelConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;
        let api_key = config.api_key();
        if api_key.is_none() {
            tracing::warn!(
                "{} is not set; requests to {} will be unauthenticated",
                config.api_key_env,
                config.base_url
            );
        }
        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    async fn send_request(&self, messages: &[Message], json_mode: bool) -> Result<String> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                // 1s, 2s, 4s, ...
                let delay = Duration::from_secs(2u64.pow(attempt - 1));
                tokio::time::sleep(delay).await;
            }

            match self.try_request(messages, json_mode).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    if attempt < self.config.max_retries {
                        tracing::warn!(
                            "{} request failed (attempt {}/{}): {:#}; retrying",
                            self.config.model,
                            attempt + 1,
                            self.config.max_retries + 1,
                            e
                        );
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("All retry attempts failed")))
    }

    async fn try_request(&self, messages: &[Message], json_mode: bool) -> Result<String> {
        let request = ChatCompletionsRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            response_format: json_mode.then_some(ResponseFormat {
                format_type: "json_object",
            }),
        };

        let mut builder = self.client.post(self.endpoint()).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", self.config.base_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!("API error ({}): {}", status, body));
        }

        let parsed: ChatCompletionsResponse = response
            .json()
            .await
            .context("Failed to parse chat completions response")?;
        extract_content(parsed)
    }
}

fn extract_content(response: ChatCompletionsResponse) -> Result<String> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("No choices in response"))?;
    Ok(choice.message.content.unwrap_or_default())
}

#[async_trait]
impl LanguageModel for OpenAiCompatibleModel {
    async fn invoke(&self, messages: &[Message], json_mode: bool) -> Result<String> {
        tracing::debug!(
            model = %self.config.model,
            json_mode,
            messages = messages.len(),
            "chat completion"
        );
        self.send_request(messages, json_mode).await
    }

    fn name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let messages = vec![Message::system("你是专利代理人"), Message::user("撰写")];
        let request = ChatCompletionsRequest {
            model: "m",
            messages: &messages,
            temperature: 0.1,
            top_p: 0.1,
            response_format: Some(ResponseFormat {
                format_type: "json_object",
            }),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "撰写");
        assert_eq!(value["response_format"]["type"], "json_object");

        let plain = ChatCompletionsRequest {
            response_format: None,
            ..request
        };
        let value = serde_json::to_value(&plain).unwrap();
        assert!(value.get("response_format").is_none());
    }

    #[test]
    fn test_extract_content() {
        let parsed: ChatCompletionsResponse = serde_json::from_str(
            r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"本发明"}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_content(parsed).unwrap(), "本发明");

        let empty: ChatCompletionsResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(extract_content(empty).is_err());

        let null: ChatCompletionsResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert_eq!(extract_content(null).unwrap(), "");
    }

    #[test]
    fn test_endpoint_trims_slash() {
        let config = ModelConfig {
            base_url: "http://localhost:1234/v1/".into(),
            ..ModelConfig::default()
        };
        let model = OpenAiCompatibleModel::new(config).unwrap();
        assert_eq!(model.endpoint(), "http://localhost:1234/v1/chat/completions");
        assert_eq!(model.name(), "mistral-medium-latest");
    }
}
