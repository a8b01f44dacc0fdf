use std::time::Duration;

use async_trait::async_trait;
use rambler_common::{RamblerError, Result};
use serde::{Deserialize, Serialize};

use crate::client::{LlmClient, LlmRequest, LlmResponse, TokenUsage};

const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Default request timeout for chat completions.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    model: String,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: WireMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// Client for any OpenAI-compatible `/v1/chat/completions` endpoint
/// (OpenAI itself, Ollama, LM Studio, vLLM).
pub struct OpenAiClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    http_client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(base_url: Option<String>, model: String, api_key: Option<String>) -> Self {
        Self::with_timeout(base_url, model, api_key, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: Option<String>,
        model: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model,
            api_key,
            http_client,
        }
    }

    fn build_body(&self, request: &LlmRequest) -> ChatCompletionRequest {
        let system = request.system_prompt.iter().map(|content| WireMessage {
            role: "system".to_string(),
            content: content.clone(),
        });
        let turns = request.messages.iter().map(|msg| WireMessage {
            role: msg.role.as_str().to_string(),
            content: msg.content.clone(),
        });

        ChatCompletionRequest {
            model: self.model.clone(),
            messages: system.chain(turns).collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.build_body(&request);

        let mut http_req = self.http_client.post(&url).json(&body);
        if let Some(ref key) = self.api_key {
            http_req = http_req.bearer_auth(key);
        }

        let response = http_req.send().await.map_err(|e| {
            if e.is_timeout() {
                RamblerError::Llm(format!("request to {url} timed out"))
            } else {
                RamblerError::Llm(format!("request failed: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(RamblerError::Llm(format!("API error {status}: {body_text}")));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| RamblerError::Llm(format!("failed to parse completion: {e}")))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| RamblerError::Llm("no choices in completion".to_string()))?;

        Ok(LlmResponse {
            content: choice.message.content,
            model: parsed.model,
            usage: parsed.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            }),
            finish_reason: choice.finish_reason,
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ChatMessage, Role};

    #[test]
    fn body_puts_system_prompt_first() {
        let client = OpenAiClient::new(None, "gemma2".to_string(), None);
        let request = LlmRequest {
            system_prompt: Some("Answer tersely.".to_string()),
            messages: vec![ChatMessage {
                role: Role::User,
                content: "Segment 1 vs Segment 2".to_string(),
            }],
            temperature: Some(0.0),
            max_tokens: Some(64),
        };

        let json = serde_json::to_value(client.build_body(&request)).unwrap();

        assert_eq!(json["model"], "gemma2");
        assert_eq!(json["max_tokens"], 64);
        let messages = json["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[1]["content"], "Segment 1 vs Segment 2");
    }

    #[test]
    fn body_omits_unset_sampling_fields() {
        let client = OpenAiClient::new(None, "gemma2".to_string(), None);
        let json = serde_json::to_value(client.build_body(&LlmRequest::prompt("hi"))).unwrap();

        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
        assert!(json.get("temperature").is_none());
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn base_url_defaults_to_local_server_and_drops_trailing_slash() {
        let local = OpenAiClient::new(None, "llama3".to_string(), None);
        assert_eq!(local.base_url, "http://localhost:11434");

        let remote = OpenAiClient::new(
            Some("https://api.openai.com/".to_string()),
            "gpt-4o-mini".to_string(),
            Some("sk-test".to_string()),
        );
        assert_eq!(remote.base_url, "https://api.openai.com");
    }
}
