use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{RecapError, Result};
use crate::llm::{provider_error, CompletionProvider};

const CLAUDE_API_URL: &str = "https://api.anthropic.com/v1/messages";

#[derive(Debug, Serialize)]
struct ClaudeRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ClaudeMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ClaudeMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContent>,
}

#[derive(Debug, Deserialize)]
struct ClaudeContent {
    #[serde(default)]
    text: Option<String>,
}

pub struct ClaudeProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl ClaudeProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.3,
            max_tokens: 4096,
        }
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait]
impl CompletionProvider for ClaudeProvider {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ClaudeRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            messages: vec![ClaudeMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(CLAUDE_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(provider_error(status.as_u16(), &body));
        }

        let claude_response: ClaudeResponse = response.json().await.map_err(|e| {
            RecapError::Internal(format!("Failed to parse Claude API response: {}", e))
        })?;

        claude_response
            .content
            .into_iter()
            .find_map(|c| c.text)
            .ok_or_else(|| RecapError::Internal("No content in Claude response".to_string()))
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_structure() {
        let request = ClaudeRequest {
            model: "claude-sonnet-4-20250514",
            max_tokens: 4096,
            temperature: 0.3,
            messages: vec![ClaudeMessage {
                role: "user",
                content: "test",
            }],
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("claude-sonnet-4-20250514"));
        assert!(json.contains("test"));
    }

    #[test]
    fn test_response_skips_non_text_blocks() {
        let body = r#"{"content":[{"type":"thinking"},{"type":"text","text":"FINAL"}]}"#;
        let parsed: ClaudeResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.content.into_iter().find_map(|c| c.text).as_deref(), Some("FINAL"));
    }
}
