pub mod chunking;
pub mod claude;
pub mod openai_compat;
pub mod prompts;
pub mod retry;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::settings::{LlmConfig, RetryConfig};
use crate::error::{RecapError, Result};
use crate::llm::retry::{with_retry, RetryPolicy, Sleeper, TokioSleeper};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Anthropic,
    OpenAI,
    Moonshot,
    OpenRouter,
}

impl LlmProvider {
    pub fn from_provider(provider: &str) -> Option<Self> {
        match provider.to_lowercase().as_str() {
            "anthropic" => Some(Self::Anthropic),
            "openai" => Some(Self::OpenAI),
            "moonshot" => Some(Self::Moonshot),
            "openrouter" => Some(Self::OpenRouter),
            _ => None,
        }
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            Self::OpenAI => "https://api.openai.com/v1",
            Self::Moonshot => "https://api.moonshot.ai/v1",
            Self::OpenRouter => "https://openrouter.ai/api/v1",
            Self::Anthropic => "",
        }
    }
}

/// Turns a prompt into generated text.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Label used in logs.
    fn name(&self) -> &str {
        "completion"
    }
}

/// Applies a [`RetryPolicy`] to every call of the wrapped provider.
pub struct RetryingProvider<P> {
    inner: P,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl<P: CompletionProvider> RetryingProvider<P> {
    pub fn new(inner: P, policy: RetryPolicy) -> Self {
        Self::with_sleeper(inner, policy, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(inner: P, policy: RetryPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            inner,
            policy,
            sleeper,
        }
    }
}

#[async_trait]
impl<P: CompletionProvider> CompletionProvider for RetryingProvider<P> {
    async fn complete(&self, prompt: &str) -> Result<String> {
        with_retry(&self.policy, self.sleeper.as_ref(), self.inner.name(), || {
            self.inner.complete(prompt)
        })
        .await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Build the configured provider wrapped in the configured retry policy.
pub fn build_provider(
    config: &LlmConfig,
    retry: &RetryConfig,
) -> Result<Arc<dyn CompletionProvider>> {
    let provider = LlmProvider::from_provider(&config.provider).ok_or_else(|| {
        RecapError::Config(format!("Invalid LLM provider: {}", config.provider))
    })?;
    let api_key = config
        .api_key
        .as_deref()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| RecapError::Config("API key not configured".to_string()))?;
    let model = config.effective_model();
    let policy = RetryPolicy::from(retry);

    tracing::info!("Using {:?} completion provider with model {}", provider, model);

    let built: Arc<dyn CompletionProvider> = match provider {
        LlmProvider::Anthropic => Arc::new(RetryingProvider::new(
            claude::ClaudeProvider::new(api_key, model)
                .with_sampling(config.temperature, config.max_tokens),
            policy,
        )),
        LlmProvider::OpenAI | LlmProvider::Moonshot | LlmProvider::OpenRouter => {
            let base_url = config.base_url.as_deref().unwrap_or(provider.base_url());
            Arc::new(RetryingProvider::new(
                openai_compat::OpenAiCompatProvider::new(base_url, api_key, model)
                    .with_sampling(config.temperature, config.max_tokens),
                policy,
            ))
        }
    };

    Ok(built)
}

/// Map a non-2xx API response to a typed provider error.
pub(crate) fn provider_error(status: u16, body: &str) -> RecapError {
    let message = api_error_message(body).unwrap_or_else(|| body.trim().to_string());

    let message = match status {
        401 => "Invalid API key. Please check your API key.".to_string(),
        400 => format!("Bad request: {}", message),
        429 => format!("Rate limited: {}", message),
        _ => format!("Completion failed: {} {}", status, message),
    };

    RecapError::provider(status, message)
}

fn api_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?;
    error
        .get("message")
        .and_then(|m| m.as_str())
        .or_else(|| error.as_str())
        .map(str::to_string)
}
