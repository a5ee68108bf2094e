use serde::{Deserialize, Serialize};

use crate::error::{RecapError, Result};

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecapConfig {
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub summarizer: SummarizerConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub transcription: TranscriptionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Completion provider: "openai", "openrouter", "moonshot", "anthropic"
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Model override (None = provider default)
    pub model: Option<String>,
    pub api_key: Option<String>,
    /// Endpoint override for OpenAI-compatible providers
    pub base_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl LlmConfig {
    pub fn effective_model(&self) -> &str {
        if let Some(model) = self.model.as_deref().filter(|m| !m.is_empty()) {
            return model;
        }
        match self.provider.to_lowercase().as_str() {
            "anthropic" => "claude-sonnet-4-20250514",
            "openrouter" => "openai/gpt-4o-mini",
            "moonshot" => "moonshot-v1-32k",
            _ => "gpt-3.5-turbo",
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            api_key: None,
            base_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    /// Maximum characters per map-phase chunk
    #[serde(default = "default_chunk_char_limit")]
    pub chunk_char_limit: usize,
    /// Transcripts longer than this are rejected before any provider call
    #[serde(default = "default_max_transcript_chars")]
    pub max_transcript_chars: usize,
    /// Number of summaries kept in the in-memory cache
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl SummarizerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_char_limit == 0 {
            return Err(RecapError::Config(
                "summarizer.chunk_char_limit must be positive".to_string(),
            ));
        }
        if self.cache_capacity == 0 {
            return Err(RecapError::Config(
                "summarizer.cache_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            chunk_char_limit: default_chunk_char_limit(),
            max_transcript_chars: default_max_transcript_chars(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt (0 disables retrying)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// OpenAI API key (falls back to [llm] api_key)
    pub api_key: Option<String>,
    #[serde(default = "default_transcription_model")]
    pub model: String,
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_transcription_model(),
            language: default_language(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_chunk_char_limit() -> usize {
    12000
}

fn default_max_transcript_chars() -> usize {
    20000
}

fn default_cache_capacity() -> usize {
    100
}

fn default_max_retries() -> u32 {
    2
}

fn default_base_delay_ms() -> u64 {
    2000
}

fn default_max_delay_ms() -> u64 {
    30000
}

fn default_bind() -> String {
    "127.0.0.1:8787".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_transcription_model() -> String {
    "whisper-1".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_creates() {
        let config = RecapConfig::default();
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.summarizer.chunk_char_limit, 12000);
        assert_eq!(config.summarizer.max_transcript_chars, 20000);
        assert_eq!(config.summarizer.cache_capacity, 100);
    }

    #[test]
    fn test_effective_model_defaults_per_provider() {
        let mut llm = LlmConfig::default();
        assert_eq!(llm.effective_model(), "gpt-3.5-turbo");

        llm.provider = "anthropic".to_string();
        assert_eq!(llm.effective_model(), "claude-sonnet-4-20250514");

        llm.model = Some("gpt-4o-mini".to_string());
        assert_eq!(llm.effective_model(), "gpt-4o-mini");
    }

    #[test]
    fn test_retry_config_defaults() {
        let retry = RetryConfig::default();
        assert_eq!(retry.max_retries, 2);
        assert_eq!(retry.base_delay_ms, 2000);
    }

    #[test]
    fn test_validate_rejects_zero_chunk_limit() {
        let config = SummarizerConfig {
            chunk_char_limit: 0,
            ..SummarizerConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(SummarizerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: RecapConfig = toml::from_str("[llm]\nmodel = \"gpt-4o\"\n").unwrap();
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.effective_model(), "gpt-4o");
        assert_eq!(config.server.bind, "127.0.0.1:8787");
    }
}
