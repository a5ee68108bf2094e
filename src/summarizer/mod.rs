//! Hierarchical transcript summarization.
//!
//! A transcript is split into bounded chunks, each chunk is summarized on its
//! own (map), and the partial summaries are merged by one final completion
//! (reduce). Results are cached by [`Fingerprint`] so an identical request
//! never reaches the provider twice.

pub mod cache;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::config::settings::SummarizerConfig;
use crate::error::{RecapError, Result};
use crate::llm::chunking::{char_len, chunk_transcript, needs_chunking};
use crate::llm::{prompts, CompletionProvider};

pub use cache::{Fingerprint, SummaryCache};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SummaryLength {
    #[default]
    Brief,
    Detailed,
}

impl SummaryLength {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Brief => "brief",
            Self::Detailed => "detailed",
        }
    }
}

impl fmt::Display for SummaryLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryOptions {
    pub length: SummaryLength,
    /// Ask for action items in addition to decisions
    pub action_items: bool,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            length: SummaryLength::Brief,
            action_items: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub text: String,
    /// Served from the cache without any provider call
    pub cached: bool,
}

pub struct Summarizer {
    provider: Arc<dyn CompletionProvider>,
    cache: Arc<SummaryCache>,
    chunk_char_limit: usize,
    max_transcript_chars: usize,
    inflight: Mutex<HashMap<Fingerprint, Arc<tokio::sync::Mutex<()>>>>,
}

impl Summarizer {
    pub fn new(provider: Arc<dyn CompletionProvider>, config: &SummarizerConfig) -> Result<Self> {
        let cache = Arc::new(SummaryCache::new(config.cache_capacity));
        Self::with_cache(provider, cache, config)
    }

    pub fn with_cache(
        provider: Arc<dyn CompletionProvider>,
        cache: Arc<SummaryCache>,
        config: &SummarizerConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            provider,
            cache,
            chunk_char_limit: config.chunk_char_limit,
            max_transcript_chars: config.max_transcript_chars,
            inflight: Mutex::new(HashMap::new()),
        })
    }

    pub fn cache(&self) -> &SummaryCache {
        &self.cache
    }

    /// Summarize `transcript`, consulting the cache first.
    ///
    /// Fails with `PayloadTooLarge` before any provider call when the
    /// transcript is over the limit, and with `Cancelled` as soon as `cancel`
    /// fires. Nothing is cached unless the reduce step succeeds.
    pub async fn summarize(
        &self,
        transcript: &str,
        options: SummaryOptions,
        cancel: &CancellationToken,
    ) -> Result<Summary> {
        if transcript.is_empty() {
            return Err(RecapError::InvalidInput("Transcript required".to_string()));
        }

        let len = char_len(transcript);
        if len > self.max_transcript_chars {
            return Err(RecapError::PayloadTooLarge {
                len,
                max: self.max_transcript_chars,
            });
        }

        let key = Fingerprint::of(transcript, &options);
        if let Some(entry) = self.cache.get(&key) {
            tracing::debug!("Cache hit for {} (cached at {})", key, entry.created_at);
            return Ok(Summary {
                text: entry.summary,
                cached: true,
            });
        }

        let slot = InflightSlot::acquire(self, key);
        let _running = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RecapError::Cancelled),
            guard = slot.lock.lock() => guard,
        };

        // Another request for the same fingerprint may have finished while we waited.
        if let Some(entry) = self.cache.get(&key) {
            tracing::debug!("Cache filled by concurrent request for {}", key);
            return Ok(Summary {
                text: entry.summary,
                cached: true,
            });
        }

        if needs_chunking(transcript, self.chunk_char_limit) {
            tracing::info!("Transcript is large, using chunked summarization");
        }
        let chunks = chunk_transcript(transcript, self.chunk_char_limit)?;
        tracing::info!(
            "Summarizing {} characters in {} chunk(s) with {}",
            len,
            chunks.len(),
            self.provider.name()
        );

        let partials = self.map_chunks(&chunks, &options, cancel).await?;
        let summary = self.reduce_partials(&partials, &options, cancel).await?;

        let evicted = self.cache.insert(key, summary.clone());
        if evicted > 0 {
            tracing::debug!("Evicted {} cached summaries", evicted);
        }

        Ok(Summary {
            text: summary,
            cached: false,
        })
    }

    /// Summarize each chunk in order, one provider call at a time.
    pub async fn map_chunks(
        &self,
        chunks: &[&str],
        options: &SummaryOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        let mut partials = Vec::with_capacity(chunks.len());

        for (i, chunk) in chunks.iter().enumerate() {
            tracing::info!(
                "Summarizing chunk {}/{} ({} chars)",
                i + 1,
                chunks.len(),
                char_len(chunk)
            );

            let prompt = prompts::chunk_summary_prompt(chunk, options);
            let partial = self.complete(&prompt, cancel).await?;
            partials.push(partial.trim().to_string());
        }

        Ok(partials)
    }

    /// Merge partial summaries, in the order given, into the final summary.
    pub async fn reduce_partials(
        &self,
        partials: &[String],
        options: &SummaryOptions,
        cancel: &CancellationToken,
    ) -> Result<String> {
        tracing::info!(
            "Synthesizing {} chunk summaries into final summary",
            partials.len()
        );

        let prompt = prompts::synthesis_prompt(partials, options);
        let summary = self.complete(&prompt, cancel).await?;
        Ok(summary.trim().to_string())
    }

    async fn complete(&self, prompt: &str, cancel: &CancellationToken) -> Result<String> {
        if cancel.is_cancelled() {
            return Err(RecapError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RecapError::Cancelled),
            result = self.provider.complete(prompt) => result,
        }
    }
}

/// Per-fingerprint lock, dropped from the table once nobody holds it.
struct InflightSlot<'a> {
    summarizer: &'a Summarizer,
    key: Fingerprint,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl<'a> InflightSlot<'a> {
    fn acquire(summarizer: &'a Summarizer, key: Fingerprint) -> Self {
        let mut inflight = summarizer
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let lock = inflight.entry(key).or_default().clone();
        Self {
            summarizer,
            key,
            lock,
        }
    }
}

impl Drop for InflightSlot<'_> {
    fn drop(&mut self) {
        let mut inflight = self
            .summarizer
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // One reference in the table, one here.
        if Arc::strong_count(&self.lock) <= 2 {
            inflight.remove(&self.key);
        }
    }
}
