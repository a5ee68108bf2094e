use crate::config::settings::TranscriptionConfig;
use crate::error::{RecapError, Result};
use crate::llm::retry::{with_retry, RetryPolicy, TokioSleeper};
use crate::transcription::Transcript;
use reqwest::multipart;
use serde::Deserialize;
use std::path::Path;

const OPENAI_API_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    text: String,
    #[serde(default)]
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorBody {
    error: OpenAIErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorDetail {
    message: String,
}

/// Transcribe audio file via OpenAI Whisper API
pub async fn transcribe_file<P: AsRef<Path>>(
    api_key: &str,
    config: &TranscriptionConfig,
    policy: &RetryPolicy,
    audio_path: P,
) -> Result<Transcript> {
    let audio_data = tokio::fs::read(audio_path.as_ref()).await?;
    let filename = audio_path
        .as_ref()
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("audio.webm")
        .to_string();

    transcribe_bytes(api_key, config, policy, &audio_data, &filename).await
}

/// Transcribe audio bytes, retrying rate limits and server errors
pub async fn transcribe_bytes(
    api_key: &str,
    config: &TranscriptionConfig,
    policy: &RetryPolicy,
    audio_data: &[u8],
    filename: &str,
) -> Result<Transcript> {
    let client = reqwest::Client::new();

    tracing::info!("Transcribing {} ({} bytes)", filename, audio_data.len());

    with_retry(policy, &TokioSleeper, "transcription", || {
        send_once(&client, api_key, config, audio_data, filename)
    })
    .await
}

async fn send_once(
    client: &reqwest::Client,
    api_key: &str,
    config: &TranscriptionConfig,
    audio_data: &[u8],
    filename: &str,
) -> Result<Transcript> {
    let file_part = multipart::Part::bytes(audio_data.to_vec())
        .file_name(filename.to_string())
        .mime_str(mime_for(filename))?;

    let form = multipart::Form::new()
        .text("model", config.model.clone())
        .text("language", config.language.clone())
        .part("file", file_part);

    let response = client
        .post(OPENAI_API_URL)
        .bearer_auth(api_key)
        .multipart(form)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(transcription_error(status.as_u16(), &body));
    }

    let result: OpenAIResponse = response.json().await.map_err(|e| {
        RecapError::Internal(format!("Failed to parse transcription response: {}", e))
    })?;

    Ok(Transcript {
        text: result.text.trim().to_string(),
        language: result.language.or_else(|| Some(config.language.clone())),
    })
}

fn transcription_error(status: u16, body: &str) -> RecapError {
    let message = serde_json::from_str::<OpenAIErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string());

    match status {
        401 => RecapError::provider(status, "Invalid API key. Please check your OpenAI API key."),
        400 => RecapError::provider(status, format!("Bad request: {}", message)),
        _ => RecapError::provider(
            status,
            format!("Transcription failed: {} {}", status, message),
        ),
    }
}

fn mime_for(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);

    match ext.as_deref() {
        Some("wav") => "audio/wav",
        Some("mp3") | Some("mpga") | Some("mpeg") => "audio/mpeg",
        Some("m4a") | Some("mp4") => "audio/mp4",
        Some("ogg") => "audio/ogg",
        Some("flac") => "audio/flac",
        _ => "audio/webm",
    }
}
