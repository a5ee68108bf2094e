use crate::cli::commands::*;
use crate::config;
use crate::config::settings::RecapConfig;
use crate::error::RecapError;
use crate::llm::chunking::{char_len, chunk_transcript};
use crate::llm::retry::RetryPolicy;
use crate::summarizer::{Summarizer, SummaryLength, SummaryOptions};
use anyhow::{Context, Result};
use std::path::Path;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

pub async fn handle_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Serve { bind } => handle_serve(bind).await,
        Commands::Summarize {
            file,
            length,
            no_action_items,
        } => handle_summarize(file.as_deref(), summary_options(length, no_action_items)).await,
        Commands::Transcribe {
            audio,
            summarize,
            length,
            no_action_items,
        } => {
            let options = summarize.then(|| summary_options(length, no_action_items));
            handle_transcribe(&audio, options).await
        }
        Commands::Chunk { file, limit } => handle_chunk(file.as_deref(), limit).await,
        Commands::Config { action } => handle_config(action).await,
    }
}

fn summary_options(length: SummaryLength, no_action_items: bool) -> SummaryOptions {
    SummaryOptions {
        length,
        action_items: !no_action_items,
    }
}

async fn handle_serve(bind: Option<String>) -> Result<()> {
    let cfg = config::loader::load_config_with_env()?;
    crate::server::run_server(&cfg, bind.as_deref()).await?;
    Ok(())
}

async fn handle_summarize(file: Option<&Path>, options: SummaryOptions) -> Result<()> {
    let cfg = config::loader::load_config_with_env()?;
    let transcript = read_transcript(file).await?;

    eprintln!(
        "Summarizing {} characters (this may take a while)...",
        char_len(&transcript)
    );

    let summary = summarize_text(&cfg, &transcript, options).await?;
    println!("{}", summary);
    Ok(())
}

async fn handle_transcribe(audio: &Path, summarize: Option<SummaryOptions>) -> Result<()> {
    let cfg = config::loader::load_config_with_env()?;

    let api_key = cfg
        .transcription
        .api_key
        .as_deref()
        .or(cfg.llm.api_key.as_deref())
        .filter(|k| !k.is_empty())
        .ok_or_else(|| RecapError::Config("Transcription API key not configured".to_string()))?;

    eprintln!("Transcribing {}...", audio.display());
    let policy = RetryPolicy::from(&cfg.retry);
    let transcript =
        crate::transcription::openai::transcribe_file(api_key, &cfg.transcription, &policy, audio)
            .await?;

    if transcript.is_empty() {
        eprintln!("No speech detected.");
        return Ok(());
    }

    if let Some(language) = &transcript.language {
        tracing::debug!("Transcript language: {}", language);
    }
    println!("{}", transcript.text);

    if let Some(options) = summarize {
        eprintln!("\nSummarizing transcript...");
        let summary = summarize_text(&cfg, &transcript.text, options).await?;
        println!("\n---\n\n{}", summary);
    }

    Ok(())
}

async fn handle_chunk(file: Option<&Path>, limit: Option<usize>) -> Result<()> {
    let cfg = config::loader::load_config()?;
    let limit = limit.unwrap_or(cfg.summarizer.chunk_char_limit);
    let transcript = read_transcript(file).await?;

    let chunks = chunk_transcript(&transcript, limit)?;
    println!(
        "{} characters -> {} chunk(s) of at most {}",
        char_len(&transcript),
        chunks.len(),
        limit
    );
    for (i, chunk) in chunks.iter().enumerate() {
        println!("  {:>3}: {} chars", i + 1, char_len(chunk));
    }
    Ok(())
}

async fn handle_config(action: ConfigCommands) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let mut cfg = config::loader::load_config()?;
            if cfg.llm.api_key.is_some() {
                cfg.llm.api_key = Some("********".to_string());
            }
            if cfg.transcription.api_key.is_some() {
                cfg.transcription.api_key = Some("********".to_string());
            }
            println!("{}", toml::to_string_pretty(&cfg)?);
        }
        ConfigCommands::Path => {
            println!("{}", config::loader::config_path()?.display());
        }
        ConfigCommands::Init => {
            let path = config::loader::config_path()?;
            if config::loader::init_config_at(&path)? {
                println!("Created {}", path.display());
            } else {
                println!("Config already exists at {}", path.display());
            }
        }
    }
    Ok(())
}

/// Summarize once, cancelling on Ctrl-C.
async fn summarize_text(
    cfg: &RecapConfig,
    transcript: &str,
    options: SummaryOptions,
) -> Result<String> {
    let provider = crate::llm::build_provider(&cfg.llm, &cfg.retry)?;
    let summarizer = Summarizer::new(provider, &cfg.summarizer)?;

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let result = summarizer.summarize(transcript, options, &cancel).await;
    watcher.abort();

    match result {
        Ok(summary) => Ok(summary.text),
        Err(RecapError::Cancelled) => anyhow::bail!("Summarization cancelled"),
        Err(e) => Err(e.into()),
    }
}

async fn read_transcript(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) if path != Path::new("-") => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read transcript {}", path.display())),
        _ => {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .context("Failed to read transcript from stdin")?;
            Ok(text)
        }
    }
}
