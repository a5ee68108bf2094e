use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::summarizer::SummaryLength;

#[derive(Parser)]
#[command(name = "recap")]
#[command(author, version, about = "Chunked meeting transcript summarization")]
#[command(
    long_about = "Summarize long meeting transcripts by summarizing bounded chunks and merging the results, as a CLI or an HTTP service"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP summarization service
    Serve {
        /// Address to listen on (overrides [server] bind)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Summarize a transcript file (or stdin)
    Summarize {
        /// Transcript file, "-" or omitted for stdin
        file: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value_t = SummaryLength::Brief)]
        length: SummaryLength,

        /// Only highlight decisions
        #[arg(long)]
        no_action_items: bool,
    },

    /// Transcribe an audio file with the hosted API
    Transcribe {
        /// Audio file (webm, wav, mp3, m4a, ogg, flac)
        audio: PathBuf,

        /// Summarize the transcript afterwards
        #[arg(short, long)]
        summarize: bool,

        #[arg(short, long, value_enum, default_value_t = SummaryLength::Brief)]
        length: SummaryLength,

        #[arg(long)]
        no_action_items: bool,
    },

    /// Show how a transcript would be chunked
    Chunk {
        /// Transcript file, "-" or omitted for stdin
        file: Option<PathBuf>,

        /// Characters per chunk (overrides [summarizer] chunk_char_limit)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Print config file path
    Path,
    /// Initialize default configuration
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_summarize_options() {
        let cli = Cli::parse_from([
            "recap",
            "summarize",
            "notes.txt",
            "--length",
            "detailed",
            "--no-action-items",
        ]);
        match cli.command {
            Commands::Summarize {
                file,
                length,
                no_action_items,
            } => {
                assert_eq!(file, Some(PathBuf::from("notes.txt")));
                assert_eq!(length, SummaryLength::Detailed);
                assert!(no_action_items);
            }
            _ => panic!("Wrong command"),
        }
    }

    #[test]
    fn test_verbose_is_global() {
        let cli = Cli::parse_from(["recap", "serve", "-vv"]);
        assert_eq!(cli.verbose, 2);
    }
}
