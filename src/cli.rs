use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use tokio_util::sync::CancellationToken;

use crate::render::OutputFormat;
use crate::request::{Language, StreamRequest};

#[derive(Parser, Debug)]
#[command(name = "gpt-relay")]
#[command(version)]
#[command(about = "Stream translations and pros/cons discussions from a GPT proxy API")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// API base URL (overrides the config file and GPT_API)
    #[arg(long, global = true)]
    pub api: Option<String>,

    /// Path to a TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// How snapshots are printed
    #[arg(long, global = true, value_enum, default_value = "live")]
    pub format: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub plain: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Translate text into another language
    Translate {
        /// Text to translate
        text: String,

        /// Target language
        #[arg(long, short, value_enum)]
        lang: Language,
    },
    /// Discuss the pros and cons of a topic
    ProsCons {
        /// Topic or comparison to discuss
        text: String,
    },
    /// Print shell completions to stdout
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Command {
    /// Build the streaming request for this command. `None` for commands
    /// that do not talk to the API.
    pub fn to_request(&self, cancel: CancellationToken) -> Option<StreamRequest> {
        match self {
            Command::Translate { text, lang } => Some(StreamRequest::translate(text.clone(), *lang, cancel)),
            Command::ProsCons { text } => Some(StreamRequest::pros_cons(text.clone(), cancel)),
            Command::Completions { .. } => None,
        }
    }
}
