use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::ChatConfig;
use crate::protocol::ResponseMode;

#[derive(Parser)]
#[command(name = "counselor-chat")]
#[command(version)]
#[command(about = "Terminal client for a retrieval-augmented counselor chat backend")]
pub struct Args {
    /// TOML config file (defaults apply for anything it leaves out)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Chat completions endpoint URL
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Stream replies token by token (text/event-stream)
    #[arg(long)]
    pub stream: bool,

    /// Model name sent with each request
    #[arg(long)]
    pub model: Option<String>,

    /// Sampling temperature
    #[arg(long)]
    pub temperature: Option<f32>,

    /// URL of the plain-text instructions used as the system prompt
    #[arg(long)]
    pub instructions_url: Option<String>,

    /// Your name (requires --age and --role)
    #[arg(long, requires_all = ["age", "role"])]
    pub name: Option<String>,

    /// Your age
    #[arg(long, requires_all = ["name", "role"])]
    pub age: Option<String>,

    /// Your role, e.g. student, parent, teacher
    #[arg(long, requires_all = ["name", "age"])]
    pub role: Option<String>,

    /// Document to extract and add to the conversation before the first turn
    #[arg(long = "attach", value_name = "FILE")]
    pub attachments: Vec<PathBuf>,

    /// Log at debug level (RUST_LOG overrides)
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Index files into a named retrieval database and exit
    Index {
        /// Name of the database to create
        #[arg(long)]
        database: String,

        /// Free-form description stored with the database
        #[arg(long, default_value = "")]
        description: String,

        /// Files to index
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

impl Args {
    /// Apply command-line overrides on top of a loaded config.
    pub fn apply_to(&self, config: &mut ChatConfig) {
        if let Some(endpoint) = &self.endpoint {
            config.backend.chat_endpoint = endpoint.clone();
        }
        if self.stream {
            config.completion.mode = ResponseMode::Stream;
        }
        if let Some(model) = &self.model {
            config.completion.model = Some(model.clone());
        }
        if let Some(t) = self.temperature {
            config.completion.temperature = t;
        }
        if let Some(url) = &self.instructions_url {
            config.backend.instructions_url = Some(url.clone());
        }
    }
}
