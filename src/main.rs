use std::sync::Arc;

use clap::Parser;
use colored::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use counselor_chat::cli::{Args, Command};
use counselor_chat::client::ChatBackend;
use counselor_chat::config::ChatConfig;
use counselor_chat::controller::{ConversationController, TurnOutcome};
use counselor_chat::display::TerminalSink;
use counselor_chat::instructions::UserProfile;
use counselor_chat::upload::{DocumentUpload, IndexRequest};

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "counselor_chat=debug" } else { "counselor_chat=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run_index(
    config: ChatConfig,
    database: String,
    description: String,
    files: Vec<std::path::PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut request = IndexRequest::new(database, description);
    for path in &files {
        request = request.with_file(DocumentUpload::from_path(path).await?);
    }
    request.validate()?;

    eprintln!("{}", "Creating the database...".bright_black());
    let backend = ChatBackend::new(config.backend, config.completion);
    let report = backend.index_documents(&request).await?;
    println!("{} {}", "Success:".bright_green().bold(), report.message);
    println!("{} {}", "Indexed documents:".bright_green(), report.documents);
    Ok(())
}

async fn run_chat(args: &Args, config: ChatConfig) -> Result<(), Box<dyn std::error::Error>> {
    let profile = match (&args.name, &args.age, &args.role) {
        (Some(name), Some(age), Some(role)) => Some(UserProfile::new(name, age, role)?),
        _ => None,
    };

    let sink = Arc::new(TerminalSink::new(false));
    let mut controller = ConversationController::start(config, sink, profile).await;

    for path in &args.attachments {
        match DocumentUpload::from_path(path).await {
            // failures are already shown to the user by the controller
            Ok(doc) => {
                let _ = controller.attach_document(&doc).await;
            }
            Err(e) => eprintln!("{} {}: {}", "error:".bright_red(), path.display(), e),
        }
    }

    eprintln!("{}", "Type a message and press Enter. /quit exits.".bright_black());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim() == "/quit" {
            break;
        }
        if let TurnOutcome::Failed(e) = controller.submit(&line).await {
            eprintln!("{} {}", "error:".bright_red(), e);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = match &args.config {
        Some(path) => ChatConfig::load(path)?,
        None => ChatConfig::default(),
    };
    args.apply_to(&mut config);
    config.validate()?;

    match &args.command {
        Some(Command::Index {
            database,
            description,
            files,
        }) => run_index(config, database.clone(), description.clone(), files.clone()).await,
        None => run_chat(&args, config).await,
    }
}
