use std::io::{self, Write};

use colored::*;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::protocol::ContextChunk;

// ---------------------------------------------------------------------------
// Display events
// ---------------------------------------------------------------------------

/// Everything the controller asks a front end to show.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    UserMessage { text: String },
    /// A complete bot message (non-streamed reply, welcome, error notice).
    BotMessage { text: String },
    /// A streamed reply is starting; deltas follow.
    BotStreamStarted,
    BotDelta { text: String },
    BotStreamFinished,
    /// Retrieval snippets for the reply just shown. Never empty.
    ContextChunks { chunks: Vec<ContextChunk> },
    InputEnabled { enabled: bool },
}

/// Render target for [`ChatEvent`]s.
pub trait DisplaySink: Send + Sync {
    fn emit(&self, event: ChatEvent);
}

/// Forward events over a channel, e.g. to a web front end or a test.
impl DisplaySink for mpsc::UnboundedSender<ChatEvent> {
    fn emit(&self, event: ChatEvent) {
        // Receiver gone means nobody is watching; nothing to do.
        let _ = self.send(event);
    }
}

// ---------------------------------------------------------------------------
// Terminal rendering
// ---------------------------------------------------------------------------

/// Prints the conversation to stdout with colors.
#[derive(Debug, Clone, Default)]
pub struct TerminalSink {
    /// Echo user messages back (off when the user just typed them).
    pub echo_user: bool,
}

impl TerminalSink {
    pub fn new(echo_user: bool) -> Self {
        Self { echo_user }
    }
}

impl DisplaySink for TerminalSink {
    fn emit(&self, event: ChatEvent) {
        let mut out = io::stdout().lock();
        // stdout write failures are not recoverable from here
        let _ = match event {
            ChatEvent::UserMessage { text } if self.echo_user => {
                writeln!(out, "{} {}", "you:".bright_blue().bold(), text)
            }
            ChatEvent::UserMessage { .. } => Ok(()),
            ChatEvent::BotMessage { text } => {
                writeln!(out, "{} {}", "bot:".bright_green().bold(), text)
            }
            ChatEvent::BotStreamStarted => write!(out, "{} ", "bot:".bright_green().bold()),
            ChatEvent::BotDelta { text } => write!(out, "{}", text),
            ChatEvent::BotStreamFinished => writeln!(out),
            ChatEvent::ContextChunks { chunks } => write_context_chunks(&mut out, &chunks),
            ChatEvent::InputEnabled { .. } => Ok(()),
        };
        let _ = out.flush();
    }
}

fn write_context_chunks(out: &mut impl Write, chunks: &[ContextChunk]) -> io::Result<()> {
    writeln!(out, "{}", "Retrieved context:".bright_yellow().bold())?;
    for (i, chunk) in chunks.iter().enumerate() {
        writeln!(out, "  {}", chunk.summary(i).yellow())?;
        for line in chunk.content.trim().lines() {
            writeln!(out, "    {}", line.dimmed())?;
        }
    }
    Ok(())
}
