//! Chat client for a retrieval-augmented counselor bot.
//!
//! A [`ConversationController`] owns one session's [`Transcript`], sends it to
//! a chat-completions endpoint, and renders the reply into a [`DisplaySink`],
//! either as one JSON body or live from a server-sent event stream decoded by
//! [`decoder::StreamDecoder`].

pub mod cli;
pub mod client;
pub mod config;
pub mod controller;
pub mod decoder;
pub mod display;
pub mod error;
pub mod instructions;
pub mod protocol;
pub mod transcript;
pub mod upload;

pub use client::ChatBackend;
pub use config::ChatConfig;
pub use controller::{ConversationController, Reply, TurnOutcome};
pub use decoder::{decode_stream, StreamDecoder, StreamFrame};
pub use display::{ChatEvent, DisplaySink, TerminalSink};
pub use error::ChatError;
pub use protocol::{ContextChunk, ResponseMode};
pub use transcript::{Message, Role, Transcript};
