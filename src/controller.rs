//! One user turn, start to finish.
//!
//! The [`ConversationController`] owns a session's [`Transcript`] and is the
//! only thing that mutates it. `submit` takes `&mut self`, so a session can
//! never have two turns in flight at once.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::client::ChatBackend;
use crate::config::{ChatConfig, SessionConfig};
use crate::decoder::decode_stream;
use crate::display::{ChatEvent, DisplaySink};
use crate::error::ChatError;
use crate::instructions::{load_system_prompt, UserProfile};
use crate::protocol::{ContextChunk, ResponseMode};
use crate::transcript::{Role, Transcript};
use crate::upload::{document_messages, DocumentUpload};

/// The assistant's side of a completed turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    /// Shown to the user, never stored in the transcript.
    pub context_chunks: Vec<ContextChunk>,
}

#[derive(Debug)]
pub enum TurnOutcome {
    /// Empty or whitespace-only input; nothing happened.
    Ignored,
    Replied(Reply),
    /// The turn failed and the fallback bot message was shown. The user's
    /// message stays in the transcript; no assistant message was added.
    Failed(ChatError),
}

impl TurnOutcome {
    pub fn is_replied(&self) -> bool {
        matches!(self, TurnOutcome::Replied(_))
    }
}

/// Disables input on creation and re-enables it when dropped, whatever path
/// the turn took out of `submit`.
struct InputGate {
    sink: Arc<dyn DisplaySink>,
}

impl InputGate {
    fn close(sink: &Arc<dyn DisplaySink>) -> Self {
        sink.emit(ChatEvent::InputEnabled { enabled: false });
        Self {
            sink: Arc::clone(sink),
        }
    }
}

impl Drop for InputGate {
    fn drop(&mut self) {
        self.sink.emit(ChatEvent::InputEnabled { enabled: true });
    }
}

pub struct ConversationController {
    id: Uuid,
    transcript: Transcript,
    backend: ChatBackend,
    session: SessionConfig,
    sink: Arc<dyn DisplaySink>,
}

impl ConversationController {
    /// Bootstrap a session: resolve the system prompt (falling back if the
    /// instructions resource is unavailable), fold in the user profile, and
    /// show the welcome message.
    pub async fn start(
        config: ChatConfig,
        sink: Arc<dyn DisplaySink>,
        profile: Option<UserProfile>,
    ) -> Self {
        let backend = ChatBackend::new(config.backend, config.completion);
        let mut prompt = load_system_prompt(&backend, &config.session).await;
        if let Some(profile) = &profile {
            prompt = profile.amend(&prompt);
        }
        let controller = Self::new(backend, config.session, Transcript::initialize(prompt), sink);

        info!(
            session = %controller.id,
            mode = %controller.backend.mode(),
            "session started"
        );
        controller.sink.emit(ChatEvent::BotMessage {
            text: controller.session.welcome_message.clone(),
        });
        if let Some(profile) = &profile {
            controller.sink.emit(ChatEvent::BotMessage {
                text: format!("Thanks, {}. We can start now!", profile.name),
            });
        }
        controller
    }

    /// Assemble a controller around an existing transcript without touching
    /// the network.
    pub fn new(
        backend: ChatBackend,
        session: SessionConfig,
        transcript: Transcript,
        sink: Arc<dyn DisplaySink>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            transcript,
            backend,
            session,
            sink,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    // -----------------------------------------------------------------------
    // Turns
    // -----------------------------------------------------------------------

    /// Run one user turn.
    ///
    /// Appends and renders the user message, disables input, asks the
    /// backend, renders and records the reply, shows any context chunks, then
    /// re-enables input. Failures never escape: they render the configured
    /// error reply and come back as [`TurnOutcome::Failed`].
    pub async fn submit(&mut self, user_text: &str) -> TurnOutcome {
        let text = user_text.trim();
        if text.is_empty() {
            return TurnOutcome::Ignored;
        }

        self.transcript.append(Role::User, text);
        self.sink.emit(ChatEvent::UserMessage {
            text: text.to_string(),
        });
        let _gate = InputGate::close(&self.sink);

        match self.run_turn().await {
            Ok(reply) => {
                info!(
                    session = %self.id,
                    chars = reply.text.len(),
                    context_chunks = reply.context_chunks.len(),
                    "turn completed"
                );
                TurnOutcome::Replied(reply)
            }
            Err(e) => {
                warn!(session = %self.id, error = %e, "turn failed");
                self.sink.emit(ChatEvent::BotMessage {
                    text: self.session.error_reply.clone(),
                });
                TurnOutcome::Failed(e)
            }
        }
    }

    async fn run_turn(&mut self) -> Result<Reply, ChatError> {
        match self.backend.mode() {
            ResponseMode::Json => {
                let completion = self
                    .backend
                    .complete(self.transcript.as_request_payload())
                    .await?;
                self.sink.emit(ChatEvent::BotMessage {
                    text: completion.text.clone(),
                });
                self.transcript.append(Role::Assistant, completion.text.clone());
                if !completion.context_chunks.is_empty() {
                    self.sink.emit(ChatEvent::ContextChunks {
                        chunks: completion.context_chunks.clone(),
                    });
                }
                Ok(Reply {
                    text: completion.text,
                    context_chunks: completion.context_chunks,
                })
            }
            ResponseMode::Stream => {
                let text = self.stream_reply().await?;
                // An empty stream leaves nothing worth recording.
                if !text.is_empty() {
                    self.transcript.append(Role::Assistant, text.clone());
                }
                Ok(Reply {
                    text,
                    context_chunks: Vec::new(),
                })
            }
        }
    }

    /// Stream the reply into the sink delta by delta; returns the full text.
    async fn stream_reply(&self) -> Result<String, ChatError> {
        let response = self
            .backend
            .send_completion(self.transcript.as_request_payload(), ResponseMode::Stream)
            .await?;

        self.sink.emit(ChatEvent::BotStreamStarted);
        let sink = &self.sink;
        let result = decode_stream(response.bytes_stream(), |delta| {
            sink.emit(ChatEvent::BotDelta {
                text: delta.to_string(),
            })
        })
        .await;
        self.sink.emit(ChatEvent::BotStreamFinished);
        result
    }

    // -----------------------------------------------------------------------
    // Documents
    // -----------------------------------------------------------------------

    /// Extract a document's text and add it to the conversation as two user
    /// messages. On failure a notice is shown and the transcript is untouched.
    pub async fn attach_document(&mut self, doc: &DocumentUpload) -> Result<(), ChatError> {
        self.sink.emit(ChatEvent::BotMessage {
            text: format!("You uploaded the file: {}", doc.file_name),
        });

        match self.backend.extract_document(doc).await {
            Ok(text) => {
                for message in document_messages(&doc.file_name, &text) {
                    self.transcript.append(message.role, message.content);
                }
                info!(session = %self.id, file = %doc.file_name, chars = text.len(), "document attached");
                self.sink.emit(ChatEvent::BotMessage {
                    text: format!(
                        "The content of the file \"{}\" was loaded successfully.",
                        doc.file_name
                    ),
                });
                Ok(())
            }
            Err(e) => {
                warn!(session = %self.id, file = %doc.file_name, error = %e, "document upload failed");
                let notice = match &e {
                    ChatError::EmptyDocument(_) => {
                        "Error: the document contains no extractable text.".to_string()
                    }
                    _ => "Error while uploading the file.".to_string(),
                };
                self.sink.emit(ChatEvent::BotMessage { text: notice });
                Err(e)
            }
        }
    }
}
