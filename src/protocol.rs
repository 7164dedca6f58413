use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ChatError;
use crate::transcript::Message;

/// How the completions endpoint should answer: one JSON body or an SSE stream.
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    #[default]
    Json,
    Stream,
}

impl ResponseMode {
    /// Value for the request's `Accept` header.
    pub fn accept_header(&self) -> &'static str {
        match self {
            ResponseMode::Json => "application/json",
            ResponseMode::Stream => "text/event-stream",
        }
    }
}

impl std::fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseMode::Json => write!(f, "json"),
            ResponseMode::Stream => write!(f, "stream"),
        }
    }
}

// -- Completion request -----------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub messages: &'a [Message],
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
}

// -- Non-streaming response -------------------------------------------------

/// Page reference on a retrieved chunk. The retrieval backend sends a number
/// when it knows the page and a label such as `"n/a"` when it does not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageNumber {
    Number(u64),
    Label(String),
}

impl std::fmt::Display for PageNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageNumber::Number(n) => write!(f, "{n}"),
            PageNumber::Label(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSource {
    pub filename: String,
    pub page_number: PageNumber,
}

/// A retrieval snippet returned alongside a completion. Shown to the user,
/// never stored in the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextChunk {
    pub content: String,
    pub source: ChunkSource,
}

impl ContextChunk {
    /// One-line label for the chunk at zero-based `index`.
    pub fn summary(&self, index: usize) -> String {
        format!(
            "Chunk {} (source: {}, page: {})",
            index + 1,
            self.source.filename,
            self.source.page_number
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseChoice {
    pub message: ResponseMessage,
}

/// Either dialect the completions endpoint may answer with: the RAG backend's
/// `llm_response` + `context_chunks`, or an OpenAI-style `choices` list.
#[derive(Debug, Deserialize)]
pub struct CompletionBody {
    #[serde(default)]
    pub llm_response: Option<String>,
    #[serde(default)]
    pub context_chunks: Option<Vec<ContextChunk>>,
    #[serde(default)]
    pub choices: Option<Vec<ResponseChoice>>,
}

/// A finished non-streaming reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub context_chunks: Vec<ContextChunk>,
}

impl CompletionBody {
    /// Pick the reply text, preferring `llm_response` over `choices[0]`.
    pub fn into_completion(self) -> Result<Completion, ChatError> {
        let text = match self.llm_response {
            Some(text) => text,
            None => self
                .choices
                .and_then(|choices| choices.into_iter().next())
                .and_then(|choice| choice.message.content)
                .ok_or_else(|| {
                    ChatError::MalformedBody(
                        "neither llm_response nor choices[0].message.content present".to_string(),
                    )
                })?,
        };
        Ok(Completion {
            text,
            context_chunks: self.context_chunks.unwrap_or_default(),
        })
    }
}

// -- Streaming chunk --------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct StreamDelta {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StreamChoice {
    pub delta: StreamDelta,
    #[allow(dead_code)]
    pub finish_reason: Option<String>,
}

/// Payload of one `data: {...}` frame.
#[derive(Debug, Deserialize)]
pub struct StreamChunk {
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
}

impl StreamChunk {
    /// `choices[0].delta.content`, if present and non-empty.
    pub fn into_delta(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.delta.content)
            .filter(|s| !s.is_empty())
    }
}

// -- Upload replies ---------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractReply {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub extracted_text: Option<String>,
}

/// Result of indexing a batch of documents into a named retrieval database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexReport {
    pub message: String,
    pub documents: u64,
}

#[derive(Debug, Deserialize)]
pub struct ErrorReply {
    pub detail: Option<String>,
}
