//! TOML configuration.
//!
//! Every field has a default, so an empty file (or no file) yields a working
//! config aimed at a backend on `localhost:8000`.
//!
//! ```toml
//! [backend]
//! chat_endpoint = "http://localhost:8000/v1/chat/completions"
//! instructions_url = "http://localhost:8000/static/instructions.txt"
//!
//! [completion]
//! temperature = 0.7
//! mode = "stream"
//! model = "hugging-quants/llama-3.2-3b-instruct"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ChatError;
use crate::protocol::ResponseMode;

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const FALLBACK_SYSTEM_PROMPT: &str =
    "Failed to load the instructions. Using the default fallback.";
pub const DEFAULT_WELCOME: &str =
    "Welcome! I'm here to help you find your way through your school and career path.";
pub const DEFAULT_ERROR_REPLY: &str =
    "Sorry, something went wrong while talking to the model. Please check the server.";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub backend: BackendConfig,
    pub completion: CompletionConfig,
    pub session: SessionConfig,
}

/// Where the backends live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub chat_endpoint: String,
    /// Single-document text extraction.
    pub extract_endpoint: String,
    /// Multi-file retrieval indexing.
    pub index_endpoint: String,
    /// Plain-text resource seeding the system prompt. Takes precedence over
    /// `session.system_prompt` when set.
    pub instructions_url: Option<String>,
    pub connect_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            chat_endpoint: "http://localhost:8000/v1/chat/completions".to_string(),
            extract_endpoint: "http://localhost:8000/upload-and-process".to_string(),
            index_endpoint: "http://localhost:8000/upload-files/".to_string(),
            instructions_url: None,
            connect_timeout_secs: 10,
        }
    }
}

impl BackendConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub temperature: f32,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub mode: ResponseMode,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            model: None,
            max_tokens: None,
            mode: ResponseMode::Json,
        }
    }
}

/// Session bootstrap and the fixed bot-side strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub system_prompt: Option<String>,
    pub fallback_system_prompt: String,
    pub welcome_message: String,
    /// Shown in place of a reply when a turn fails.
    pub error_reply: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            system_prompt: None,
            fallback_system_prompt: FALLBACK_SYSTEM_PROMPT.to_string(),
            welcome_message: DEFAULT_WELCOME.to_string(),
            error_reply: DEFAULT_ERROR_REPLY.to_string(),
        }
    }
}

impl ChatConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ChatError> {
        let config: ChatConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ChatError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ChatError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ChatError> {
        if !(0.0..=2.0).contains(&self.completion.temperature) {
            return Err(ChatError::Config(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.completion.temperature
            )));
        }
        if self.backend.chat_endpoint.trim().is_empty() {
            return Err(ChatError::Config("chat_endpoint is empty".to_string()));
        }
        Ok(())
    }
}
