use tracing::{info, warn};

use crate::client::ChatBackend;
use crate::config::SessionConfig;
use crate::error::ChatError;

/// Who is talking to the bot, folded into the system prompt at session start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub name: String,
    pub age: String,
    pub role: String,
}

impl UserProfile {
    /// All three fields are required; surrounding whitespace is dropped.
    pub fn new(name: &str, age: &str, role: &str) -> Result<Self, ChatError> {
        let (name, age, role) = (name.trim(), age.trim(), role.trim());
        if name.is_empty() || age.is_empty() || role.is_empty() {
            return Err(ChatError::InvalidProfile(
                "name, age and role must all be filled in".to_string(),
            ));
        }
        Ok(Self {
            name: name.to_string(),
            age: age.to_string(),
            role: role.to_string(),
        })
    }

    pub fn amend(&self, system_prompt: &str) -> String {
        format!(
            "{system_prompt}\nUser information: Name: {}, Age: {}, Role: {}",
            self.name, self.age, self.role
        )
    }
}

/// Resolve the session's system prompt.
///
/// Order: the instructions resource if configured, else the literal
/// `system_prompt`, else the fallback. A failed fetch (transport error or
/// non-2xx) degrades to the fallback rather than failing the session.
pub async fn load_system_prompt(backend: &ChatBackend, session: &SessionConfig) -> String {
    match backend.backend_config().instructions_url.as_deref() {
        Some(url) => match backend.fetch_text(url).await {
            Ok(text) => {
                info!(url = %url, bytes = text.len(), "loaded instructions");
                text
            }
            Err(e) => {
                warn!(error = %e, url = %url, "instructions unavailable, using fallback prompt");
                session.fallback_system_prompt.clone()
            }
        },
        None => session
            .system_prompt
            .clone()
            .unwrap_or_else(|| session.fallback_system_prompt.clone()),
    }
}
