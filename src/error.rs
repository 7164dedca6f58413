//! Crate-level error type.

use thiserror::Error;

/// Everything that can go wrong between the chat client and its backends.
///
/// Transport, status and body errors abort a single turn; the controller
/// catches them and degrades to a fallback bot message. Per-frame decode
/// failures never surface here, the stream decoder skips them.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Connection, TLS, timeout or mid-body read failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend replied with a non-2xx status code.
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// Upload endpoint refused the request and explained why.
    #[error("upload rejected (HTTP {status}): {detail}")]
    Rejected { status: u16, detail: String },

    /// Body was not the JSON shape we expected.
    #[error("malformed response body: {0}")]
    MalformedBody(String),

    /// Extraction succeeded but produced no usable text.
    #[error("document '{0}' contains no extractable text")]
    EmptyDocument(String),

    #[error("invalid user profile: {0}")]
    InvalidProfile(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChatError {
    /// True for the failures that abort a turn before or during the HTTP
    /// exchange (transport, status, body).
    pub fn is_turn_failure(&self) -> bool {
        matches!(
            self,
            ChatError::Transport(_) | ChatError::Http { .. } | ChatError::MalformedBody(_)
        )
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(e: serde_json::Error) -> Self {
        ChatError::MalformedBody(e.to_string())
    }
}

impl From<toml::de::Error> for ChatError {
    fn from(e: toml::de::Error) -> Self {
        ChatError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_display() {
        let e = ChatError::Http {
            status: 404,
            url: "http://localhost/x".to_string(),
        };
        assert_eq!(e.to_string(), "HTTP 404 from http://localhost/x");
    }

    #[test]
    fn test_rejected_display_carries_detail() {
        let e = ChatError::Rejected {
            status: 500,
            detail: "database exists".to_string(),
        };
        assert!(e.to_string().contains("database exists"));
        assert!(e.to_string().contains("500"));
    }

    #[test]
    fn test_json_error_maps_to_malformed_body() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let e: ChatError = err.into();
        assert!(matches!(e, ChatError::MalformedBody(_)));
        assert!(e.is_turn_failure());
    }

    #[test]
    fn test_config_error_is_not_turn_failure() {
        assert!(!ChatError::Config("bad".into()).is_turn_failure());
        assert!(!ChatError::EmptyDocument("a.pdf".into()).is_turn_failure());
    }

    #[test]
    fn test_io_error_converts() {
        let e: ChatError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(e, ChatError::Io(_)));
    }
}
