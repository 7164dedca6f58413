//! Document ingestion payloads.
//!
//! Two flows share these types: extracting one document's text into the
//! conversation, and indexing a batch of files into a retrieval database.

use std::path::Path;

use reqwest::multipart::Part;

use crate::error::ChatError;
use crate::transcript::{Message, Role};

/// A file read into memory, ready for a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl DocumentUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Read `path`; the upload carries only the final path component as its name.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ChatError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        Ok(Self { file_name, bytes })
    }

    pub(crate) fn to_part(&self) -> Part {
        Part::bytes(self.bytes.clone()).file_name(self.file_name.clone())
    }
}

#[derive(Debug, Clone)]
pub struct IndexRequest {
    pub database_name: String,
    pub description: String,
    pub files: Vec<DocumentUpload>,
}

impl IndexRequest {
    pub fn new(database_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            database_name: database_name.into(),
            description: description.into(),
            files: Vec::new(),
        }
    }

    pub fn with_file(mut self, doc: DocumentUpload) -> Self {
        self.files.push(doc);
        self
    }

    pub fn validate(&self) -> Result<(), ChatError> {
        if self.database_name.trim().is_empty() {
            return Err(ChatError::Config("database name is required".to_string()));
        }
        if self.files.is_empty() {
            return Err(ChatError::Config("at least one file is required".to_string()));
        }
        Ok(())
    }
}

/// The two user messages that carry an extracted document into the
/// transcript: its title, then its text.
pub fn document_messages(file_name: &str, extracted_text: &str) -> [Message; 2] {
    [
        Message::new(Role::User, format!("Uploaded file title: {file_name}")),
        Message::new(
            Role::User,
            format!("Document content ({file_name}):\n{extracted_text}"),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_document_messages_shape() {
        let [title, body] = document_messages("cv.pdf", "Skills: Rust");
        assert_eq!(title.role, Role::User);
        assert_eq!(title.content, "Uploaded file title: cv.pdf");
        assert_eq!(body.role, Role::User);
        assert_eq!(body.content, "Document content (cv.pdf):\nSkills: Rust");
    }

    #[tokio::test]
    async fn test_from_path_keeps_file_name_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"hello").unwrap();

        let doc = DocumentUpload::from_path(&path).await.unwrap();
        assert_eq!(doc.file_name, "notes.txt");
        assert_eq!(doc.bytes, b"hello");
    }

    #[tokio::test]
    async fn test_from_path_missing_file_is_io_error() {
        let err = DocumentUpload::from_path("/no/such/file.pdf").await.unwrap_err();
        assert!(matches!(err, ChatError::Io(_)));
    }

    #[test]
    fn test_index_request_validation() {
        assert!(IndexRequest::new("", "d").validate().is_err());
        assert!(IndexRequest::new("db", "d").validate().is_err());
        let ok = IndexRequest::new("db", "d").with_file(DocumentUpload::new("a.pdf", vec![1]));
        assert!(ok.validate().is_ok());
    }
}
