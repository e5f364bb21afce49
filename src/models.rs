use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A source document in plain text, as produced by a document source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub text: String,
}

impl Document {
    pub fn new(id: impl Into<String>, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            text: text.into(),
        }
    }
}

/// A single indexed text chunk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Offset in the corpus-wide chunk sequence.
    pub chunk_id: usize,
    pub page_id: String,
    pub title: String,
    /// Position within the parent document's own chunk list.
    pub chunk_index: usize,
    pub text: String,
}

impl AsRef<str> for Chunk {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// Metadata stored next to each vector in the index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    pub page_id: String,
    pub title: String,
    pub chunk_index: usize,
    /// Handle back into the corpus chunk sequence. Vector hits are resolved
    /// through this field, never through `chunk_index`.
    pub chunk_id: usize,
}

impl From<&Chunk> for ChunkMetadata {
    fn from(chunk: &Chunk) -> Self {
        Self {
            page_id: chunk.page_id.clone(),
            title: chunk.title.clone(),
            chunk_index: chunk.chunk_index,
            chunk_id: chunk.chunk_id,
        }
    }
}

/// Outcome of a successful ingestion run.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IngestSummary {
    pub corpus_id: Uuid,
    pub chunk_count: usize,
    pub document_count: usize,
}

/// Answer to a question: generated text or the out-of-scope sentinel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    pub answer: String,
}

/// Ask request
#[derive(Debug, Clone, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

/// Ingest request. Without a space key the configured PDF directory is used.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngestRequest {
    #[serde(default)]
    pub space_key: Option<String>,
}

/// Ingest response
#[derive(Debug, Clone, Serialize)]
pub struct IngestResponse {
    pub status: String,
    pub chunks: usize,
    pub documents: usize,
    pub corpus_id: Uuid,
}

/// Status response
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub ready: bool,
    pub chunk_count: usize,
    pub document_count: usize,
    pub corpus_id: Option<Uuid>,
    pub built_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_request_space_key_optional() {
        let req: IngestRequest = serde_json::from_str("{}").unwrap();
        assert!(req.space_key.is_none());

        let req: IngestRequest = serde_json::from_str(r#"{"space_key":"ENG"}"#).unwrap();
        assert_eq!(req.space_key.as_deref(), Some("ENG"));
    }

    #[test]
    fn test_metadata_from_chunk_keeps_both_positions() {
        let chunk = Chunk {
            chunk_id: 7,
            page_id: "p1".into(),
            title: "Onboarding".into(),
            chunk_index: 2,
            text: "hello".into(),
        };
        let meta = ChunkMetadata::from(&chunk);
        assert_eq!(meta.chunk_id, 7);
        assert_eq!(meta.chunk_index, 2);
    }
}
