use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::Chunk;
use crate::search::vector::VectorIndex;

/// One immutable, fully built corpus. Queries hold an `Arc` to it for their
/// whole duration, so a concurrent re-ingest never changes what they see.
#[derive(Debug)]
pub struct CorpusSnapshot {
    pub id: Uuid,
    pub built_at: DateTime<Utc>,
    pub document_count: usize,
    pub chunks: Vec<Chunk>,
    pub index: VectorIndex,
}

impl CorpusSnapshot {
    pub fn new(chunks: Vec<Chunk>, index: VectorIndex, document_count: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            built_at: Utc::now(),
            document_count,
            chunks,
            index,
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Resolve a global chunk id.
    pub fn chunk(&self, chunk_id: usize) -> Option<&Chunk> {
        self.chunks.get(chunk_id)
    }
}

/// Holder of the live snapshot. `None` until the first ingestion succeeds.
#[derive(Debug, Default)]
pub struct CorpusStore {
    current: RwLock<Option<Arc<CorpusSnapshot>>>,
}

impl CorpusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Option<Arc<CorpusSnapshot>> {
        self.current.read().clone()
    }

    /// Swap in a new snapshot, returning the one it replaced.
    pub fn replace(&self, snapshot: CorpusSnapshot) -> Option<Arc<CorpusSnapshot>> {
        self.current.write().replace(Arc::new(snapshot))
    }

    pub fn is_ready(&self) -> bool {
        self.current.read().is_some()
    }
}
