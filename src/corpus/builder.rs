use std::sync::Arc;

use crate::chunking::ChunkingConfig;
use crate::corpus::store::CorpusSnapshot;
use crate::error::{Error, Result};
use crate::llm::embeddings::Embedder;
use crate::models::{Chunk, ChunkMetadata, Document};
use crate::search::vector::VectorIndex;

/// Chunks, metadata and vectors of one ingestion run, index-aligned.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub chunks: Vec<Chunk>,
    pub metadatas: Vec<ChunkMetadata>,
    pub vectors: Vec<Vec<f32>>,
    pub document_count: usize,
}

impl Corpus {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Index the vectors and freeze everything into a searchable snapshot.
    pub fn into_snapshot(self) -> Result<CorpusSnapshot> {
        let mut index = VectorIndex::new();
        index.add(self.vectors, self.metadatas)?;
        Ok(CorpusSnapshot::new(self.chunks, index, self.document_count))
    }
}

/// Materializes a [`Corpus`] from raw documents: chunk, then embed in batches.
pub struct CorpusBuilder {
    chunking: ChunkingConfig,
    batch_size: usize,
    embedder: Arc<dyn Embedder>,
}

impl CorpusBuilder {
    pub fn new(
        chunking: ChunkingConfig,
        batch_size: usize,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        chunking.validate()?;
        if batch_size == 0 {
            return Err(Error::Configuration(
                "embedding batch size must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            chunking,
            batch_size,
            embedder,
        })
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Chunk `documents` in input order and embed every chunk.
    ///
    /// Documents whose text is empty after trimming are skipped and not counted.
    pub async fn build(&self, documents: &[Document]) -> Result<Corpus> {
        let mut corpus = Corpus::default();

        for doc in documents {
            if doc.text.trim().is_empty() {
                tracing::debug!("Skipping empty document {}", doc.id);
                continue;
            }
            let pieces = self.chunking.chunk(&doc.text)?;
            for (chunk_index, text) in pieces.into_iter().enumerate() {
                let chunk = Chunk {
                    chunk_id: corpus.chunks.len(),
                    page_id: doc.id.clone(),
                    title: doc.title.clone(),
                    chunk_index,
                    text,
                };
                corpus.metadatas.push(ChunkMetadata::from(&chunk));
                corpus.chunks.push(chunk);
            }
            corpus.document_count += 1;
        }

        tracing::info!(
            "Chunked {} documents into {} chunks",
            corpus.document_count,
            corpus.chunks.len()
        );

        corpus.vectors.reserve(corpus.chunks.len());
        let batches = corpus.chunks.len().div_ceil(self.batch_size);
        for (i, batch) in corpus.chunks.chunks(self.batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embedder.embed(&texts).await.map_err(Error::upstream)?;
            if vectors.len() != texts.len() {
                return Err(Error::Upstream(format!(
                    "{} returned {} vectors for {} chunks",
                    self.embedder.name(),
                    vectors.len(),
                    texts.len()
                )));
            }
            tracing::debug!("Embedded batch {}/{}", i + 1, batches);
            corpus.vectors.extend(vectors);
        }

        Ok(corpus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Records the size of every batch it is asked to embed.
    struct RecordingEmbedder {
        batches: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl Embedder for RecordingEmbedder {
        async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            self.batches.lock().push(texts.len());
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }

        fn name(&self) -> String {
            "recording".to_string()
        }
    }

    struct ShortEmbedder;

    #[async_trait]
    impl Embedder for ShortEmbedder {
        async fn embed(&self, _texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(vec![vec![1.0]])
        }

        fn name(&self) -> String {
            "short".to_string()
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            anyhow::bail!("connection refused")
        }

        fn name(&self) -> String {
            "failing".to_string()
        }
    }

    fn recording() -> Arc<RecordingEmbedder> {
        Arc::new(RecordingEmbedder {
            batches: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn test_build_assigns_global_and_local_positions() {
        let embedder = recording();
        let chunking = ChunkingConfig::new(10, 2).unwrap();
        let builder = CorpusBuilder::new(chunking, 16, embedder).unwrap();
        let docs = vec![
            Document::new("a", "A", "0123456789abcdefgh"),
            Document::new("b", "B", "short"),
        ];
        let corpus = builder.build(&docs).await.unwrap();

        assert_eq!(corpus.document_count, 2);
        assert_eq!(corpus.len(), 3);
        assert_eq!(corpus.vectors.len(), 3);
        let positions: Vec<(usize, &str, usize)> = corpus
            .metadatas
            .iter()
            .map(|m| (m.chunk_id, m.page_id.as_str(), m.chunk_index))
            .collect();
        assert_eq!(positions, vec![(0, "a", 0), (1, "a", 1), (2, "b", 0)]);
        assert_eq!(corpus.chunks[2].text, "short");
    }

    #[tokio::test]
    async fn test_build_skips_blank_documents() {
        let builder = CorpusBuilder::new(ChunkingConfig::default(), 16, recording()).unwrap();
        let docs = vec![
            Document::new("a", "A", "   \n\t "),
            Document::new("b", "B", "Vault Access"),
        ];
        let corpus = builder.build(&docs).await.unwrap();
        assert_eq!(corpus.document_count, 1);
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.chunks[0].page_id, "b");
        assert_eq!(corpus.chunks[0].chunk_id, 0);
    }

    #[tokio::test]
    async fn test_build_embeds_in_batches() {
        let embedder = recording();
        let builder =
            CorpusBuilder::new(ChunkingConfig::default(), 16, embedder.clone()).unwrap();
        let docs: Vec<Document> = (0..40)
            .map(|i| Document::new(format!("d{i}"), "T", format!("document number {i}")))
            .collect();
        let corpus = builder.build(&docs).await.unwrap();

        assert_eq!(corpus.len(), 40);
        assert_eq!(*embedder.batches.lock(), vec![16, 16, 8]);
    }

    #[tokio::test]
    async fn test_build_without_chunks_skips_embedder() {
        let embedder = recording();
        let builder =
            CorpusBuilder::new(ChunkingConfig::default(), 16, embedder.clone()).unwrap();
        let corpus = builder.build(&[]).await.unwrap();
        assert!(corpus.is_empty());
        assert!(embedder.batches.lock().is_empty());
    }

    #[tokio::test]
    async fn test_build_rejects_short_vector_count() {
        let builder =
            CorpusBuilder::new(ChunkingConfig::default(), 16, Arc::new(ShortEmbedder)).unwrap();
        let docs = vec![Document::new("a", "A", "one"), Document::new("b", "B", "two")];
        let err = builder.build(&docs).await.unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
    }

    #[tokio::test]
    async fn test_build_maps_embedder_failure_to_upstream() {
        let builder =
            CorpusBuilder::new(ChunkingConfig::default(), 16, Arc::new(FailingEmbedder)).unwrap();
        let err = builder
            .build(&[Document::new("a", "A", "text")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Upstream(msg) if msg.contains("connection refused")));
    }

    #[tokio::test]
    async fn test_into_snapshot_indexes_every_chunk() {
        let builder = CorpusBuilder::new(ChunkingConfig::default(), 16, recording()).unwrap();
        let docs = vec![Document::new("a", "A", "alpha"), Document::new("b", "B", "beta")];
        let snapshot = builder.build(&docs).await.unwrap().into_snapshot().unwrap();
        assert_eq!(snapshot.chunk_count(), 2);
        assert_eq!(snapshot.index.size(), 2);
        assert_eq!(snapshot.index.dim(), Some(2));
        assert_eq!(snapshot.document_count, 2);
    }

    #[test]
    fn test_new_rejects_zero_batch() {
        assert!(CorpusBuilder::new(ChunkingConfig::default(), 0, recording()).is_err());
    }
}
