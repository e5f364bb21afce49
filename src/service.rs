//! The question-answering service: ingestion into the corpus store, and
//! retrieval followed by generation at query time.

use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};

use crate::config::Config;
use crate::corpus::{CorpusBuilder, CorpusStore};
use crate::error::{Error, Result};
use crate::ingest::DocumentSource;
use crate::llm::embeddings::Embedder;
use crate::llm::generate::Generator;
use crate::models::{Answer, Document, IngestSummary, StatusResponse};
use crate::search::{Retrieval, Retriever};

/// Returned when no chunk is relevant to the question.
pub const OUT_OF_SCOPE_ANSWER: &str = "I can only answer onboarding and team-related questions.";

/// Longest question accepted, in characters. Longer input is truncated.
const MAX_QUESTION_CHARS: usize = 2_000;

pub struct RagService {
    store: CorpusStore,
    builder: CorpusBuilder,
    retriever: Retriever,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    /// Serializes ingestion runs.
    ingest_lock: Mutex<()>,
    /// Bounds concurrent generation calls.
    ask_semaphore: Arc<Semaphore>,
}

impl RagService {
    pub fn new(
        config: &Config,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Result<Self> {
        config.validate()?;
        let builder = CorpusBuilder::new(
            config.chunking(),
            config.embed_batch_size,
            Arc::clone(&embedder),
        )?;
        Ok(Self {
            store: CorpusStore::new(),
            builder,
            retriever: Retriever::new(config.top_k, config.relevance_threshold),
            embedder,
            generator,
            ingest_lock: Mutex::new(()),
            ask_semaphore: Arc::new(Semaphore::new(config.max_concurrent_asks)),
        })
    }

    /// Rebuild the corpus from `documents` and swap it in.
    ///
    /// On failure the previous snapshot stays live.
    pub async fn ingest(&self, documents: Vec<Document>) -> Result<IngestSummary> {
        let _guard = self.ingest_lock.lock().await;
        self.rebuild(&documents).await
    }

    /// Fetch documents from `source`, then rebuild. The fetch happens under the
    /// ingestion lock so two runs never overlap.
    pub async fn ingest_from(&self, source: &dyn DocumentSource) -> Result<IngestSummary> {
        let _guard = self.ingest_lock.lock().await;
        tracing::info!("Ingesting from {}", source.describe());
        let documents = source.fetch().await.map_err(Error::source)?;
        self.rebuild(&documents).await
    }

    async fn rebuild(&self, documents: &[Document]) -> Result<IngestSummary> {
        let corpus = self.builder.build(documents).await?;
        let snapshot = corpus.into_snapshot()?;
        let summary = IngestSummary {
            corpus_id: snapshot.id,
            chunk_count: snapshot.chunk_count(),
            document_count: snapshot.document_count,
        };
        self.store.replace(snapshot);
        tracing::info!(
            "Corpus {} ready: {} documents, {} chunks",
            summary.corpus_id,
            summary.document_count,
            summary.chunk_count
        );
        Ok(summary)
    }

    /// Answer `question` from the current corpus, or return the out-of-scope
    /// sentinel when nothing relevant is found.
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        let question = truncate_to_char_boundary(question.trim(), MAX_QUESTION_CHARS);
        if question.is_empty() {
            return Err(Error::InvalidRequest("Question is required".to_string()));
        }

        let snapshot = self.store.snapshot().ok_or(Error::NotReady)?;
        let retrieval = self
            .retriever
            .retrieve(question, &snapshot, self.embedder.as_ref())
            .await?;
        tracing::info!(
            "Retrieved {} chunks via {} tier",
            retrieval.chunks().len(),
            retrieval.tier()
        );

        if let Retrieval::Empty = retrieval {
            return Ok(Answer {
                answer: OUT_OF_SCOPE_ANSWER.to_string(),
            });
        }
        let context = retrieval.into_texts();

        let _permit = self
            .ask_semaphore
            .acquire()
            .await
            .map_err(|_| Error::Upstream("Answer service is shutting down".to_string()))?;

        let answer = self
            .generator
            .generate(question, &context)
            .await
            .map_err(Error::upstream)?;
        Ok(Answer { answer })
    }

    pub fn status(&self) -> StatusResponse {
        match self.store.snapshot() {
            Some(snapshot) => StatusResponse {
                ready: true,
                chunk_count: snapshot.chunk_count(),
                document_count: snapshot.document_count,
                corpus_id: Some(snapshot.id),
                built_at: Some(snapshot.built_at),
            },
            None => StatusResponse {
                ready: false,
                chunk_count: 0,
                document_count: 0,
                corpus_id: None,
                built_at: None,
            },
        }
    }

    pub fn embedder_name(&self) -> String {
        self.embedder.name()
    }

    pub fn generator_name(&self) -> String {
        self.generator.name()
    }
}

fn truncate_to_char_boundary(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
