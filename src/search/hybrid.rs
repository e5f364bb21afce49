//! Two-tier retrieval: lexical overlap first, vector similarity as fallback.

use crate::corpus::CorpusSnapshot;
use crate::error::{Error, Result};
use crate::llm::embeddings::{embed_single, Embedder};
use crate::models::Chunk;
use crate::search::lexical::{rerank_scored, QueryTerms};

/// A chunk selected as answer context, with the scores that selected it.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextChunk {
    pub chunk: Chunk,
    pub lexical_score: usize,
    /// Cosine similarity, present only when the vector tier found the chunk.
    pub vector_score: Option<f32>,
}

impl AsRef<str> for ContextChunk {
    fn as_ref(&self) -> &str {
        &self.chunk.text
    }
}

/// Which tier produced the context, and the context itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    /// Some chunk shares a term with the question. No embedding was computed.
    Lexical(Vec<ContextChunk>),
    /// No lexical overlap; chunks came from nearest-neighbour search.
    Vector(Vec<ContextChunk>),
    /// Nothing relevant.
    Empty,
}

impl Retrieval {
    pub fn tier(&self) -> &'static str {
        match self {
            Retrieval::Lexical(_) => "lexical",
            Retrieval::Vector(_) => "vector",
            Retrieval::Empty => "empty",
        }
    }

    pub fn chunks(&self) -> &[ContextChunk] {
        match self {
            Retrieval::Lexical(chunks) | Retrieval::Vector(chunks) => chunks,
            Retrieval::Empty => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chunks().is_empty()
    }

    pub fn into_texts(self) -> Vec<String> {
        match self {
            Retrieval::Lexical(chunks) | Retrieval::Vector(chunks) => {
                chunks.into_iter().map(|c| c.chunk.text).collect()
            }
            Retrieval::Empty => Vec::new(),
        }
    }
}

/// Retrieval policy.
///
/// Results are capped at `2 * top_k`; the vector tier searches `3 * top_k`
/// neighbours and discards those scoring below `relevance_threshold`.
#[derive(Debug, Clone, Copy)]
pub struct Retriever {
    pub top_k: usize,
    pub relevance_threshold: f32,
}

impl Retriever {
    pub fn new(top_k: usize, relevance_threshold: f32) -> Self {
        Self {
            top_k,
            relevance_threshold,
        }
    }

    pub fn result_limit(&self) -> usize {
        2 * self.top_k
    }

    pub fn candidate_limit(&self) -> usize {
        3 * self.top_k
    }

    pub async fn retrieve(
        &self,
        question: &str,
        snapshot: &CorpusSnapshot,
        embedder: &dyn Embedder,
    ) -> Result<Retrieval> {
        if snapshot.is_empty() {
            return Ok(Retrieval::Empty);
        }

        let terms = QueryTerms::new(question);

        if let Some(lexical) = self.lexical_tier(&terms, snapshot) {
            tracing::info!("Lexical tier matched {} chunks", lexical.len());
            return Ok(Retrieval::Lexical(lexical));
        }

        let query = embed_single(embedder, question)
            .await
            .map_err(Error::upstream)?;
        let hits = snapshot.index.search(&query, self.candidate_limit())?;

        let candidates: Vec<ContextChunk> = hits
            .into_iter()
            .filter(|hit| hit.score >= self.relevance_threshold)
            .filter_map(|hit| {
                let chunk = snapshot.chunk(hit.metadata.chunk_id)?;
                Some(ContextChunk {
                    chunk: chunk.clone(),
                    lexical_score: 0,
                    vector_score: Some(hit.score),
                })
            })
            .collect();

        if candidates.is_empty() {
            tracing::info!(
                "No chunk passed the relevance threshold {}",
                self.relevance_threshold
            );
            return Ok(Retrieval::Empty);
        }

        let context: Vec<ContextChunk> = rerank_scored(&terms, candidates)
            .into_iter()
            .take(self.result_limit())
            .map(|ranked| ContextChunk {
                lexical_score: ranked.score,
                ..ranked.item
            })
            .collect();

        tracing::info!("Vector tier selected {} chunks", context.len());
        Ok(Retrieval::Vector(context))
    }

    /// Chunks sharing at least one term with the question, best first, or
    /// `None` when no chunk shares any.
    fn lexical_tier(
        &self,
        terms: &QueryTerms,
        snapshot: &CorpusSnapshot,
    ) -> Option<Vec<ContextChunk>> {
        if terms.is_empty() {
            return None;
        }
        let ranked = rerank_scored(terms, snapshot.chunks.iter());
        if ranked.first().is_none_or(|r| r.score == 0) {
            return None;
        }
        Some(
            ranked
                .into_iter()
                .take_while(|r| r.score > 0)
                .take(self.result_limit())
                .map(|r| ContextChunk {
                    chunk: r.item.clone(),
                    lexical_score: r.score,
                    vector_score: None,
                })
                .collect(),
        )
    }
}
