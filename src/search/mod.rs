//! Retrieval: the vector index, the lexical scorer and the two-tier retriever.

pub mod hybrid;
pub mod lexical;
pub mod vector;

pub use hybrid::{ContextChunk, Retrieval, Retriever};
