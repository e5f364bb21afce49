//! # kb-assist
//!
//! A retrieval-augmented question-answering service over onboarding
//! documents. Pages are pulled from Confluence or local PDFs, chunked,
//! embedded and indexed in memory; questions are answered from the most
//! relevant chunks by a chat model.
//!
//! ## Retrieval
//!
//! ```text
//!                  ┌──────────────┐
//!                  │   Question   │
//!                  └──────┬───────┘
//!                         ▼
//!             ┌───────────────────────┐
//!             │ Lexical overlap over  │
//!             │    every chunk        │
//!             └───────────┬───────────┘
//!              top > 0    │    top == 0
//!           ┌─────────────┴─────────────┐
//!           ▼                           ▼
//!  ┌─────────────────┐       ┌─────────────────────┐
//!  │ Lexical tier    │       │ Embed question once │
//!  │ score > 0 only  │       │ search 3 × top_k    │
//!  │ keep 2 × top_k  │       │ drop < threshold    │
//!  └────────┬────────┘       │ lexical rerank      │
//!           │                │ keep 2 × top_k      │
//!           │                └──────────┬──────────┘
//!           └─────────────┬─────────────┘
//!                         ▼
//!             ┌───────────────────────┐
//!             │ Generator, or the     │
//!             │ out-of-scope answer   │
//!             │ when nothing survives │
//!             └───────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration for server, chunking, providers and Confluence
//! - [`error`] - The crate error type and its variants
//! - [`models`] - Shared data types: `Document`, `Chunk`, `ChunkMetadata`, request/response types
//! - [`chunking`] - Overlapping fixed-width character windows
//! - [`search::vector`] - In-memory cosine-similarity index over normalized vectors
//! - [`search::lexical`] - Token-overlap scorer and stable reranker
//! - [`search::hybrid`] - The two-tier retriever and its `Retrieval` result
//! - [`corpus`] - Corpus building (chunk + embed) and the atomically swapped snapshot store
//! - [`ingest`] - Document sources: Confluence spaces and local PDF/text directories
//! - [`llm`] - Embedding providers, answer generators and prompt construction
//! - [`service`] - `RagService`: ingestion and question answering
//! - [`api`] - Axum HTTP handlers
//! - [`state`] - Shared application state

pub mod api;
pub mod chunking;
pub mod config;
pub mod corpus;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod search;
pub mod service;
pub mod state;

pub use error::{Error, Result};
