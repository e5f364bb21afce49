//! The searchable corpus: building it from documents and holding the live snapshot.

pub mod builder;
pub mod store;

pub use builder::{Corpus, CorpusBuilder};
pub use store::{CorpusSnapshot, CorpusStore};
