use thiserror::Error;

/// Errors surfaced by the retrieval core and its collaborators.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid settings or inconsistent inputs (chunk size vs. overlap,
    /// embedding dimensionality). Fatal when raised at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The embedding or generation provider failed. Never retried here.
    #[error("Upstream provider error: {0}")]
    Upstream(String),

    /// A document source (Confluence, PDF directory) could not be read.
    #[error("Document source error: {0}")]
    Source(String),

    /// No ingestion run has completed yet, so there is nothing to search.
    #[error("Index not initialized: no successful ingestion has completed yet")]
    NotReady,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl Error {
    /// Wrap a provider failure, keeping the full `anyhow` context chain.
    pub fn upstream(err: anyhow::Error) -> Self {
        Error::Upstream(format!("{err:#}"))
    }

    pub fn source(err: anyhow::Error) -> Self {
        Error::Source(format!("{err:#}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_keeps_context_chain() {
        let err = anyhow::anyhow!("connection refused").context("Failed to call Ollama embed API");
        let wrapped = Error::upstream(err);
        let msg = wrapped.to_string();
        assert!(msg.contains("Failed to call Ollama embed API"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn test_not_ready_is_distinct_message() {
        assert!(Error::NotReady.to_string().contains("not initialized"));
    }
}
