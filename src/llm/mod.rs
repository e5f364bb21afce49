//! LLM providers: embeddings, answer generation and prompt construction.

pub mod embeddings;
pub mod generate;
#[cfg(feature = "local-embeddings")]
pub mod local;
pub mod prompt;

use std::sync::Arc;

use crate::config::{ChatProvider, Config, EmbedProvider};
use crate::error::{Error, Result};
use embeddings::{Embedder, RemoteEmbedder};
use generate::{ChatGenerator, Generator, PassthroughGenerator};

/// Build the embedder named by configuration. Called once at startup.
pub async fn build_embedder(config: &Config, client: reqwest::Client) -> Result<Arc<dyn Embedder>> {
    match config.llm.embed_provider {
        EmbedProvider::Ollama | EmbedProvider::OpenAi => {
            let embedder = RemoteEmbedder::new(client, config.llm.clone())
                .map_err(|e| Error::Configuration(format!("{e:#}")))?;
            Ok(Arc::new(embedder))
        }
        #[cfg(feature = "local-embeddings")]
        EmbedProvider::Local => {
            let embedder = local::LocalEmbedder::load()
                .await
                .map_err(|e| Error::Configuration(format!("{e:#}")))?;
            Ok(Arc::new(embedder))
        }
        #[cfg(not(feature = "local-embeddings"))]
        EmbedProvider::Local => Err(Error::Configuration(
            "EMBED_PROVIDER=local requires building with the `local-embeddings` feature"
                .to_string(),
        )),
    }
}

/// Build the answer generator named by configuration.
pub fn build_generator(config: &Config, client: reqwest::Client) -> Result<Arc<dyn Generator>> {
    match config.llm.chat_provider {
        ChatProvider::Passthrough => Ok(Arc::new(PassthroughGenerator)),
        ChatProvider::Ollama | ChatProvider::OpenAi => {
            let generator =
                ChatGenerator::new(client, config.llm.clone(), config.link_hints.clone())
                    .map_err(|e| Error::Configuration(format!("{e:#}")))?;
            Ok(Arc::new(generator))
        }
    }
}
