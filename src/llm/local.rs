//! In-process embeddings with fastembed (all-MiniLM-L6-v2 by default).

use anyhow::{Context, Result};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use parking_lot::Mutex;
use std::sync::Arc;

use super::embeddings::Embedder;

pub struct LocalEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
    model_name: String,
}

impl LocalEmbedder {
    /// Load the model, downloading it on first use. Runs on the blocking pool.
    pub async fn load() -> Result<Self> {
        tracing::info!("Loading local embedding model all-MiniLM-L6-v2");
        let model = tokio::task::spawn_blocking(|| {
            let options =
                InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_show_download_progress(false);
            TextEmbedding::try_new(options)
                .map_err(|e| anyhow::anyhow!("Failed to initialize fastembed model: {e}"))
        })
        .await
        .context("Embedding model loader task failed")??;

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            model_name: "all-MiniLM-L6-v2".to_string(),
        })
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = Arc::clone(&self.model);
        let batch = texts.to_vec();
        tokio::task::spawn_blocking(move || {
            let mut model = model.lock();
            model
                .embed(batch, None)
                .map_err(|e| anyhow::anyhow!("fastembed inference failed: {e}"))
        })
        .await
        .context("Embedding task failed")?
    }

    fn name(&self) -> String {
        format!("local:{}", self.model_name)
    }
}
