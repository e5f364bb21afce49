use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{EmbedProvider, LlmConfig};

/// Maximum characters to send per text to the embedding API.
/// Chunks are far below this; it guards against oddly long questions.
const MAX_EMBED_CHARS: usize = 8_000;

/// Text → vector capability. Implementations must preserve input order and
/// return vectors of one fixed dimensionality.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Short identifier for logs, e.g. `ollama:nomic-embed-text`.
    fn name(&self) -> String;
}

/// Embed a single text.
pub async fn embed_single(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>> {
    let results = embedder.embed(&[text.to_string()]).await?;
    results
        .into_iter()
        .next()
        .context("No embedding returned")
}

/// Truncate `text` to at most `MAX_EMBED_CHARS`, splitting on a UTF-8 char boundary.
fn truncate_for_embedding(text: &str) -> &str {
    if text.len() <= MAX_EMBED_CHARS {
        return text;
    }
    let mut end = MAX_EMBED_CHARS;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Embeddings from an HTTP API: Ollama or any OpenAI-compatible server.
pub struct RemoteEmbedder {
    client: reqwest::Client,
    config: LlmConfig,
    dialect: RemoteDialect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RemoteDialect {
    Ollama,
    OpenAi,
}

impl RemoteEmbedder {
    pub fn new(client: reqwest::Client, config: LlmConfig) -> Result<Self> {
        let dialect = match config.embed_provider {
            EmbedProvider::Ollama => RemoteDialect::Ollama,
            EmbedProvider::OpenAi => RemoteDialect::OpenAi,
            EmbedProvider::Local => {
                anyhow::bail!("RemoteEmbedder cannot serve the local embedding provider")
            }
        };
        Ok(Self {
            client,
            config,
            dialect,
        })
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let truncated: Vec<String> = texts
            .iter()
            .map(|t| truncate_for_embedding(t).to_string())
            .collect();

        let embeddings = match self.dialect {
            RemoteDialect::Ollama => embed_ollama(&self.client, &self.config, truncated).await?,
            RemoteDialect::OpenAi => embed_openai(&self.client, &self.config, truncated).await?,
        };

        if embeddings.len() != texts.len() {
            anyhow::bail!(
                "Embedding API returned {} vectors for {} inputs",
                embeddings.len(),
                texts.len()
            );
        }
        Ok(embeddings)
    }

    fn name(&self) -> String {
        let provider = match self.dialect {
            RemoteDialect::Ollama => "ollama",
            RemoteDialect::OpenAi => "openai",
        };
        format!("{provider}:{}", self.config.embedding_model)
    }
}

// ─── Ollama ──────────────────────────────────────────────

#[derive(Serialize)]
struct OllamaEmbedRequest {
    model: String,
    input: Vec<String>,
    /// Ask Ollama to silently truncate inputs that exceed the model's context
    /// length instead of returning a 400 error.
    truncate: bool,
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

async fn embed_ollama(
    client: &reqwest::Client,
    config: &LlmConfig,
    texts: Vec<String>,
) -> Result<Vec<Vec<f32>>> {
    let url = format!("{}/api/embed", config.base_url);

    let req = OllamaEmbedRequest {
        model: config.embedding_model.clone(),
        input: texts,
        truncate: true,
    };

    let resp = client
        .post(&url)
        .json(&req)
        .send()
        .await
        .context("Failed to call Ollama embed API")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("Ollama embed API returned {status}: {body}");
    }

    let body: OllamaEmbedResponse = resp
        .json()
        .await
        .context("Failed to parse Ollama embed response")?;

    Ok(body.embeddings)
}

// ─── OpenAI-compatible ───────────────────────────────────

#[derive(Serialize)]
struct OpenAiEmbedRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct OpenAiEmbedResponse {
    data: Vec<OpenAiEmbedData>,
}

#[derive(Deserialize)]
struct OpenAiEmbedData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

async fn embed_openai(
    client: &reqwest::Client,
    config: &LlmConfig,
    texts: Vec<String>,
) -> Result<Vec<Vec<f32>>> {
    let url = format!("{}/v1/embeddings", config.base_url);
    let api_key = config.api_key.as_deref().unwrap_or_default();

    let req = OpenAiEmbedRequest {
        model: config.embedding_model.clone(),
        input: texts,
    };

    let resp = client
        .post(&url)
        .header("Authorization", format!("Bearer {api_key}"))
        .json(&req)
        .send()
        .await
        .context("Failed to call OpenAI embed API")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("OpenAI embed API returned {status}: {body}");
    }

    let body: OpenAiEmbedResponse = resp
        .json()
        .await
        .context("Failed to parse OpenAI embed response")?;

    Ok(order_openai_data(body.data))
}

/// OpenAI returns an `index` per item; honour it when present.
fn order_openai_data(mut data: Vec<OpenAiEmbedData>) -> Vec<Vec<f32>> {
    if data.iter().all(|d| d.index.is_some()) {
        data.sort_by_key(|d| d.index);
    }
    data.into_iter().map(|d| d.embedding).collect()
}
