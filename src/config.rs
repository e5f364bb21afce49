use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::chunking::{ChunkingConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address
    pub bind_addr: String,
    /// Number of context chunks the retriever aims for (results are capped at 2x)
    pub top_k: usize,
    /// Window width in characters
    pub chunk_size: usize,
    /// Overlap between consecutive windows in characters
    pub chunk_overlap: usize,
    /// Chunks per embedding request during ingestion
    pub embed_batch_size: usize,
    /// Minimum cosine similarity for a vector-search hit to count
    pub relevance_threshold: f32,
    /// Maximum concurrent generation calls
    pub max_concurrent_asks: usize,
    /// PDF file or directory ingested at startup and by `/api/ingest` without a space key
    pub pdf_path: PathBuf,
    /// Run an ingestion from `pdf_path` when the server starts
    pub ingest_on_startup: bool,
    /// Service names whose URL should accompany any mention in an answer
    pub link_hints: Vec<LinkHint>,
    /// LLM provider configuration
    pub llm: LlmConfig,
    /// Confluence REST configuration
    pub confluence: ConfluenceConfig,
}

/// A service name and the URL it refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkHint {
    pub term: String,
    pub url: String,
}

/// Which backend produces embeddings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedProvider {
    Ollama,
    OpenAi,
    /// In-process fastembed model (requires the `local-embeddings` feature)
    Local,
}

/// Which backend writes answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatProvider {
    Ollama,
    OpenAi,
    /// Return the retrieved context verbatim
    Passthrough,
}

impl FromStr for EmbedProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            "local" => Ok(Self::Local),
            other => Err(Error::Configuration(format!(
                "unknown embedding provider: {other}"
            ))),
        }
    }
}

impl FromStr for ChatProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            "passthrough" | "local" => Ok(Self::Passthrough),
            other => Err(Error::Configuration(format!("unknown LLM provider: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub chat_provider: ChatProvider,
    pub embed_provider: EmbedProvider,
    /// Base URL for the LLM API
    pub base_url: String,
    /// Model name for answers
    pub chat_model: String,
    /// Model name for embeddings
    pub embedding_model: String,
    /// API key (only needed for cloud providers)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfluenceConfig {
    pub base_url: String,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
    /// Stop paging after this many pages
    pub page_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9000".to_string(),
            top_k: 4,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            embed_batch_size: 16,
            relevance_threshold: 0.45,
            max_concurrent_asks: 3,
            pdf_path: PathBuf::from("./data"),
            ingest_on_startup: true,
            link_hints: Vec::new(),
            llm: LlmConfig::default(),
            confluence: ConfluenceConfig::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            chat_provider: ChatProvider::Ollama,
            embed_provider: EmbedProvider::Ollama,
            base_url: "http://localhost:11434".to_string(),
            chat_model: "llama3.2".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            api_key: None,
            max_tokens: 2000,
            temperature: 0.0,
        }
    }
}

impl Default for ConfluenceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://your-domain.atlassian.net/wiki".to_string(),
            email: None,
            api_token: None,
            page_limit: 200,
        }
    }
}

impl Config {
    /// Defaults overridden by environment variables. Unparsable numbers keep the
    /// default; unknown provider names are reported as configuration errors.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("KB_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(v) = env_parse("KB_TOP_K") {
            config.top_k = v;
        }
        if let Some(v) = env_parse("KB_CHUNK_SIZE") {
            config.chunk_size = v;
        }
        if let Some(v) = env_parse("KB_CHUNK_OVERLAP") {
            config.chunk_overlap = v;
        }
        if let Some(v) = env_parse("KB_EMBED_BATCH_SIZE") {
            config.embed_batch_size = v;
        }
        if let Some(v) = env_parse("KB_RELEVANCE_THRESHOLD") {
            config.relevance_threshold = v;
        }
        if let Some(v) = env_parse("KB_MAX_CONCURRENT_ASKS") {
            config.max_concurrent_asks = v;
        }
        if let Ok(path) = std::env::var("KB_PDF_PATH") {
            config.pdf_path = PathBuf::from(path);
        }
        if let Some(v) = env_parse("KB_INGEST_ON_STARTUP") {
            config.ingest_on_startup = v;
        }
        if let Ok(hints) = std::env::var("KB_LINK_HINTS") {
            config.link_hints = parse_link_hints(&hints);
        }

        // LLM config
        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            config.llm.chat_provider = provider.parse()?;
        }
        if let Ok(provider) = std::env::var("EMBED_PROVIDER") {
            config.llm.embed_provider = provider.parse()?;
        }
        if let Ok(url) = std::env::var("LLM_BASE_URL") {
            config.llm.base_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(model) = std::env::var("LLM_CHAT_MODEL") {
            config.llm.chat_model = model;
        }
        if let Ok(model) = std::env::var("LLM_EMBEDDING_MODEL") {
            config.llm.embedding_model = model;
        }
        if let Ok(key) = std::env::var("LLM_API_KEY") {
            config.llm.api_key = Some(key);
        }
        if let Some(v) = env_parse("LLM_MAX_TOKENS") {
            config.llm.max_tokens = v;
        }
        if let Some(v) = env_parse("LLM_TEMPERATURE") {
            config.llm.temperature = v;
        }

        // Confluence config
        if let Ok(url) = std::env::var("CONFLUENCE_BASE_URL") {
            config.confluence.base_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(email) = std::env::var("CONFLUENCE_EMAIL") {
            config.confluence.email = Some(email);
        }
        if let Ok(token) = std::env::var("CONFLUENCE_API_TOKEN") {
            config.confluence.api_token = Some(token);
        }
        if let Some(v) = env_parse("CONFLUENCE_PAGE_LIMIT") {
            config.confluence.page_limit = v;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.chunking().validate()?;
        if self.top_k == 0 {
            return Err(Error::Configuration("top_k must be at least 1".to_string()));
        }
        if self.embed_batch_size == 0 {
            return Err(Error::Configuration(
                "embed_batch_size must be at least 1".to_string(),
            ));
        }
        if self.max_concurrent_asks == 0 {
            return Err(Error::Configuration(
                "max_concurrent_asks must be at least 1".to_string(),
            ));
        }
        if !(-1.0..=1.0).contains(&self.relevance_threshold) {
            return Err(Error::Configuration(format!(
                "relevance_threshold {} is outside [-1, 1]",
                self.relevance_threshold
            )));
        }
        Ok(())
    }

    pub fn chunking(&self) -> ChunkingConfig {
        ChunkingConfig {
            chunk_size: self.chunk_size,
            overlap: self.chunk_overlap,
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Parse `term=url;term=url`. Entries without `=` or with an empty side are skipped.
pub fn parse_link_hints(raw: &str) -> Vec<LinkHint> {
    raw.split(';')
        .filter_map(|entry| {
            let (term, url) = entry.split_once('=')?;
            let (term, url) = (term.trim(), url.trim());
            if term.is_empty() || url.is_empty() {
                return None;
            }
            Some(LinkHint {
                term: term.to_string(),
                url: url.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.top_k, 4);
        assert_eq!(config.chunking(), ChunkingConfig::new(500, 50).unwrap());
        assert_eq!(config.embed_batch_size, 16);
    }

    #[test]
    fn test_validate_rejects_overlap_at_chunk_size() {
        let config = Config {
            chunk_size: 100,
            chunk_overlap: 100,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_validate_rejects_zero_top_k() {
        let config = Config {
            top_k: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!("OpenAI".parse::<EmbedProvider>().unwrap(), EmbedProvider::OpenAi);
        assert_eq!("local".parse::<EmbedProvider>().unwrap(), EmbedProvider::Local);
        assert_eq!("local".parse::<ChatProvider>().unwrap(), ChatProvider::Passthrough);
        assert!("bedrock".parse::<ChatProvider>().is_err());
    }

    #[test]
    fn test_parse_link_hints() {
        let hints = parse_link_hints(
            "IT Service Hub=https://it.example.com/portal ; broken; =https://x; \
             Vault=https://vault.example.com",
        );
        assert_eq!(hints.len(), 2);
        assert_eq!(hints[0].term, "IT Service Hub");
        assert_eq!(hints[0].url, "https://it.example.com/portal");
        assert_eq!(hints[1].term, "Vault");
    }

    #[test]
    fn test_api_key_not_serialized() {
        let mut config = Config::default();
        config.llm.api_key = Some("secret".into());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
