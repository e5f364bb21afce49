use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{ChatProvider, LinkHint, LlmConfig};
use crate::llm::prompt::{build_rag_prompt, build_system_prompt, post_process_answer};

/// (question, context chunks) → answer text.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, question: &str, context: &[String]) -> Result<String>;

    fn name(&self) -> String;
}

/// Returns the retrieved context joined by blank lines. Used when no chat model
/// is configured.
pub struct PassthroughGenerator;

#[async_trait]
impl Generator for PassthroughGenerator {
    async fn generate(&self, _question: &str, context: &[String]) -> Result<String> {
        Ok(context.join("\n\n"))
    }

    fn name(&self) -> String {
        "passthrough".to_string()
    }
}

/// Answers through a chat-completion API (Ollama or OpenAI-compatible).
pub struct ChatGenerator {
    client: reqwest::Client,
    config: LlmConfig,
    link_hints: Vec<LinkHint>,
    dialect: ChatDialect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChatDialect {
    Ollama,
    OpenAi,
}

impl ChatGenerator {
    pub fn new(
        client: reqwest::Client,
        config: LlmConfig,
        link_hints: Vec<LinkHint>,
    ) -> Result<Self> {
        let dialect = match config.chat_provider {
            ChatProvider::Ollama => ChatDialect::Ollama,
            ChatProvider::OpenAi => ChatDialect::OpenAi,
            ChatProvider::Passthrough => {
                anyhow::bail!("ChatGenerator cannot serve the passthrough provider")
            }
        };
        Ok(Self {
            client,
            config,
            link_hints,
            dialect,
        })
    }
}

#[async_trait]
impl Generator for ChatGenerator {
    async fn generate(&self, question: &str, context: &[String]) -> Result<String> {
        let messages = vec![
            Message {
                role: "system".to_string(),
                content: build_system_prompt(),
            },
            Message {
                role: "user".to_string(),
                content: build_rag_prompt(question, context, &self.link_hints),
            },
        ];

        let answer = match self.dialect {
            ChatDialect::Ollama => call_ollama(&self.client, &self.config, messages).await?,
            ChatDialect::OpenAi => call_openai(&self.client, &self.config, messages).await?,
        };

        Ok(post_process_answer(answer.trim(), &self.link_hints))
    }

    fn name(&self) -> String {
        let provider = match self.dialect {
            ChatDialect::Ollama => "ollama",
            ChatDialect::OpenAi => "openai",
        };
        format!("{provider}:{}", self.config.chat_model)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

// ─── Ollama ──────────────────────────────────────────────

#[derive(Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<Message>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: Message,
}

async fn call_ollama(
    client: &reqwest::Client,
    config: &LlmConfig,
    messages: Vec<Message>,
) -> Result<String> {
    let url = format!("{}/api/chat", config.base_url);

    let req = OllamaChatRequest {
        model: config.chat_model.clone(),
        messages,
        stream: false,
        options: OllamaOptions {
            temperature: config.temperature,
            num_predict: config.max_tokens,
        },
    };

    let resp = client
        .post(&url)
        .json(&req)
        .send()
        .await
        .context("Failed to call Ollama chat API")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("Ollama chat API returned {status}: {body}");
    }

    let body: OllamaChatResponse = resp
        .json()
        .await
        .context("Failed to parse Ollama chat response")?;
    Ok(body.message.content)
}

// ─── OpenAI-compatible ───────────────────────────────────

#[derive(Serialize)]
struct OpenAiChatRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

async fn call_openai(
    client: &reqwest::Client,
    config: &LlmConfig,
    messages: Vec<Message>,
) -> Result<String> {
    let url = format!("{}/v1/chat/completions", config.base_url);
    let api_key = config.api_key.as_deref().unwrap_or_default();

    let req = OpenAiChatRequest {
        model: config.chat_model.clone(),
        messages,
        max_tokens: config.max_tokens,
        temperature: config.temperature,
    };

    let resp = client
        .post(&url)
        .header("Authorization", format!("Bearer {api_key}"))
        .json(&req)
        .send()
        .await
        .context("Failed to call OpenAI chat API")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("OpenAI chat API returned {status}: {body}");
    }

    let body: OpenAiChatResponse = resp
        .json()
        .await
        .context("Failed to parse OpenAI chat response")?;
    extract_openai_content(body)
}

fn extract_openai_content(body: OpenAiChatResponse) -> Result<String> {
    body.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .context("OpenAI chat response contained no message content")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_passthrough_joins_context() {
        let answer = PassthroughGenerator
            .generate("q", &["first".into(), "second".into()])
            .await
            .unwrap();
        assert_eq!(answer, "first\n\nsecond");
    }

    #[test]
    fn test_chat_generator_rejects_passthrough() {
        let config = LlmConfig {
            chat_provider: ChatProvider::Passthrough,
            ..LlmConfig::default()
        };
        assert!(ChatGenerator::new(reqwest::Client::new(), config, Vec::new()).is_err());
    }

    #[test]
    fn test_parse_ollama_chat_response() {
        let json = r#"{
            "model": "llama3.2",
            "message": {"role": "assistant", "content": "Open a ticket."},
            "done": true
        }"#;
        let body: OllamaChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(body.message.content, "Open a ticket.");
    }

    #[test]
    fn test_extract_openai_content() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":"Use SSO."}}]}"#;
        let body: OpenAiChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(extract_openai_content(body).unwrap(), "Use SSO.");
    }

    #[test]
    fn test_extract_openai_content_missing() {
        let body: OpenAiChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(extract_openai_content(body).is_err());
    }
}
