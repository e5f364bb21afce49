use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::html::html_to_text;
use super::DocumentSource;
use crate::config::ConfluenceConfig;
use crate::models::Document;

/// Pages requested per REST call.
const PAGE_SIZE: usize = 50;

/// All pages of one Confluence space, fetched through the REST content API.
pub struct ConfluenceSource {
    client: reqwest::Client,
    config: ConfluenceConfig,
    space_key: String,
}

impl ConfluenceSource {
    pub fn new(
        client: reqwest::Client,
        config: ConfluenceConfig,
        space_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            config,
            space_key: space_key.into(),
        }
    }

    async fn fetch_batch(&self, start: usize) -> Result<ContentResponse> {
        let url = format!("{}/rest/api/content", self.config.base_url);
        let limit = PAGE_SIZE.to_string();
        let start = start.to_string();
        let mut req = self.client.get(&url).query(&[
            ("spaceKey", self.space_key.as_str()),
            ("expand", "body.storage"),
            ("type", "page"),
            ("limit", limit.as_str()),
            ("start", start.as_str()),
        ]);
        if let (Some(email), Some(token)) = (&self.config.email, &self.config.api_token) {
            req = req.basic_auth(email, Some(token));
        }

        let resp = req
            .send()
            .await
            .context("Failed to call Confluence content API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Confluence content API returned {status}: {body}");
        }

        resp.json()
            .await
            .context("Failed to parse Confluence content response")
    }
}

#[async_trait]
impl DocumentSource for ConfluenceSource {
    async fn fetch(&self) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        let mut start = 0;

        loop {
            let batch = self.fetch_batch(start).await?;
            if batch.results.is_empty() {
                break;
            }
            let size = batch.size.unwrap_or(batch.results.len());
            documents.extend(batch.results.into_iter().map(ContentItem::into_document));
            tracing::debug!(
                "Fetched {} Confluence pages from space {}",
                documents.len(),
                self.space_key
            );

            match next_start(start, size, self.config.page_limit) {
                Some(next) => start = next,
                None => break,
            }
        }

        tracing::info!(
            "Fetched {} pages from Confluence space {}",
            documents.len(),
            self.space_key
        );
        Ok(documents)
    }

    fn describe(&self) -> String {
        format!("confluence:{}", self.space_key)
    }
}

/// Offset of the next batch, or `None` once the page limit is reached or the
/// API returned a short batch.
fn next_start(start: usize, size: usize, page_limit: usize) -> Option<usize> {
    let next = start + PAGE_SIZE;
    if next >= page_limit || size < PAGE_SIZE {
        return None;
    }
    Some(next)
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    #[serde(default)]
    results: Vec<ContentItem>,
    #[serde(default)]
    size: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ContentItem {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: Option<ContentBody>,
}

#[derive(Debug, Deserialize)]
struct ContentBody {
    storage: Option<StorageValue>,
}

#[derive(Debug, Deserialize)]
struct StorageValue {
    #[serde(default)]
    value: String,
}

impl ContentItem {
    fn into_document(self) -> Document {
        let html = self
            .body
            .and_then(|b| b.storage)
            .map(|s| s.value)
            .unwrap_or_default();
        Document {
            id: self.id,
            title: self.title,
            text: html_to_text(&html),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_response() {
        let json = r#"{
            "results": [
                {
                    "id": "101",
                    "title": "GitHub",
                    "body": {"storage": {"value": "<p>Request GitHub access.</p>"}}
                },
                {"id": "102", "title": "Blank"}
            ],
            "size": 2,
            "start": 0,
            "limit": 50
        }"#;
        let resp: ContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.size, Some(2));
        let docs: Vec<Document> = resp
            .results
            .into_iter()
            .map(ContentItem::into_document)
            .collect();
        assert_eq!(docs[0], Document::new("101", "GitHub", "Request GitHub access."));
        assert_eq!(docs[1].text, "");
    }

    #[test]
    fn test_next_start_stops_on_short_batch() {
        assert_eq!(next_start(0, 50, 200), Some(50));
        assert_eq!(next_start(50, 12, 200), None);
    }

    #[test]
    fn test_next_start_stops_at_page_limit() {
        assert_eq!(next_start(100, 50, 200), Some(150));
        assert_eq!(next_start(150, 50, 200), None);
    }

    #[test]
    fn test_describe() {
        let source =
            ConfluenceSource::new(reqwest::Client::new(), ConfluenceConfig::default(), "ENG");
        assert_eq!(source.describe(), "confluence:ENG");
    }
}
