//! Document sources: where raw documents come from before chunking.

pub mod confluence;
pub mod html;
pub mod pdf;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::Document;

pub use confluence::ConfluenceSource;
pub use pdf::PdfSource;

/// Produces the full document set for one ingestion run.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Document>>;

    /// Human-readable origin for logs, e.g. `confluence:ENG`.
    fn describe(&self) -> String;
}
