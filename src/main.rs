use axum::routing::{get, post};
use axum::Router;
use tracing_subscriber::EnvFilter;

use kb_assist::api;
use kb_assist::config::Config;
use kb_assist::ingest::PdfSource;
use kb_assist::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!("Document path: {}", config.pdf_path.display());
    tracing::info!(
        "Chunking: {} chars with {} overlap, top_k {}",
        config.chunk_size,
        config.chunk_overlap,
        config.top_k
    );

    let state = AppState::new(config.clone()).await?;
    tracing::info!(
        "Embedder: {}, generator: {} ({})",
        state.service.embedder_name(),
        state.service.generator_name(),
        config.llm.base_url
    );

    if config.ingest_on_startup {
        let service = state.service.clone();
        let source = PdfSource::new(config.pdf_path.clone());
        tokio::spawn(async move {
            match service.ingest_from(&source).await {
                Ok(summary) => tracing::info!(
                    "Startup ingestion complete: {} chunks from {} documents",
                    summary.chunk_count,
                    summary.document_count
                ),
                Err(e) => tracing::error!("Startup ingestion failed: {e}"),
            }
        });
    }

    let app = Router::new()
        .route("/health", get(api::status::health))
        .route("/api/status", get(api::status::status))
        .route("/api/ingest", post(api::ingest::ingest))
        .route("/api/ask", post(api::ask::ask))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
