//! Q&A server binary
//!
//! Run with: cargo run -p qna-rag --bin qna-rag-server -- --config qna-rag.toml

use clap::Parser;
use std::path::PathBuf;

use qna_rag::{config::RagConfig, server::RagServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Question answering over a user-selected set of documents
#[derive(Debug, Parser)]
#[command(name = "qna-rag-server", version, about)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "QNA_RAG_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listen host
    #[arg(long)]
    host: Option<String>,

    /// Override the listen port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing .env is fine
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qna_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = RagConfig::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!("Configuration loaded");
    tracing::info!("  - Database: {}", config.database.path.display());
    tracing::info!(
        "  - Embeddings: {:?} ({}, {} dims)",
        config.embeddings.backend,
        config.embeddings.model,
        config.embeddings.dimensions
    );
    tracing::info!("  - LLM: {:?} ({})", config.llm.backend, config.llm.model);

    let server = RagServer::new(config).await?;

    let embedder = server.state().embedding_provider();
    if !embedder.health_check().await.unwrap_or(false) {
        tracing::warn!("Embedding provider '{}' is not reachable", embedder.name());
    }
    let llm = server.state().llm_provider();
    if !llm.health_check().await.unwrap_or(false) {
        tracing::warn!("LLM provider '{}' is not reachable", llm.name());
    }

    tracing::info!("Health: http://{}/health", server.address());
    server.start().await?;

    Ok(())
}
