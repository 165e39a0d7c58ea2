use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use vectordb::config::Config;
use vectordb::embedding::{EmbeddingProvider, FixedEmbeddingProvider, HttpEmbeddingProvider};
use vectordb::service::AppState;

#[derive(Parser)]
#[command(name = "vectordb-cli")]
#[command(about = "A single-node vector database: store and retrieve text chunks by similarity")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild every index from the record store and serve the REST API.
    Serve,
    /// Rebuild every index from the record store without serving.
    Rebuild,
    /// Print per-collection record counts and attached index names.
    Stats,
}

fn build_embedder(config: &Config) -> Arc<dyn EmbeddingProvider> {
    match &config.embedding_provider_url {
        Some(url) => Arc::new(HttpEmbeddingProvider::new(
            url.clone(),
            config.embedding_provider_token.clone(),
            config.embedding_dim,
        )),
        None => Arc::new(FixedEmbeddingProvider::new(config.embedding_dim)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Commands::Serve => serve(config).await,
        Commands::Rebuild => rebuild(config),
        Commands::Stats => stats(config),
    }
}

async fn serve(config: Config) -> Result<()> {
    let embedder = build_embedder(&config);
    let state = Arc::new(AppState::open(&config, embedder)?);

    tracing::info!("running startup rebuild");
    state.startup_rebuild()?;

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(%addr, "starting server");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let app = vectordb::http::router(state);
    axum::serve(listener, app).await?;
    Ok(())
}

fn rebuild(config: Config) -> Result<()> {
    let embedder = build_embedder(&config);
    let state = AppState::open(&config, embedder)?;
    state.startup_rebuild()?;
    println!("rebuild complete");
    Ok(())
}

fn stats(config: Config) -> Result<()> {
    let embedder = build_embedder(&config);
    let state = AppState::open(&config, embedder)?;
    state.startup_rebuild()?;
    println!("libraries: {}", state.libraries.list()?.len());
    println!("documents: {}", state.documents.list()?.len());
    println!("chunks:    {}", state.chunks.list()?.len());
    Ok(())
}
