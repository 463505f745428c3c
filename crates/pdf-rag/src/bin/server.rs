//! RAG Server binary
//!
//! Run with: cargo run -p pdf-rag --bin pdf-rag-server

use clap::Parser;
use pdf_rag::{
    config::RagConfig,
    server::RagServer,
    system::{FetchPlan, InitializeOptions, RagSystem},
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "pdf-rag-server", version, about = "Question answering over PDF documents")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen host
    #[arg(long)]
    host: Option<String>,

    /// Override the listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Initialize the index before serving
    #[arg(long)]
    init: bool,

    /// Discard the persisted index and rebuild (implies --init)
    #[arg(long)]
    force_rebuild: bool,

    /// Download one object from the bucket first (implies --init)
    #[arg(long, value_name = "KEY", conflicts_with = "fetch_all")]
    fetch: Option<String>,

    /// Download every PDF from the bucket first (implies --init)
    #[arg(long)]
    fetch_all: bool,

    /// Answer these questions and exit instead of serving
    #[arg(long = "ask", value_name = "QUESTION")]
    questions: Vec<String>,
}

impl Args {
    fn initialize_options(&self) -> Option<InitializeOptions> {
        let fetch = match (&self.fetch, self.fetch_all) {
            (Some(name), _) => FetchPlan::One(name.clone()),
            (None, true) => FetchPlan::All,
            (None, false) => FetchPlan::None,
        };
        let wanted = self.init || self.force_rebuild || fetch != FetchPlan::None || !self.questions.is_empty();
        wanted.then(|| InitializeOptions {
            force_rebuild: self.force_rebuild,
            fetch,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_rag=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => RagConfig::from_toml_file(path)?,
        None => RagConfig::default(),
    }
    .apply_env_overrides()?;
    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding model: {}", config.models.embedding_model);
    tracing::info!("  - LLM model: {} (context window {})", config.models.llm_model, config.models.context_window);
    tracing::info!("  - Chunk size: {} (overlap {})", config.chunking.chunk_size, config.chunking.chunk_overlap);
    tracing::info!("  - Documents: {}", config.storage.data_dir.display());
    tracing::info!("  - Index: {}", config.storage.index_dir.display());

    let ollama_url = config.models.ollama_url.clone();
    let system = Arc::new(RagSystem::from_config(config).await?);

    // Check Ollama
    if system.llm_available().await {
        tracing::info!("Ollama is running at {}", ollama_url);
    } else {
        tracing::warn!("Ollama not available at {}", ollama_url);
        tracing::warn!("Start it with `ollama serve` and pull the configured models");
    }

    if let Some(options) = args.initialize_options() {
        system.initialize_with(options).await?;
    }

    if !args.questions.is_empty() {
        for outcome in system.run_queries(&args.questions).await? {
            println!("Q: {}", outcome.question);
            match (outcome.answer, outcome.error) {
                (Some(answer), _) => println!("A: {}\n", answer),
                (None, Some(error)) => println!("Error: {}\n", error),
                (None, None) => println!(),
            }
        }
        return Ok(());
    }

    let server = RagServer::new(system);

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("\nEndpoints:");
    println!("  POST /api/initialize - Initialize or rebuild the index");
    println!("  POST /api/ask        - Ask questions");
    println!("  GET  /api/documents  - List documents");
    println!("  POST /api/documents  - Upload PDFs");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
