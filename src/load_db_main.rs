//! Populates the vector collection from the configured source pages.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use f1gpt_backend::core::config::{AppPaths, ConfigService};
use f1gpt_backend::core::logging;
use f1gpt_backend::llm::OpenAiEmbeddingProvider;
use f1gpt_backend::rag::{
    AstraStore, CollectionSpec, IngestJob, PageScraper, RecursiveTextSplitter, SimilarityMetric,
    SplitterConfig,
};

#[derive(Parser)]
#[command(name = "load_db")]
#[command(about = "Scrape source pages, embed them and load the vector collection")]
struct Args {
    /// Similarity metric for the new collection (dot_product, cosine, euclidean)
    #[arg(long)]
    metric: Option<SimilarityMetric>,

    /// Insert into an existing collection instead of creating it first
    #[arg(long)]
    skip_create: bool,

    /// Source URL to ingest; repeat to pass several. Defaults to the configured list
    #[arg(long = "source")]
    sources: Vec<String>,

    /// Config file to read instead of <project root>/config.yml
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let dotenv = dotenvy::dotenv();

    let mut paths = AppPaths::new();
    if let Some(path) = args.config {
        paths.config_path = path;
    }
    let config = ConfigService::new(Arc::new(paths))
        .load()
        .context("Failed to load configuration")?;

    logging::init(config.logging.dir.as_deref(), "load_db.log");
    if let Ok(path) = dotenv {
        tracing::info!("Loaded environment from {}", path.display());
    }

    let connection = config.vector_store.connection()?;
    let openai_key = config.openai.require_api_key()?;
    let collection = CollectionSpec {
        dimension: config.vector_store.dimension,
        metric: args.metric.unwrap_or(config.vector_store.metric),
    };

    let scraper = PageScraper::new(Duration::from_secs(config.ingest.fetch_timeout_secs))
        .context("Failed to build HTTP client")?;
    let splitter = RecursiveTextSplitter::new(SplitterConfig {
        chunk_size: config.ingest.chunk_size,
        chunk_overlap: config.ingest.chunk_overlap,
    });
    let embedder =
        OpenAiEmbeddingProvider::new(&config.openai, openai_key).with_dimensions(collection.dimension);
    let store = AstraStore::new(&connection);

    let job = IngestJob::new(
        Arc::new(scraper),
        splitter,
        Arc::new(embedder),
        Arc::new(store),
        collection,
    );

    if args.skip_create {
        tracing::info!("Skipping collection creation for {}", connection.collection);
    } else {
        job.create_collection()
            .await
            .with_context(|| format!("Failed to create collection {}", connection.collection))?;
        tracing::info!(
            "Created collection {} ({} dimensions, {})",
            connection.collection,
            collection.dimension,
            collection.metric
        );
    }

    let sources = if args.sources.is_empty() {
        config.ingest.sources.clone()
    } else {
        args.sources
    };
    if sources.is_empty() {
        anyhow::bail!("No source URLs configured");
    }

    let report = job
        .load_sources(&sources)
        .await
        .context("Ingestion aborted")?;

    for (url, err) in &report.sources_failed {
        tracing::warn!("Skipped {}: {}", url, err);
    }
    tracing::info!(
        "Ingestion finished: {} of {} sources loaded, {} chunks inserted",
        report.sources_loaded,
        sources.len(),
        report.chunks_inserted
    );

    Ok(())
}
