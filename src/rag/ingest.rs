//! One-shot ingestion: scrape → split → embed → insert, one source at a
//! time. Re-running inserts the same chunks again.

use std::sync::Arc;

use async_trait::async_trait;

use super::scraper::PageScraper;
use super::splitter::RecursiveTextSplitter;
use super::store::{CollectionSpec, DocumentChunk, VectorStore};
use crate::core::errors::ApiError;
use crate::llm::EmbeddingProvider;

/// Source of page text for ingestion.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String, ApiError>;
}

#[async_trait]
impl PageFetcher for PageScraper {
    async fn fetch_text(&self, url: &str) -> Result<String, ApiError> {
        self.scrape(url).await
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct IngestReport {
    pub sources_loaded: usize,
    /// `(url, error)` for sources that could not be fetched.
    pub sources_failed: Vec<(String, String)>,
    pub chunks_inserted: usize,
}

pub struct IngestJob {
    fetcher: Arc<dyn PageFetcher>,
    splitter: RecursiveTextSplitter,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    collection: CollectionSpec,
}

impl IngestJob {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        splitter: RecursiveTextSplitter,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        collection: CollectionSpec,
    ) -> Self {
        Self {
            fetcher,
            splitter,
            embedder,
            store,
            collection,
        }
    }

    pub async fn create_collection(&self) -> Result<(), ApiError> {
        self.store.create_collection(self.collection).await
    }

    /// Processes every source in order. Fetch failures skip the source;
    /// embedding or insert failures abort the run.
    pub async fn load_sources(&self, sources: &[String]) -> Result<IngestReport, ApiError> {
        let mut report = IngestReport::default();

        for url in sources {
            let content = match self.fetcher.fetch_text(url).await {
                Ok(content) => content,
                Err(err) => {
                    tracing::warn!("Failed to fetch {}: {}", url, err);
                    report
                        .sources_failed
                        .push((url.clone(), err.client_message().to_string()));
                    continue;
                }
            };

            let inserted = self.ingest_text(url, &content).await?;
            tracing::info!("Loaded {} chunks from {}", inserted, url);
            report.sources_loaded += 1;
            report.chunks_inserted += inserted;
        }

        Ok(report)
    }

    /// Splits, embeds and inserts one document. Returns the number of chunks written.
    pub async fn ingest_text(&self, source: &str, content: &str) -> Result<usize, ApiError> {
        let chunks = self.splitter.split_text(content);
        tracing::debug!("{} split into {} chunks", source, chunks.len());

        let mut inserted = 0;
        for chunk in chunks {
            let vector = self.embedder.embed(&chunk).await?;
            self.check_vector(&vector, source)?;

            let id = self
                .store
                .insert(DocumentChunk {
                    text: chunk,
                    vector,
                })
                .await?;
            tracing::debug!(
                "Inserted chunk {} of {} (id {})",
                inserted + 1,
                source,
                id.as_deref().unwrap_or("-")
            );
            inserted += 1;
        }
        Ok(inserted)
    }

    fn check_vector(&self, vector: &[f32], source: &str) -> Result<(), ApiError> {
        if vector.is_empty() {
            return Err(ApiError::upstream(
                "embedding",
                format!(
                    "{} returned an empty embedding for a chunk of {}",
                    self.embedder.name(),
                    source
                ),
            ));
        }
        if vector.len() != self.collection.dimension {
            return Err(ApiError::upstream(
                "embedding",
                format!(
                    "embedding dimension {} does not match collection dimension {}",
                    vector.len(),
                    self.collection.dimension
                ),
            ));
        }
        Ok(())
    }
}
