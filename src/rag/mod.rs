//! Retrieval storage and ingestion.
//!
//! - `VectorStore`: similarity search and inserts over an external database
//! - `AstraStore`: Astra DB Data API implementation
//! - `IngestJob`: scrape, split, embed and insert source pages

mod astra;
mod ingest;
mod scraper;
mod splitter;
mod store;

pub use astra::AstraStore;
pub use ingest::{IngestJob, IngestReport, PageFetcher};
pub use scraper::{strip_html_tags, PageScraper};
pub use splitter::{RecursiveTextSplitter, SplitterConfig};
pub use store::{ChunkSearchResult, CollectionSpec, DocumentChunk, SimilarityMetric, VectorStore};
