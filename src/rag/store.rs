//! VectorStore trait: the query pipeline and the ingestion job only see
//! this interface, never a concrete database client.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;
use crate::llm::EmbeddingVector;

/// Similarity function fixed when a collection is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    DotProduct,
    Cosine,
    Euclidean,
}

impl SimilarityMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimilarityMetric::DotProduct => "dot_product",
            SimilarityMetric::Cosine => "cosine",
            SimilarityMetric::Euclidean => "euclidean",
        }
    }
}

impl fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimilarityMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dot_product" => Ok(SimilarityMetric::DotProduct),
            "cosine" => Ok(SimilarityMetric::Cosine),
            "euclidean" => Ok(SimilarityMetric::Euclidean),
            other => Err(format!("unknown similarity metric: {}", other)),
        }
    }
}

/// Collection layout chosen once at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionSpec {
    pub dimension: usize,
    pub metric: SimilarityMetric,
}

/// A chunk of source text and its embedding, as written by ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub text: String,
    pub vector: EmbeddingVector,
}

/// A stored chunk returned by a similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkSearchResult {
    pub id: Option<String>,
    pub text: String,
    /// Similarity reported by the store, when it reports one.
    pub score: Option<f32>,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    fn name(&self) -> &str;

    /// Create the backing collection with a fixed dimension and metric.
    async fn create_collection(&self, spec: CollectionSpec) -> Result<(), ApiError>;

    /// Insert one chunk; returns the id assigned by the store, if any.
    async fn insert(&self, chunk: DocumentChunk) -> Result<Option<String>, ApiError>;

    /// Up to `limit` chunks, closest first.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, ApiError>;
}
