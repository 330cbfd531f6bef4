//! Normalization of embedding service responses.
//!
//! Embedding endpoints do not agree on a response layout, and some change
//! it between versions. Every observed layout is one variant of
//! [`EmbeddingPayload`], each with a single flattening rule. Anything else
//! falls into `Other` and flattens to an empty vector.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use super::types::EmbeddingVector;

/// Response fields that may hold the embedding, in lookup order.
const ENVELOPE_FIELDS: [&str; 3] = ["embeddings", "embedding", "data"];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum EmbeddingPayload {
    /// `[0.1, 0.2, ...]`
    Flat(Vec<f32>),
    /// `[[0.1, 0.2, ...], ...]`
    Nested(Vec<Vec<f32>>),
    /// `[{"values" | "embedding" | "vector": [...]}, ...]`
    Wrapped(Vec<EmbeddingWrapper>),
    /// `{"k": [...] | 0.1, ...}`
    Keyed(BTreeMap<String, KeyedValues>),
    Other(Value),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EmbeddingWrapper {
    values: Option<Vec<f32>>,
    embedding: Option<Vec<f32>>,
    vector: Option<Vec<f32>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum KeyedValues {
    Scalar(f32),
    Series(Vec<f32>),
}

impl EmbeddingPayload {
    /// Classifies a raw value without looking for an envelope field.
    pub fn classify(value: &Value) -> Self {
        EmbeddingPayload::deserialize(value).unwrap_or_else(|_| Self::Other(value.clone()))
    }

    /// Classifies a full response body, unwrapping the first envelope field present.
    pub fn from_response(body: &Value) -> Self {
        let inner = ENVELOPE_FIELDS
            .iter()
            .find_map(|field| body.get(*field))
            .unwrap_or(body);
        Self::classify(inner)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Flat(_) => "flat",
            Self::Nested(_) => "nested",
            Self::Wrapped(_) => "wrapped",
            Self::Keyed(_) => "keyed",
            Self::Other(_) => "unrecognized",
        }
    }

    pub fn into_vector(self) -> EmbeddingVector {
        match self {
            Self::Flat(values) => values,
            Self::Nested(rows) => rows.into_iter().next().unwrap_or_default(),
            Self::Wrapped(items) => items
                .into_iter()
                .next()
                .and_then(|w| w.values.or(w.embedding).or(w.vector))
                .unwrap_or_default(),
            Self::Keyed(entries) => entries
                .into_values()
                .flat_map(|entry| match entry {
                    KeyedValues::Scalar(v) => vec![v],
                    KeyedValues::Series(vs) => vs,
                })
                .collect(),
            Self::Other(_) => Vec::new(),
        }
    }
}

/// Flattens an embedding response body into a single vector.
pub fn normalize_embedding(body: &Value) -> EmbeddingVector {
    let payload = EmbeddingPayload::from_response(body);
    let kind = payload.kind();
    let vector = payload.into_vector();
    if vector.is_empty() {
        tracing::warn!("Embedding response ({} shape) normalized to an empty vector", kind);
    }
    vector
}
