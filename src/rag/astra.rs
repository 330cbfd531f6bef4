//! Astra DB Data API client.
//!
//! Every operation is a JSON command POSTed to either the keyspace
//! (`createCollection`) or the collection (`find`, `insertOne`). The API
//! reports command failures in-band: a 200 response whose body carries an
//! `errors` array is still a failure.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::store::{ChunkSearchResult, CollectionSpec, DocumentChunk, VectorStore};
use crate::core::config::VectorStoreConnection;
use crate::core::errors::ApiError;

const SERVICE: &str = "astra";
const API_PATH: &str = "api/json/v1";

#[derive(Clone)]
pub struct AstraStore {
    endpoint: String,
    token: String,
    namespace: String,
    collection: String,
    client: Client,
}

impl AstraStore {
    pub fn new(connection: &VectorStoreConnection) -> Self {
        Self {
            endpoint: connection.endpoint.trim_end_matches('/').to_string(),
            token: connection.token.clone(),
            namespace: connection.namespace.clone(),
            collection: connection.collection.clone(),
            client: Client::new(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn keyspace_url(&self) -> String {
        format!("{}/{}/{}", self.endpoint, API_PATH, self.namespace)
    }

    fn collection_url(&self) -> String {
        format!("{}/{}", self.keyspace_url(), self.collection)
    }

    async fn command(&self, url: &str, body: Value) -> Result<Value, ApiError> {
        let res = self
            .client
            .post(url)
            .header("Token", &self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::upstream(SERVICE, e))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::upstream(
                SERVICE,
                format!("Astra request failed ({}): {}", status, text.trim()),
            ));
        }

        let payload: Value = res.json().await.map_err(|e| ApiError::upstream(SERVICE, e))?;
        check_command_errors(&payload)?;
        Ok(payload)
    }
}

#[async_trait]
impl VectorStore for AstraStore {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn create_collection(&self, spec: CollectionSpec) -> Result<(), ApiError> {
        let body = create_collection_command(&self.collection, spec);
        let payload = self.command(&self.keyspace_url(), body).await?;
        let status = command_status(&payload);
        tracing::info!(
            "Collection '{}' ready (dimension {}, metric {}): {}",
            self.collection,
            spec.dimension,
            spec.metric,
            status
        );
        Ok(())
    }

    async fn insert(&self, chunk: DocumentChunk) -> Result<Option<String>, ApiError> {
        let body = json!({
            "insertOne": {
                "document": {
                    "$vector": chunk.vector,
                    "text": chunk.text,
                }
            }
        });
        let payload = self.command(&self.collection_url(), body).await?;
        Ok(payload["status"]["insertedIds"]
            .get(0)
            .map(id_to_string))
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, ApiError> {
        let body = find_command(query_embedding, limit);
        let payload = self.command(&self.collection_url(), body).await?;
        Ok(parse_documents(&payload))
    }
}

fn create_collection_command(name: &str, spec: CollectionSpec) -> Value {
    json!({
        "createCollection": {
            "name": name,
            "options": {
                "vector": {
                    "dimension": spec.dimension,
                    "metric": spec.metric.as_str(),
                }
            }
        }
    })
}

fn find_command(query_embedding: &[f32], limit: usize) -> Value {
    json!({
        "find": {
            "sort": { "$vector": query_embedding },
            "options": { "limit": limit, "includeSimilarity": true }
        }
    })
}

/// The `status` object of a command response, `null` when absent.
fn command_status(payload: &Value) -> Value {
    payload.get("status").cloned().unwrap_or_default()
}

fn check_command_errors(payload: &Value) -> Result<(), ApiError> {
    let Some(errors) = payload.get("errors").and_then(Value::as_array) else {
        return Ok(());
    };
    if errors.is_empty() {
        return Ok(());
    }
    let message = errors
        .iter()
        .map(|e| {
            e.get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| e.to_string())
        })
        .collect::<Vec<_>>()
        .join("; ");
    Err(ApiError::upstream(SERVICE, message))
}

/// Documents from a `find` response, in the order the store ranked them.
fn parse_documents(payload: &Value) -> Vec<ChunkSearchResult> {
    let Some(documents) = payload["data"]["documents"].as_array() else {
        return Vec::new();
    };

    documents
        .iter()
        .filter_map(|doc| {
            let Some(text) = doc.get("text").and_then(Value::as_str) else {
                tracing::debug!("Skipping stored document without a text field");
                return None;
            };
            Some(ChunkSearchResult {
                id: doc.get("_id").map(id_to_string),
                text: text.to_string(),
                score: doc
                    .get("$similarity")
                    .and_then(Value::as_f64)
                    .map(|s| s as f32),
            })
        })
        .collect()
}

fn id_to_string(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::store::SimilarityMetric;

    fn store() -> AstraStore {
        AstraStore::new(&VectorStoreConnection {
            endpoint: "https://db-id-us-east1.apps.astra.datastax.com/".into(),
            token: "AstraCS:test".into(),
            namespace: "default_keyspace".into(),
            collection: "f1gpt".into(),
        })
    }

    #[test]
    fn urls_follow_data_api_layout() {
        let store = store();
        assert_eq!(
            store.keyspace_url(),
            "https://db-id-us-east1.apps.astra.datastax.com/api/json/v1/default_keyspace"
        );
        assert_eq!(
            store.collection_url(),
            "https://db-id-us-east1.apps.astra.datastax.com/api/json/v1/default_keyspace/f1gpt"
        );
    }

    #[test]
    fn find_command_sorts_by_vector_with_limit() {
        let body = find_command(&[0.5, 1.0], 10);
        assert_eq!(body["find"]["sort"]["$vector"], json!([0.5, 1.0]));
        assert_eq!(body["find"]["options"]["limit"], 10);
    }

    #[test]
    fn create_collection_command_carries_dimension_and_metric() {
        let body = create_collection_command(
            "f1gpt",
            CollectionSpec {
                dimension: 768,
                metric: SimilarityMetric::DotProduct,
            },
        );
        assert_eq!(
            body,
            json!({
                "createCollection": {
                    "name": "f1gpt",
                    "options": { "vector": { "dimension": 768, "metric": "dot_product" } }
                }
            })
        );
    }

    #[test]
    fn parse_documents_keeps_rank_order_and_skips_textless() {
        let payload = json!({
            "data": {
                "documents": [
                    { "_id": "a", "text": "chunk A text", "$similarity": 0.91 },
                    { "_id": "b" },
                    { "_id": { "$uuid": "c" }, "text": "chunk B text" }
                ],
                "nextPageState": null
            }
        });

        let docs = parse_documents(&payload);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].text, "chunk A text");
        assert_eq!(docs[0].id.as_deref(), Some("a"));
        assert!((docs[0].score.unwrap() - 0.91).abs() < 1e-6);
        assert_eq!(docs[1].text, "chunk B text");
        assert_eq!(docs[1].score, None);
        assert_eq!(docs[1].id.as_deref(), Some(r#"{"$uuid":"c"}"#));
    }

    #[test]
    fn in_band_errors_are_failures() {
        let payload = json!({
            "errors": [
                { "message": "Collection does not exist", "errorCode": "COLLECTION_NOT_EXIST" },
                { "errorCode": "X" }
            ]
        });
        let err = check_command_errors(&payload).unwrap_err();
        assert_eq!(
            err.client_message(),
            r#"Collection does not exist; {"errorCode":"X"}"#
        );
        assert!(check_command_errors(&json!({ "errors": [] })).is_ok());
        assert!(check_command_errors(&json!({ "status": { "ok": 1 } })).is_ok());
    }

    #[test]
    fn command_status_defaults_to_null() {
        let payload = json!({ "status": { "ok": 1 } });
        assert_eq!(command_status(&payload), json!({ "ok": 1 }));
        assert_eq!(command_status(&json!({})), Value::Null);
    }

    #[test]
    fn missing_documents_yield_empty_result() {
        assert!(parse_documents(&json!({ "data": {} })).is_empty());
    }
}
