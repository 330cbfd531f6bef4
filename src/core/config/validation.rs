use serde_json::{Map, Value};

use super::ConfigError;
use crate::rag::SimilarityMetric;

pub fn validate_config(config: &Value) -> Result<(), ConfigError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 1, 65535)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
    }

    if let Some(store) = expect_optional_object(root, "vector_store")? {
        for key in ["endpoint", "token", "namespace", "collection"] {
            validate_optional_string_field(store, &format!("vector_store.{}", key), key)?;
        }
        validate_u64_field(store, "vector_store.dimension", "dimension", 1, 8192)?;
        validate_u64_field(store, "vector_store.top_k", "top_k", 1, 1000)?;
        validate_metric_field(store, "vector_store.metric", "metric")?;
    }

    for provider in ["gemini", "openai"] {
        if let Some(section) = expect_optional_object(root, provider)? {
            for (key, value) in section {
                if !value.is_string() && !value.is_null() {
                    return Err(config_type_error(&format!("{}.{}", provider, key), "string"));
                }
            }
        }
    }

    if let Some(prompt) = expect_optional_object(root, "prompt")? {
        validate_optional_string_field(prompt, "prompt.persona", "persona")?;
        validate_u64_field(
            prompt,
            "prompt.max_context_tokens",
            "max_context_tokens",
            0,
            10_000_000,
        )?;
    }

    if let Some(ingest) = expect_optional_object(root, "ingest")? {
        validate_string_array_field(ingest, "ingest.sources", "sources")?;
        validate_u64_field(ingest, "ingest.chunk_size", "chunk_size", 1, 1_000_000)?;
        validate_u64_field(ingest, "ingest.chunk_overlap", "chunk_overlap", 0, 1_000_000)?;
        validate_u64_field(
            ingest,
            "ingest.fetch_timeout_secs",
            "fetch_timeout_secs",
            1,
            86_400,
        )?;

        let size = ingest.get("chunk_size").and_then(Value::as_u64);
        let overlap = ingest.get("chunk_overlap").and_then(Value::as_u64);
        if let (Some(size), Some(overlap)) = (size, overlap) {
            if overlap >= size {
                return Err(ConfigError::Invalid(format!(
                    "Invalid config at 'ingest.chunk_overlap': must be smaller than chunk_size ({})",
                    size
                )));
            }
        }
    }

    if let Some(logging) = expect_optional_object(root, "logging")? {
        validate_optional_string_field(logging, "logging.dir", "dir")?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ConfigError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(config_type_error(key, "object")),
    }
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ConfigError::Invalid(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_str().is_none() && !value.is_null() {
        return Err(config_type_error(path, "string"));
    }
    Ok(())
}

fn validate_metric_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if text.parse::<SimilarityMetric>().is_err() {
        return Err(ConfigError::Invalid(format!(
            "Invalid config at '{}': expected one of dot_product, cosine, euclidean",
            path
        )));
    }
    Ok(())
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "Invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ConfigError {
    ConfigError::Invalid(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_empty_and_partial_configs() {
        assert!(validate_config(&json!({})).is_ok());
        assert!(validate_config(&json!({
            "server": { "port": 8080 },
            "vector_store": { "metric": "cosine", "top_k": 5 }
        }))
        .is_ok());
    }

    #[test]
    fn rejects_out_of_range_port() {
        let err = validate_config(&json!({ "server": { "port": 70000 } })).unwrap_err();
        assert!(err.to_string().contains("server.port"));
    }

    #[test]
    fn rejects_unknown_metric() {
        let err =
            validate_config(&json!({ "vector_store": { "metric": "manhattan" } })).unwrap_err();
        assert!(err.to_string().contains("vector_store.metric"));
    }

    #[test]
    fn rejects_overlap_not_smaller_than_chunk_size() {
        let err = validate_config(&json!({
            "ingest": { "chunk_size": 100, "chunk_overlap": 100 }
        }))
        .unwrap_err();
        assert!(err.to_string().contains("chunk_overlap"));
    }

    #[test]
    fn rejects_non_string_sources() {
        let err = validate_config(&json!({ "ingest": { "sources": ["https://a", 3] } }))
            .unwrap_err();
        assert!(err.to_string().contains("ingest.sources[1]"));
    }
}
