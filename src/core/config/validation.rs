use serde_json::{Map, Value};

use crate::core::errors::ConfigError;

const PROVIDERS: [&str; 6] = [
    "huggingface",
    "hf",
    "hugging_face",
    "openai",
    "openai_compatible",
    "lmstudio",
];
const DISTANCES: [&str; 3] = ["euclidean", "l2", "cosine"];

pub fn validate_config(config: &Value) -> Result<(), ConfigError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 0, 65_535)?;
        validate_optional_string_field(server, "server.upload_dir", "upload_dir")?;
        validate_u64_field(
            server,
            "server.max_upload_bytes",
            "max_upload_bytes",
            1024,
            4 * 1024 * 1024 * 1024,
        )?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
    }

    if let Some(ingest) = expect_optional_object(root, "ingest")? {
        validate_u64_field(ingest, "ingest.chunk_size", "chunk_size", 1, 1_000_000)?;
        validate_u64_field(
            ingest,
            "ingest.chunk_overlap",
            "chunk_overlap",
            0,
            1_000_000,
        )?;
        validate_u64_field(
            ingest,
            "ingest.embed_batch_size",
            "embed_batch_size",
            1,
            4096,
        )?;

        let size = ingest.get("chunk_size").and_then(Value::as_u64).unwrap_or(1000);
        let overlap = ingest
            .get("chunk_overlap")
            .and_then(Value::as_u64)
            .unwrap_or(200);
        if overlap >= size {
            return Err(ConfigError::Invalid {
                path: "ingest.chunk_overlap".to_string(),
                message: format!("must be smaller than chunk_size ({})", size),
            });
        }
    }

    if let Some(retrieval) = expect_optional_object(root, "retrieval")? {
        validate_u64_field(retrieval, "retrieval.top_k", "top_k", 1, 1000)?;
        validate_enum_field(retrieval, "retrieval.distance", "distance", &DISTANCES)?;
    }

    if let Some(embeddings) = expect_optional_object(root, "embeddings")? {
        validate_enum_field(embeddings, "embeddings.provider", "provider", &PROVIDERS)?;
        validate_optional_string_field(embeddings, "embeddings.model", "model")?;
        validate_optional_string_field(embeddings, "embeddings.base_url", "base_url")?;
        validate_optional_string_field(embeddings, "embeddings.api_key", "api_key")?;
        validate_u64_field(
            embeddings,
            "embeddings.timeout_secs",
            "timeout_secs",
            1,
            3_600,
        )?;
    }

    if let Some(llm) = expect_optional_object(root, "llm")? {
        validate_enum_field(llm, "llm.provider", "provider", &PROVIDERS)?;
        validate_optional_string_field(llm, "llm.model", "model")?;
        validate_optional_string_field(llm, "llm.repo_id", "repo_id")?;
        validate_optional_string_field(llm, "llm.task", "task")?;
        validate_optional_string_field(llm, "llm.base_url", "base_url")?;
        validate_optional_string_field(llm, "llm.api_key", "api_key")?;
        validate_f64_field(llm, "llm.temperature", "temperature", 0.0, 2.0)?;
        validate_u64_field(llm, "llm.max_new_tokens", "max_new_tokens", 1, 32_768)?;
        validate_u64_field(llm, "llm.timeout_secs", "timeout_secs", 1, 3_600)?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ConfigError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
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
        return Err(range_error(path, min, max));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if number < min || number > max {
        return Err(range_error(path, min, max));
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
    if value.is_null() || value.as_str().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "string"))
}

fn validate_enum_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    allowed: &[&str],
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if allowed.contains(&text) {
        return Ok(());
    }
    Err(ConfigError::Invalid {
        path: path.to_string(),
        message: format!("'{}' is not one of {}", text, allowed.join(", ")),
    })
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
        let item_path = format!("{}[{}]", path, index);
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&item_path, "string"));
        };
        if text.trim().is_empty() {
            return Err(ConfigError::Invalid {
                path: item_path,
                message: "value cannot be empty".to_string(),
            });
        }
    }
    Ok(())
}

fn range_error<T: std::fmt::Display>(path: &str, min: T, max: T) -> ConfigError {
    ConfigError::Invalid {
        path: path.to_string(),
        message: format!("must be between {} and {}", min, max),
    }
}

fn config_type_error(path: &str, expected: &str) -> ConfigError {
    ConfigError::Invalid {
        path: path.to_string(),
        message: format!("expected {}", expected),
    }
}
