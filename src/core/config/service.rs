use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::settings::Settings;
use super::validation::validate_config;
use crate::core::errors::ConfigError;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 10] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "token_",
    "credential",
    "private_key",
    "access_key",
    "access_token",
    "bearer",
];

const SENSITIVE_WHITELIST: [&str; 4] = ["max_tokens", "max_new_tokens", "tokenizer", "tokens"];

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("RAGBOT_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.secrets_path.clone()
    }

    /// Public config deep-merged with the secrets file.
    pub fn load_config(&self) -> Value {
        let public_config = load_yaml_file(&self.config_path());
        let secrets_config = load_yaml_file(&self.secrets_path());
        deep_merge(&public_config, &secrets_config)
    }

    /// Validates the merged config and resolves it into typed settings,
    /// applying process environment overrides.
    pub fn load_settings(&self) -> Result<Settings, ConfigError> {
        let config = self.load_config();
        validate_config(&config)?;
        Settings::from_config(&config, |key| env::var(key).ok())
    }

    pub fn redact_sensitive_values(&self, value: &Value) -> Value {
        redact_sensitive_values(value)
    }
}

fn load_yaml_file(path: &Path) -> Value {
    if !path.exists() {
        return Value::Object(Map::new());
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<Value>(&contents) {
            Ok(value @ Value::Object(_)) => value,
            Ok(_) => Value::Object(Map::new()),
            Err(err) => {
                tracing::warn!("Ignoring unparsable config {}: {}", path.display(), err);
                Value::Object(Map::new())
            }
        },
        Err(err) => {
            tracing::warn!("Failed to read config {}: {}", path.display(), err);
            Value::Object(Map::new())
        }
    }
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, val) in map {
                if is_sensitive_key(key) && !val.is_null() {
                    redacted.insert(key.clone(), Value::String(REDACT_PLACEHOLDER.to_string()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_values(val));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();
    if SENSITIVE_WHITELIST
        .iter()
        .any(|allowed| *allowed == key_lower)
    {
        return false;
    }
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| key_lower.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deep_merge_merges_objects_and_overrides_scalars() {
        let base = json!({
            "llm": { "model": "google/flan-t5-base", "temperature": 0.1 },
            "server": { "port": 5000 },
            "origins": ["a", "b"]
        });
        let secrets = json!({
            "llm": { "api_key": "hf_secret" },
            "origins": ["c"]
        });

        let merged = deep_merge(&base, &secrets);

        assert_eq!(
            merged,
            json!({
                "llm": { "model": "google/flan-t5-base", "temperature": 0.1, "api_key": "hf_secret" },
                "server": { "port": 5000 },
                "origins": ["c"]
            })
        );
    }

    #[test]
    fn redact_sensitive_values_replaces_secrets_only() {
        let input = json!({
            "llm": { "api_key": "hf_secret", "max_new_tokens": 512 },
            "embeddings": { "api_key": null },
            "items": [ { "access_token": "x" } ]
        });

        let redacted = redact_sensitive_values(&input);

        assert_eq!(
            redacted,
            json!({
                "llm": { "api_key": "****", "max_new_tokens": 512 },
                "embeddings": { "api_key": null },
                "items": [ { "access_token": "****" } ]
            })
        );
    }

    #[test]
    fn load_config_merges_files_from_data_dir() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let paths = Arc::new(AppPaths::with_data_dir(
            tmp.path().join("project"),
            tmp.path().to_path_buf(),
        ));
        fs::write(
            tmp.path().join("config.yml"),
            "retrieval:\n  top_k: 6\nllm:\n  temperature: 0.3\n",
        )
        .expect("write config");
        fs::write(&paths.secrets_path, "llm:\n  api_key: hf_file\n").expect("write secrets");

        let service = ConfigService::new(paths);
        let config = service.load_config();

        assert_eq!(config["retrieval"]["top_k"], json!(6));
        assert_eq!(config["llm"]["api_key"], json!("hf_file"));
        assert_eq!(config["llm"]["temperature"], json!(0.3));
    }

    #[test]
    fn unparsable_yaml_counts_as_empty() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("broken.yml");
        fs::write(&path, "llm: [unterminated").expect("write");

        assert_eq!(load_yaml_file(&path), json!({}));
        assert_eq!(load_yaml_file(&tmp.path().join("missing.yml")), json!({}));
    }
}
