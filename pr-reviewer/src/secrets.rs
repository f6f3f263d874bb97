//! Secret retrieval boundary.
//!
//! Secrets are resolved before any network call so a missing credential is a
//! configuration error, not a mid-pipeline failure. Enum dispatch, no trait
//! objects.

use std::path::PathBuf;

use crate::errors::ConfigError;

/// Where secrets come from.
#[derive(Debug, Clone)]
pub enum SecretStore {
    /// Read from the process environment; key `github_token` maps to
    /// `GITHUB_TOKEN` and so on.
    Env,
    /// Read from a local JSON object file (`{"github_token": "...", ...}`),
    /// the local-development mode.
    JsonFile(PathBuf),
}

impl SecretStore {
    /// Resolves one secret by its canonical lower-case key.
    pub fn get(&self, key: &str) -> Result<String, ConfigError> {
        match self {
            SecretStore::Env => {
                let var = key.to_uppercase();
                std::env::var(&var)
                    .ok()
                    .filter(|v| !v.is_empty())
                    .ok_or_else(|| ConfigError::MissingSecret(var))
            }
            SecretStore::JsonFile(path) => {
                let text =
                    std::fs::read_to_string(path).map_err(|e| ConfigError::SecretsFile {
                        path: path.display().to_string(),
                        reason: e.to_string(),
                    })?;
                let value: serde_json::Value =
                    serde_json::from_str(&text).map_err(|e| ConfigError::SecretsFile {
                        path: path.display().to_string(),
                        reason: e.to_string(),
                    })?;
                value
                    .get(key)
                    .and_then(|v| v.as_str())
                    .filter(|v| !v.is_empty())
                    .map(|v| v.to_string())
                    .ok_or_else(|| ConfigError::MissingSecret(key.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_env_secret_is_a_config_error() {
        let err = SecretStore::Env.get("auto_lgtm_definitely_unset").unwrap_err();
        assert!(matches!(err, ConfigError::MissingSecret(_)));
    }

    #[test]
    fn json_file_store_reads_keys() {
        let dir = std::env::temp_dir().join("auto-lgtm-secrets-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("secrets.json");
        std::fs::write(&path, r#"{"github_token":"tok","gemini_api_key":"key"}"#).unwrap();

        let store = SecretStore::JsonFile(path.clone());
        assert_eq!(store.get("github_token").unwrap(), "tok");
        assert!(matches!(
            store.get("absent").unwrap_err(),
            ConfigError::MissingSecret(_)
        ));
        std::fs::remove_file(path).ok();
    }
}
