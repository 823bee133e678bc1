//! Application configuration with named defaults.
//!
//! An optional `dream_journal.json` next to the binary overrides the
//! defaults; a missing or malformed file falls back to them.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The single storage slot holding the serialized entry collection.
    pub storage_path: PathBuf,
    pub service: ServiceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL of a chat-completions style endpoint.
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage_path: PathBuf::from("journal_entries.json"),
            service: ServiceConfig::default(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            base_url: "http://localhost:11434/v1".to_string(),
            model: "llama3".to_string(),
            timeout_secs: 60,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(error = %e, "invalid config file, using defaults");
                    Config::default()
                }
            },
            Err(_) => Config::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config: Config = serde_json::from_str(r#"{"storage_path": "custom.json"}"#).unwrap();
        assert_eq!(config.storage_path, PathBuf::from("custom.json"));
        assert_eq!(config.service.timeout_secs, 60);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = Config::load(Path::new("definitely/not/here.json"));
        assert_eq!(config.storage_path, PathBuf::from("journal_entries.json"));
    }
}
