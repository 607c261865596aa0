// Configuration Storage Service
// Handles config file read/write and version backup

use crate::services::detection::DetectorConfig;
use crate::services::detection::recognizer::DEFAULT_RECOGNIZER_LABELS;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub detection: DetectorConfig,
    #[serde(default)]
    pub recognizer: RecognizerConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub word_lists: WordListConfig,
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
    #[serde(default)]
    pub api_keys: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    pub enabled: bool,
    pub http: Option<String>,
    pub https: Option<String>,
}

impl ProxyConfig {
    /// Proxy URL to hand to the HTTP client, if any
    pub fn active_url(&self) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        self.https.as_deref().or(self.http.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognizerConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_recognizer_threshold")]
    pub threshold: f64,
    #[serde(default = "default_recognizer_labels")]
    pub labels: Vec<String>,
    #[serde(default = "default_recognizer_timeout")]
    pub timeout_secs: u64,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            threshold: default_recognizer_threshold(),
            labels: default_recognizer_labels(),
            timeout_secs: default_recognizer_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierConfig {
    /// `None` enables the classifier whenever an API key can be resolved
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default = "default_classifier_model")]
    pub model: String,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_secs: u64,
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            enabled: None,
            model: default_classifier_model(),
            max_length: default_max_length(),
            max_retries: default_max_retries(),
            retry_backoff_secs: default_retry_backoff(),
            endpoint: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WordListConfig {
    pub first_names: Option<PathBuf>,
    pub surnames: Option<PathBuf>,
}

fn default_recognizer_threshold() -> f64 { 0.5 }
fn default_recognizer_labels() -> Vec<String> {
    DEFAULT_RECOGNIZER_LABELS.iter().map(|s| s.to_string()).collect()
}
fn default_recognizer_timeout() -> u64 { 30 }
fn default_classifier_model() -> String { "gemini-2.0-flash".to_string() }
fn default_max_length() -> usize { 3000 }
fn default_max_retries() -> u32 { 3 }
fn default_retry_backoff() -> u64 { 60 }

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_dir, config_file }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("dadoscan"))
    }

    /// Store rooted at the default directory, if the platform has one
    pub fn open_default() -> Option<Self> {
        Self::default_config_dir().map(Self::new)
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Ensure config directory exists
    pub fn ensure_dir(&self) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.config_dir).map_err(|e| ConfigError::io(&self.config_dir, e))
    }

    /// Load configuration from file
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        if !self.config_file.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file)
            .map_err(|e| ConfigError::io(&self.config_file, e))?;

        serde_json::from_str(&content).map_err(|e| ConfigError::json(&self.config_file, e))
    }

    /// Save configuration to file
    pub fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        self.ensure_dir()?;

        if self.config_file.exists() {
            self.create_backup()?;
        }

        let content = serde_json::to_string_pretty(config)
            .map_err(|e| ConfigError::json(&self.config_file, e))?;

        fs::write(&self.config_file, content).map_err(|e| ConfigError::io(&self.config_file, e))
    }

    fn create_backup(&self) -> Result<(), ConfigError> {
        let backup_dir = self.config_dir.join("backups");
        fs::create_dir_all(&backup_dir).map_err(|e| ConfigError::io(&backup_dir, e))?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S%3f");
        let backup_file = backup_dir.join(format!("config_{}.json", timestamp));

        fs::copy(&self.config_file, &backup_file).map_err(|e| ConfigError::io(&backup_file, e))?;

        self.cleanup_old_backups(&backup_dir, 10)
    }

    /// Remove old backups, keeping only the most recent N
    fn cleanup_old_backups(&self, backup_dir: &Path, keep: usize) -> Result<(), ConfigError> {
        let mut entries: Vec<_> = fs::read_dir(backup_dir)
            .map_err(|e| ConfigError::io(backup_dir, e))?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
            .collect();

        if entries.len() <= keep {
            return Ok(());
        }

        // Timestamped names sort chronologically
        entries.sort_by_key(|e| e.file_name());

        let remove_count = entries.len() - keep;
        for entry in entries.iter().take(remove_count) {
            let _ = fs::remove_file(entry.path());
        }

        Ok(())
    }

    /// Get provider API key from config file
    pub fn get_api_key(&self, provider: &str) -> Result<Option<String>, ConfigError> {
        let config = self.load()?;
        Ok(config.api_keys.get(provider).cloned())
    }

    /// Store provider API key in config file
    pub fn set_api_key(&self, provider: &str, key: &str) -> Result<(), ConfigError> {
        let mut config = self.load()?;
        config.api_keys.insert(provider.to_string(), key.to_string());
        self.save(&config)
    }

    /// Delete provider API key from config file
    pub fn delete_api_key(&self, provider: &str) -> Result<(), ConfigError> {
        let mut config = self.load()?;
        config.api_keys.remove(provider);
        self.save(&config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DetectorKind;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.detection.threshold(DetectorKind::Cpf), 0.80);
        assert_eq!(config.detection.enabled_detectors.len(), 9);
        assert!(!config.recognizer.enabled);
        assert_eq!(config.classifier.model, "gemini-2.0-flash");
        assert_eq!(config.classifier.max_length, 3000);
    }

    #[test]
    fn test_empty_json_is_default() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.recognizer.threshold, 0.5);
        assert_eq!(config.classifier.max_retries, 3);
        assert!(config.classifier.enabled.is_none());
        assert!(!config.recognizer.labels.is_empty());
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("nested"));
        let config = store.load().unwrap();
        assert!(config.api_keys.is_empty());
    }

    #[test]
    fn test_save_load_and_backup() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().to_path_buf());

        let mut config = AppConfig {
            version: "1.0.0".to_string(),
            ..AppConfig::default()
        };
        store.save(&config).unwrap();
        config.detection = config.detection.with_threshold(DetectorKind::Email, 0.6);
        store.save(&config).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.version, "1.0.0");
        assert_eq!(loaded.detection.threshold(DetectorKind::Email), 0.6);

        let backups = fs::read_dir(dir.path().join("backups")).unwrap().count();
        assert_eq!(backups, 1);
    }

    #[test]
    fn test_api_key_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().to_path_buf());
        store.set_api_key("gemini", "abc").unwrap();
        assert_eq!(store.get_api_key("gemini").unwrap().as_deref(), Some("abc"));
        store.delete_api_key("gemini").unwrap();
        assert!(store.get_api_key("gemini").unwrap().is_none());
    }

    #[test]
    fn test_malformed_file_is_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().to_path_buf());
        fs::write(store.config_file(), "{not json").unwrap();
        assert!(matches!(store.load(), Err(ConfigError::Json { .. })));
    }

    #[test]
    fn test_proxy_active_url() {
        let proxy = ProxyConfig {
            enabled: true,
            http: Some("http://proxy:8080".to_string()),
            https: None,
        };
        assert_eq!(proxy.active_url(), Some("http://proxy:8080"));
        let off = ProxyConfig { enabled: false, ..proxy };
        assert!(off.active_url().is_none());
    }
}
