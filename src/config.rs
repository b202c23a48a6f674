use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StudyError;

pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

fn default_model() -> String {
    "gemini-pro-latest".to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub window: WindowConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeminiConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Only used when `GEMINI_API_KEY` is not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub min_width: u32,
    pub min_height: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            gemini: GeminiConfig::default(),
            window: WindowConfig::default(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            model: default_model(),
            base_url: default_base_url(),
            api_key: None,
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            width: 1000,
            height: 900,
            min_width: 600,
            min_height: 400,
        }
    }
}

impl Config {
    pub fn load() -> Self {
        Self::load_or_default(&Self::get_config_path())
    }

    /// Reads `path` when it exists. Never creates anything on disk.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            match Self::load_from(path) {
                Ok(config) => return config,
                Err(e) => tracing::warn!("{:#}. Using defaults.", e),
            }
        }

        Config::default()
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Error reading {}", path.display()))?;
        let config = toml::from_str(&contents)
            .with_context(|| format!("Error parsing {}", path.display()))?;
        Ok(config)
    }

    pub fn get_config_path() -> PathBuf {
        Self::get_config_dir().join("config.toml")
    }

    pub fn get_config_dir() -> PathBuf {
        if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home).join(".config/study-buddy")
        } else {
            PathBuf::from(".")
        }
    }

    /// Pulls `key.env` and `.env` from the working directory into the
    /// process environment. Variables that are already set are kept.
    pub fn load_env_files() {
        for name in ["key.env", ".env"] {
            match dotenv::from_filename(name) {
                Ok(path) => tracing::debug!("loaded environment from {}", path.display()),
                Err(e) if e.not_found() => {}
                Err(e) => tracing::warn!("could not load {}: {}", name, e),
            }
        }
    }

    pub fn api_key(&self) -> Result<String, StudyError> {
        resolve_api_key(std::env::var(API_KEY_VAR).ok(), self.gemini.api_key.as_deref())
    }
}

fn resolve_api_key(
    from_env: Option<String>,
    from_file: Option<&str>,
) -> Result<String, StudyError> {
    from_env
        .filter(|key| !key.trim().is_empty())
        .or_else(|| {
            from_file
                .filter(|key| !key.trim().is_empty())
                .map(str::to_string)
        })
        .map(|key| key.trim().to_string())
        .ok_or_else(|| {
            StudyError::Configuration(format!(
                "{} not found. Please set it in a .env file or as an environment variable.",
                API_KEY_VAR
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.gemini.model, "gemini-pro-latest");
        assert_eq!(config.gemini.base_url, "https://generativelanguage.googleapis.com");
        assert!(config.gemini.api_key.is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[gemini]\nmodel = \"gemini-1.5-flash\"").unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.gemini.model, "gemini-1.5-flash");
        assert_eq!(config.gemini.base_url, default_base_url());
        assert_eq!(config.window.width, 1000);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[gemini\nmodel = ").unwrap();

        let err = Config::load_from(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("Error parsing"));
    }

    #[test]
    fn test_missing_file_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("study-buddy").join("config.toml");

        let config = Config::load_or_default(&path);

        assert_eq!(config.gemini.model, "gemini-pro-latest");
        assert!(!path.parent().unwrap().exists());
    }

    #[test]
    fn test_env_key_wins_over_file() {
        let key = resolve_api_key(Some("env-key".to_string()), Some("file-key")).unwrap();
        assert_eq!(key, "env-key");
    }

    #[test]
    fn test_file_key_used_when_env_blank() {
        let key = resolve_api_key(Some("   ".to_string()), Some(" file-key ")).unwrap();
        assert_eq!(key, "file-key");
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let err = resolve_api_key(None, None).unwrap_err();
        assert!(matches!(err, StudyError::Configuration(_)));
        assert!(err.to_string().contains("GEMINI_API_KEY not found"));

        let err = resolve_api_key(None, Some("")).unwrap_err();
        assert!(matches!(err, StudyError::Configuration(_)));
    }
}
