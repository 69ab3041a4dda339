//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con le sezioni `compress`, `timeout`, `logger`, `smtp`
//! - Caricamento da file JSON (una sola volta, all'avvio)
//! - Validazione dei parametri e valori di default sensati
//!
//! ## Esempio file:
//! ```json
//! {
//!   "compress": {
//!     "img_path": "/mnt/photos",
//!     "image_formats": [".jpg", ".jpeg", ".png"],
//!     "ignore_directories": ["archive"],
//!     "postfix": "_compressed",
//!     "quality": 20,
//!     "creation_days": 0
//!   },
//!   "timeout": { "connection_timeout": 5, "execution_timeout": 30 }
//! }
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Full application configuration, immutable after start-up
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub compress: CompressSettings,
    pub timeout: TimeoutSettings,
    pub logger: LoggerSettings,
    pub smtp: SmtpSettings,
}

/// What to compress and how
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressSettings {
    /// Root of the walk
    pub img_path: PathBuf,
    /// Recognized extensions, matched as lowercase suffixes
    pub image_formats: Vec<String>,
    /// Directory names never entered
    pub ignore_directories: BTreeSet<String>,
    /// Marker inserted before the extension of compressed files
    pub postfix: String,
    /// Encoder quality (0-100)
    pub quality: u8,
    /// Minimum age in days (0 = no filter)
    pub creation_days: u64,
    /// Vanished entries tolerated before the walk aborts (0 = unlimited)
    pub max_warnings: usize,
}

impl Default for CompressSettings {
    fn default() -> Self {
        Self {
            img_path: PathBuf::new(),
            image_formats: vec![".jpg".to_string(), ".jpeg".to_string(), ".png".to_string()],
            ignore_directories: BTreeSet::new(),
            postfix: "_compressed".to_string(),
            quality: 20,
            creation_days: 0,
            max_warnings: 0,
        }
    }
}

/// Bounded waits, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSettings {
    pub connection_timeout: f64,
    pub execution_timeout: f64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            connection_timeout: 5.0,
            execution_timeout: 30.0,
        }
    }
}

impl TimeoutSettings {
    /// Saturates to `Duration::MAX` for values `validate` would reject
    pub fn connection(&self) -> Duration {
        Duration::try_from_secs_f64(self.connection_timeout).unwrap_or(Duration::MAX)
    }

    pub fn execution(&self) -> Duration {
        Duration::try_from_secs_f64(self.execution_timeout).unwrap_or(Duration::MAX)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerSettings {
    pub log_dir: PathBuf,
    pub log_name: String,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            log_name: "compress".to_string(),
        }
    }
}

impl LoggerSettings {
    /// Main log file (everything from DEBUG up)
    pub fn main_log(&self) -> PathBuf {
        self.log_dir.join(format!("{}.log", self.log_name))
    }

    /// Error-only log file
    pub fn error_log(&self) -> PathBuf {
        self.log_dir.join(format!("{}_error.log", self.log_name))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpSettings {
    pub enable: bool,
    pub from_email: String,
    pub to_email: Vec<String>,
    pub smtp_address: String,
    pub smtp_port: u16,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            enable: false,
            from_email: String::new(),
            to_email: Vec::new(),
            smtp_address: "localhost".to_string(),
            smtp_port: 25,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.compress.postfix.is_empty() {
            return Err(anyhow::anyhow!("Postfix must not be empty"));
        }

        if self.compress.quality > 100 {
            return Err(anyhow::anyhow!("Quality must be between 0 and 100"));
        }

        if self.compress.image_formats.iter().all(|ext| ext.trim_start_matches('.').is_empty()) {
            return Err(anyhow::anyhow!("At least one image format must be configured"));
        }

        for (name, secs) in [
            ("connection_timeout", self.timeout.connection_timeout),
            ("execution_timeout", self.timeout.execution_timeout),
        ] {
            if Duration::try_from_secs_f64(secs).is_err() {
                return Err(anyhow::anyhow!("{} must be a non-negative number of seconds", name));
            }
        }

        if self.smtp.enable && (self.smtp.from_email.is_empty() || self.smtp.to_email.is_empty()) {
            return Err(anyhow::anyhow!("SMTP is enabled but sender or recipients are missing"));
        }

        Ok(())
    }

    /// Lowercase the configured extensions and make sure each carries a leading dot
    pub fn normalize(&mut self) {
        let mut formats: Vec<String> = Vec::new();
        for ext in &self.compress.image_formats {
            let ext = ext.trim().to_lowercase();
            let ext = ext.trim_start_matches('.');
            if ext.is_empty() {
                continue;
            }
            let ext = format!(".{}", ext);
            if !formats.contains(&ext) {
                formats.push(ext);
            }
        }
        self.compress.image_formats = formats;
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| anyhow::anyhow!("Cannot read config file {}: {}", path.display(), e))?;
        let mut config: Config = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config file {}: {}", path.display(), e))?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.compress.postfix, "_compressed");
        assert_eq!(config.compress.quality, 20);
        assert_eq!(config.compress.creation_days, 0);
        assert_eq!(config.timeout.connection(), Duration::from_secs(5));
        assert_eq!(config.timeout.execution(), Duration::from_secs(30));
        assert!(!config.smtp.enable);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.compress.quality = 101;
        assert!(config.validate().is_err());

        config.compress.quality = 0;
        assert!(config.validate().is_ok());

        config.compress.postfix.clear();
        assert!(config.validate().is_err());

        config.compress.postfix = "_c".to_string();
        config.timeout.connection_timeout = -1.0;
        assert!(config.validate().is_err());

        config.timeout.connection_timeout = f64::NAN;
        assert!(config.validate().is_err());

        config.timeout.connection_timeout = 1e20;
        assert!(config.validate().is_err());
        assert_eq!(config.timeout.connection(), Duration::MAX);

        config.timeout.connection_timeout = 5.0;
        config.timeout.execution_timeout = f64::INFINITY;
        assert!(config.validate().is_err());

        config.timeout.execution_timeout = 30.0;

        config.timeout.connection_timeout = 0.0;
        config.smtp.enable = true;
        assert!(config.validate().is_err());

        config.smtp.from_email = "sender@domain.com".to_string();
        config.smtp.to_email = vec!["first@domain.com".to_string()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_normalize_extensions() {
        let mut config = Config::default();
        config.compress.image_formats =
            vec!["JPG".to_string(), ".jpeg".to_string(), " .Png ".to_string(), "jpg".to_string(), ".".to_string()];
        config.normalize();
        assert_eq!(config.compress.image_formats, vec![".jpg", ".jpeg", ".png"]);
    }

    #[tokio::test]
    async fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        tokio::fs::write(
            &config_path,
            r#"{ "compress": { "img_path": "/data/photos", "image_formats": ["JPG"] },
                 "timeout": { "connection_timeout": 0.5 } }"#,
        )
        .await
        .unwrap();

        let config = Config::from_file(&config_path).await.unwrap();
        assert_eq!(config.compress.img_path, PathBuf::from("/data/photos"));
        assert_eq!(config.compress.image_formats, vec![".jpg"]);
        assert_eq!(config.compress.postfix, "_compressed");
        assert_eq!(config.timeout.connection(), Duration::from_millis(500));
        assert_eq!(config.timeout.execution(), Duration::from_secs(30));
        assert_eq!(config.logger.main_log(), PathBuf::from("logs/compress.log"));
        assert_eq!(config.logger.error_log(), PathBuf::from("logs/compress_error.log"));
    }

    #[tokio::test]
    async fn test_written_config_loads_back() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let mut original_config = Config::default();
        original_config.compress.quality = 40;
        original_config.compress.ignore_directories.insert("archive".to_string());
        original_config.timeout.execution_timeout = 12.0;

        tokio::fs::write(&config_path, serde_json::to_string_pretty(&original_config).unwrap())
            .await
            .unwrap();
        let loaded_config = Config::from_file(&config_path).await.unwrap();

        assert_eq!(loaded_config.compress.quality, 40);
        assert!(loaded_config.compress.ignore_directories.contains("archive"));
        assert_eq!(loaded_config.timeout.execution(), Duration::from_secs(12));
    }

    #[tokio::test]
    async fn test_missing_or_malformed_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.json");
        assert!(Config::from_file(&missing).await.is_err());

        let broken = temp_dir.path().join("broken.json");
        tokio::fs::write(&broken, "{ not json").await.unwrap();
        assert!(Config::from_file(&broken).await.is_err());
    }
}
