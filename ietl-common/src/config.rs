//! Configuration loading and root folder resolution
//!
//! Resolution order for the root folder:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "IETL_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "ietl.db";

/// Contents of `config.toml`
///
/// Every section is optional; missing values fall back to defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub root_folder: Option<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// `[logging]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive (overridden by RUST_LOG)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// `[server]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5740,
        }
    }
}

/// `[ai]` section: text-completion endpoint used by the primary extraction strategy
///
/// When `endpoint` is absent the service runs in degraded mode (fallback only).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub endpoint: Option<String>,
    pub model: String,
    pub api_key: Option<String>,
    /// Per-attempt timeout for one completion call
    pub timeout_ms: u64,
    /// Attempts per transcript before falling back
    pub max_attempts: u32,
    /// Initial backoff between attempts (doubles each retry)
    pub backoff_ms: u64,
    /// Backoff ceiling
    pub max_backoff_ms: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            timeout_ms: 30_000,
            max_attempts: 2,
            backoff_ms: 500,
            max_backoff_ms: 5_000,
        }
    }
}

/// `[processing]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Upper bound on concurrent transcript extractions within one job
    pub max_workers: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self { max_workers: 4 }
    }
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

/// `[storage]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// SQLite lock wait budget in milliseconds
    #[serde(default = "default_lock_wait_ms")]
    pub max_lock_wait_ms: u64,
}

fn default_lock_wait_ms() -> u64 {
    5000
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            max_lock_wait_ms: default_lock_wait_ms(),
        }
    }
}

/// Resolve the root folder
pub fn resolve_root_folder(cli_arg: Option<&str>, toml_config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(root_folder) = toml_config.root_folder.as_deref() {
        return PathBuf::from(root_folder);
    }

    default_root_folder()
}

/// Load `config.toml`
///
/// An explicit path must exist. Without one, the platform config locations are
/// searched and a missing file yields the default configuration.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    let path = match explicit {
        Some(p) => {
            if !p.exists() {
                return Err(Error::Config(format!("Config file not found: {}", p.display())));
            }
            p.to_path_buf()
        }
        None => match default_config_file() {
            Some(p) => p,
            None => {
                tracing::debug!("No config file found, using defaults");
                return Ok(TomlConfig::default());
            }
        },
    };

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    tracing::info!(path = %path.display(), "Loaded configuration file");
    Ok(config)
}

/// Write a TOML config atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Ensures the root folder exists and hands out paths inside it
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    /// Create the root folder if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder).map_err(|e| {
                Error::Config(format!(
                    "Failed to create root folder {}: {}",
                    self.root_folder.display(),
                    e
                ))
            })?;
            tracing::info!(root_folder = %self.root_folder.display(), "Created root folder");
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }
}

/// Platform config file, if one exists
fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("ietl").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/ietl/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("ietl"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/ietl"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("ietl"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/ietl"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("ietl"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\ietl"))
    } else {
        PathBuf::from("./ietl_data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_cli_argument_wins() {
        std::env::set_var(ROOT_FOLDER_ENV, "/from/env");
        let config = TomlConfig {
            root_folder: Some("/from/toml".to_string()),
            ..Default::default()
        };
        let resolved = resolve_root_folder(Some("/from/cli"), &config);
        std::env::remove_var(ROOT_FOLDER_ENV);
        assert_eq!(resolved, PathBuf::from("/from/cli"));
    }

    #[test]
    #[serial]
    fn test_env_beats_toml() {
        std::env::set_var(ROOT_FOLDER_ENV, "/from/env");
        let config = TomlConfig {
            root_folder: Some("/from/toml".to_string()),
            ..Default::default()
        };
        let resolved = resolve_root_folder(None, &config);
        std::env::remove_var(ROOT_FOLDER_ENV);
        assert_eq!(resolved, PathBuf::from("/from/env"));
    }

    #[test]
    #[serial]
    fn test_toml_used_when_no_cli_or_env() {
        std::env::remove_var(ROOT_FOLDER_ENV);
        let config = TomlConfig {
            root_folder: Some("/from/toml".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve_root_folder(None, &config), PathBuf::from("/from/toml"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            [ai]
            endpoint = "http://localhost:8080/v1/chat/completions"
            model = "local"
            timeout_ms = 1000
            max_attempts = 3
            backoff_ms = 10
            max_backoff_ms = 100

            [storage]
            backend = "memory"
            "#,
        )
        .unwrap();

        let config = load_toml_config(Some(&path)).unwrap();
        assert_eq!(config.ai.max_attempts, 3);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.storage.max_lock_wait_ms, 5000);
        assert_eq!(config.processing.max_workers, 4);
        assert_eq!(config.server.port, 5740);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let result = load_toml_config(Some(Path::new("/definitely/not/here.toml")));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = TomlConfig::default();
        config.processing.max_workers = 2;
        write_toml_config(&config, &path).unwrap();

        let loaded = load_toml_config(Some(&path)).unwrap();
        assert_eq!(loaded.processing.max_workers, 2);
    }

    #[test]
    fn test_initializer_creates_folder() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root");
        let init = RootFolderInitializer::new(root.clone());
        init.ensure_directory_exists().unwrap();
        assert!(root.is_dir());
        assert_eq!(init.database_path(), root.join(DATABASE_FILE));
    }
}
