//! Configuration for opensea-dl.
//!
//! Configuration sources (highest priority first):
//! 1. Command-line flags (applied by the CLI on top of the resolved config)
//! 2. Environment variables (OPENSEA_DL_OUTPUT, OPENSEA_DL_API_BASE, OPENSEA_DL_WORKERS)
//! 3. Config file (.opensea-dl/config.yaml)
//! 4. Defaults
//!
//! Config file discovery:
//! - Searches current directory and parents for .opensea-dl/config.yaml
//! - Falls back to ~/.opensea-dl/config.yaml
//! - The output path in a config file is relative to the project root
//!   (the parent of .opensea-dl/)

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::DEFAULT_API_BASE;
use crate::core::{DEFAULT_MAX_RETRY_AFTER, DEFAULT_PAGE_SIZE, DEFAULT_WORKERS};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

const CONFIG_DIR: &str = ".opensea-dl";
const CONFIG_FILE: &str = "config.yaml";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub api: Option<ApiConfig>,
    #[serde(default)]
    pub limits: Option<LimitsConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Download root (relative to the project root)
    pub output: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: Option<String>,
    pub page_size: Option<u64>,
    pub request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    pub workers: Option<usize>,
    pub max_retry_after_seconds: Option<u64>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Directory collections are downloaded into
    pub output: PathBuf,
    /// Catalog API root
    pub api_base: String,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    /// Fetch settings
    pub fetch: FetchSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    pub workers: usize,
    pub page_size: u64,
    pub request_timeout_seconds: u64,
    pub max_retry_after_seconds: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout_seconds: 30,
            max_retry_after_seconds: DEFAULT_MAX_RETRY_AFTER.as_secs(),
        }
    }
}

impl FetchSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn max_retry_after(&self) -> Duration {
        Duration::from_secs(self.max_retry_after_seconds)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            anyhow::bail!("workers must be at least 1");
        }
        if self.page_size == 0 {
            anyhow::bail!("page_size must be at least 1");
        }
        if self.request_timeout_seconds == 0 {
            anyhow::bail!("request_timeout_seconds must be at least 1");
        }
        Ok(())
    }
}

/// Find config file by searching current directory and parents, then home
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    let home_config = dirs::home_dir()?.join(CONFIG_DIR).join(CONFIG_FILE);
    home_config.exists().then_some(home_config)
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Read an environment variable that must parse as a number
fn env_number<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow::anyhow!("{} is not a valid number: {}", name, value)),
        Err(_) => Ok(None),
    }
}

/// Merge a parsed config file over the defaults
fn apply_file(config_path: &Path, file: ConfigFile, resolved: &mut ResolvedConfig) {
    // Project root is the parent of .opensea-dl/
    let base_dir = config_path
        .parent()
        .and_then(|p| p.parent())
        .unwrap_or(Path::new("."));

    if let Some(ref output) = file.paths.output {
        resolved.output = resolve_path(base_dir, output);
    }

    if let Some(api) = file.api {
        if let Some(base_url) = api.base_url {
            resolved.api_base = base_url;
        }
        if let Some(page_size) = api.page_size {
            resolved.fetch.page_size = page_size;
        }
        if let Some(timeout) = api.request_timeout_seconds {
            resolved.fetch.request_timeout_seconds = timeout;
        }
    }

    if let Some(limits) = file.limits {
        if let Some(workers) = limits.workers {
            resolved.fetch.workers = workers;
        }
        if let Some(max_wait) = limits.max_retry_after_seconds {
            resolved.fetch.max_retry_after_seconds = max_wait;
        }
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let current_dir = std::env::current_dir().context("Failed to determine current directory")?;
    let config_file = find_config_file();

    let mut resolved = ResolvedConfig {
        output: current_dir,
        api_base: DEFAULT_API_BASE.to_string(),
        config_file: config_file.clone(),
        fetch: FetchSettings::default(),
    };

    if let Some(ref config_path) = config_file {
        let file = load_config_file(config_path)?;
        apply_file(config_path, file, &mut resolved);
    }

    if let Ok(output) = std::env::var("OPENSEA_DL_OUTPUT") {
        resolved.output = PathBuf::from(output);
    }
    if let Ok(api_base) = std::env::var("OPENSEA_DL_API_BASE") {
        resolved.api_base = api_base;
    }
    if let Some(workers) = env_number("OPENSEA_DL_WORKERS")? {
        resolved.fetch.workers = workers;
    }

    resolved.fetch.validate()?;
    Ok(resolved)
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}
