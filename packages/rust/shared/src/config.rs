//! Application configuration for kexplain.
//!
//! User config lives at `~/.kexplain/kexplain.toml`.
//! CLI flags (and their environment variables) override config file values,
//! which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ExplainError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "kexplain.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".kexplain";

// ---------------------------------------------------------------------------
// Config structs (matching kexplain.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Input/output locations.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Query and concurrency settings.
    #[serde(default)]
    pub explain: ExplainSettings,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// File listing one root resource name per line.
    #[serde(default = "default_resource_names_file")]
    pub resource_names_file: String,

    /// Where the JSON forest is written.
    #[serde(default = "default_output_file")]
    pub output_file: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            resource_names_file: default_resource_names_file(),
            output_file: default_output_file(),
        }
    }
}

fn default_resource_names_file() -> String {
    "./in/resourceNames.txt".into()
}
fn default_output_file() -> String {
    "./out/output.json".into()
}

/// `[explain]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplainSettings {
    /// Upper bound on simultaneous external queries.
    #[serde(default = "default_max_concurrent_queries")]
    pub max_concurrent_queries: u32,

    /// Per-query timeout in seconds.
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,

    /// What a failed field query does to its resource.
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// When false, queries run one at a time.
    #[serde(default = "default_true")]
    pub parallel: bool,

    /// kubectl binary to invoke.
    #[serde(default = "default_kubectl_path")]
    pub kubectl_path: String,

    /// kubectl context every query is pinned to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl Default for ExplainSettings {
    fn default() -> Self {
        Self {
            max_concurrent_queries: default_max_concurrent_queries(),
            query_timeout_secs: default_query_timeout_secs(),
            failure_policy: FailurePolicy::default(),
            parallel: true,
            kubectl_path: default_kubectl_path(),
            context: None,
        }
    }
}

fn default_max_concurrent_queries() -> u32 {
    8
}
fn default_query_timeout_secs() -> u64 {
    30
}
fn default_true() -> bool {
    true
}
fn default_kubectl_path() -> String {
    "kubectl".into()
}

/// How a failed field-description query is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Keep the field with an empty description and record a warning.
    #[default]
    Tolerant,
    /// Fail the whole resource the field belongs to.
    Abort,
}

// ---------------------------------------------------------------------------
// Runtime view
// ---------------------------------------------------------------------------

/// Validated settings consumed by the explanation engine.
#[derive(Debug, Clone)]
pub struct ExplainConfig {
    /// Semaphore size for external queries.
    pub max_concurrent_queries: usize,
    /// Deadline applied to every external query.
    pub query_timeout: Duration,
    /// Field failure handling.
    pub failure_policy: FailurePolicy,
}

impl ExplainConfig {
    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_queries == 0 {
            return Err(ExplainError::config("max_concurrent_queries must be at least 1"));
        }
        if self.query_timeout.is_zero() {
            return Err(ExplainError::config("query_timeout_secs must be at least 1"));
        }
        Ok(())
    }
}

impl Default for ExplainConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ExplainConfig {
    fn from(config: &AppConfig) -> Self {
        let settings = &config.explain;
        let max_concurrent_queries = if settings.parallel {
            settings.max_concurrent_queries as usize
        } else {
            1
        };
        Self {
            max_concurrent_queries,
            query_timeout: Duration::from_secs(settings.query_timeout_secs),
            failure_policy: settings.failure_policy,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.kexplain/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ExplainError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.kexplain/kexplain.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ExplainError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| ExplainError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ExplainError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| ExplainError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ExplainError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
