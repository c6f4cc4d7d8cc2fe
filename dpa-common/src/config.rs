//! Bootstrap configuration loading and path resolution
//!
//! Configuration sources, highest priority first:
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default
//!
//! A missing TOML file is not an error: loading reports it as absent and the
//! caller continues with compiled defaults. A TOML file that exists but does
//! not parse is a configuration error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the report output directory
pub const OUTPUT_DIR_ENV: &str = "DPA_OUTPUT_DIR";

/// Output directory used when no other source provides one
pub const DEFAULT_OUTPUT_DIR: &str = "reconciliation";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Directory receiving the four report files (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Reconciliation settings
    #[serde(default)]
    pub reconcile: ReconcileSettings,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Which catalog checksum is compared against the single legacy checksum
///
/// The catalog export carries both the original-master checksum and the
/// checksum of the archived file. The archived-file checksum is the default
/// counterpart; the mapping has not been confirmed against production
/// extracts, so it stays switchable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChecksumSource {
    /// Catalog `ARCHIVE_MD5` field
    #[default]
    ArchiveMd5,
    /// Catalog `MASTER_MD5` field
    MasterMd5,
}

impl std::fmt::Display for ChecksumSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChecksumSource::ArchiveMd5 => write!(f, "archive-md5"),
            ChecksumSource::MasterMd5 => write!(f, "master-md5"),
        }
    }
}

impl std::str::FromStr for ChecksumSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "archive-md5" | "archive_md5" => Ok(ChecksumSource::ArchiveMd5),
            "master-md5" | "master_md5" => Ok(ChecksumSource::MasterMd5),
            other => Err(Error::InvalidInput(format!(
                "Unknown checksum source '{}' (expected archive-md5 or master-md5)",
                other
            ))),
        }
    }
}

/// Reconciliation settings section (`[reconcile]`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconcileSettings {
    /// Catalog checksum compared against the legacy checksum
    #[serde(default)]
    pub checksum_source: ChecksumSource,

    /// Compare checksums ignoring ASCII case (hex digests from mixed tooling)
    #[serde(default)]
    pub ignore_checksum_case: bool,
}

/// Get default configuration file path for the platform
///
/// `<config_dir>/dpa/reconcile.toml`, e.g. `~/.config/dpa/reconcile.toml` on Linux.
pub fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|d| d.join("dpa").join("reconcile.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
}

/// Load TOML configuration
///
/// `Ok(None)` when the file does not exist; the caller falls back to
/// [`TomlConfig::default`] and reports it once logging is up. Unreadable or
/// malformed file → error.
pub fn load_toml_config(path: &Path) -> Result<Option<TomlConfig>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse {}: {}", path.display(), e))
    })?;

    Ok(Some(config))
}

/// Write TOML configuration atomically
///
/// Serializes to `<path>.tmp` then renames over the target, so a reader never
/// observes a half-written file. Parent directories are created as needed.
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    std::fs::write(&temp_path, content)?;
    if let Err(e) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(Error::Io(e));
    }

    Ok(())
}

/// Resolve the report output directory
///
/// Priority: CLI argument → environment variable → TOML → compiled default.
pub fn resolve_output_dir(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.output_dir {
        return path.clone();
    }

    PathBuf::from(DEFAULT_OUTPUT_DIR)
}
