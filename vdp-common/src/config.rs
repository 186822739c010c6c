//! Configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`VDP_ROOT_FOLDER`)
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! Every other path (vocabulary root, durable database, cache database)
//! follows the same CLI > TOML > derived-from-root order. A missing or
//! unreadable config file never stops startup.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "VDP_ROOT_FOLDER";

/// Default HTTP port for the catalog service
pub const DEFAULT_PORT: u16 = 5730;

/// Default per-user time budget for the syncer
pub const DEFAULT_USER_TIMEOUT_MS: u64 = 30_000;

/// Contents of `config.toml`
///
/// All keys are optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub vocab_root: Option<PathBuf>,
    pub durable_db: Option<PathBuf>,
    pub cache_db: Option<PathBuf>,
    pub port: Option<u16>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// `[logging]` table
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// `[sync]` table
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    #[serde(default = "default_user_timeout_ms")]
    pub user_timeout_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            user_timeout_ms: default_user_timeout_ms(),
        }
    }
}

fn default_user_timeout_ms() -> u64 {
    DEFAULT_USER_TIMEOUT_MS
}

impl TomlConfig {
    /// Parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid TOML in {}: {}", path.display(), e)))
    }

    /// Load the platform config file, falling back to defaults
    pub fn load_or_default() -> Self {
        let Some(path) = locate_config_file() else {
            info!("No config file found, using defaults");
            return Self::default();
        };

        match Self::load(&path) {
            Ok(config) => {
                info!("Loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

/// Command-line path overrides, highest priority
#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    pub root_folder: Option<PathBuf>,
    pub vocab_root: Option<PathBuf>,
    pub durable_db: Option<PathBuf>,
    pub cache_db: Option<PathBuf>,
}

/// Fully resolved filesystem layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformPaths {
    pub root_folder: PathBuf,
    pub vocab_root: PathBuf,
    pub durable_db: PathBuf,
    pub cache_db: PathBuf,
}

impl PlatformPaths {
    /// Resolve every path from CLI overrides, environment and TOML
    pub fn resolve(overrides: &PathOverrides, toml_config: &TomlConfig) -> Self {
        let root_folder = resolve_root_folder(
            overrides.root_folder.as_deref(),
            ROOT_FOLDER_ENV,
            toml_config.root_folder.as_deref(),
        );

        let pick = |cli: &Option<PathBuf>, toml: &Option<PathBuf>, default: &str| {
            cli.clone()
                .or_else(|| toml.clone())
                .unwrap_or_else(|| root_folder.join(default))
        };

        Self {
            vocab_root: pick(&overrides.vocab_root, &toml_config.vocab_root, "vocabularies"),
            durable_db: pick(&overrides.durable_db, &toml_config.durable_db, "vdp.db"),
            cache_db: pick(&overrides.cache_db, &toml_config.cache_db, "vdp-cache.db"),
            root_folder,
        }
    }

    /// Create the root folder if missing
    pub fn ensure_root_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created root folder: {}", self.root_folder.display());
        }
        Ok(())
    }
}

/// Root folder resolution following the documented priority order
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_root: Option<&Path>,
) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = toml_root {
        return path.to_path_buf();
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Find the config file for the platform, if one exists
fn locate_config_file() -> Option<PathBuf> {
    // ~/.config/vdp/config.toml first, then /etc/vdp/config.toml
    let user_config = dirs::config_dir().map(|d| d.join("vdp").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(unix) {
        let system_config = PathBuf::from("/etc/vdp/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("vdp"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\vdp"))
    } else if cfg!(unix) {
        // ~/.local/share/vdp, ~/Library/Application Support/vdp on macOS
        dirs::data_local_dir()
            .map(|d| d.join("vdp"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/vdp"))
    } else {
        PathBuf::from("./vdp_data")
    }
}
