//! System configuration and app definition loading
//!
//! The system config file is optional TOML. Every key falls back to a
//! default, and paths are `~`/`$VAR` expanded after merging.

use anyhow::{Context, Result, bail};
use reconcile::{AppDefinition, AppSet, Layout};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::paths;

/// Name of the system config file inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Extension of app definition files
pub const APP_FILE_EXTENSION: &str = "toml";

/// Raw system config as written on disk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct SystemConfig {
    pub app_config_dir: Option<String>,
    pub data_dir: Option<String>,
    pub binary_dir: Option<String>,
    pub library_dir: Option<String>,
    pub script_shell: Option<String>,
    #[serde(default)]
    pub timeouts: Timeouts,
}

/// Subprocess time limits, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct Timeouts {
    pub clone_secs: u64,
    pub fetch_secs: u64,
    pub checkout_secs: u64,
    pub download_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            clone_secs: 120,
            fetch_secs: 120,
            checkout_secs: 15,
            download_secs: 60,
        }
    }
}

impl Timeouts {
    pub fn clone_timeout(&self) -> Duration {
        Duration::from_secs(self.clone_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_secs)
    }

    pub fn checkout_timeout(&self) -> Duration {
        Duration::from_secs(self.checkout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_secs)
    }
}

/// Values used for keys the config file leaves out
#[derive(Debug, Clone)]
pub struct Defaults {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub bin_dir: PathBuf,
    pub lib_dir: PathBuf,
}

impl Defaults {
    /// Defaults from the environment and home directory
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            config_dir: paths::config_dir()?,
            data_dir: paths::data_dir()?,
            bin_dir: paths::default_bin_dir()?,
            lib_dir: paths::default_lib_dir()?,
        })
    }
}

/// Fully resolved settings for one invocation
#[derive(Debug, Clone)]
pub struct Settings {
    pub app_config_dir: PathBuf,
    pub layout: Arc<Layout>,
    pub timeouts: Timeouts,
    /// Config file that was read, if any
    pub origin: Option<PathBuf>,
}

impl SystemConfig {
    /// Parse config file content
    pub fn parse(content: &str, origin: &Path) -> Result<Self> {
        toml::from_str(content)
            .with_context(|| format!("Error parsing config file {}", origin.display()))
    }

    /// Find the config file to read.
    ///
    /// `$SELFMAN_CONFIG` wins and must name a readable file. Otherwise the
    /// file in the config directory is used if it exists.
    pub fn locate(env_value: Option<&str>, config_dir: &Path) -> Result<Option<PathBuf>> {
        if let Some(value) = env_value.filter(|v| !v.is_empty()) {
            let path = paths::expand(value);
            if !path.is_file() {
                bail!(
                    "Configuration path was specified in env var {} but is not a readable file: {}",
                    paths::ENV_CONFIG_FILE,
                    path.display()
                );
            }
            return Ok(Some(path));
        }

        let path = config_dir.join(CONFIG_FILE_NAME);
        if path.is_dir() {
            bail!("Resolved config file is a directory: {}", path.display());
        }
        Ok(path.is_file().then_some(path))
    }

    /// Read the config file, or fall back to an empty config
    pub fn load(location: Option<&Path>) -> Result<Self> {
        match location {
            Some(path) => {
                let content = fs::read_to_string(path)
                    .with_context(|| format!("Could not read {}", path.display()))?;
                let config = Self::parse(&content, path)?;
                log::debug!("Loaded system config from {}", path.display());
                Ok(config)
            }
            None => {
                log::debug!("No system config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Merge with defaults and expand paths
    pub fn resolve(self, defaults: &Defaults, origin: Option<PathBuf>) -> Settings {
        let pick = |value: Option<String>, fallback: &Path| match value {
            Some(v) => paths::expand(&v),
            None => fallback.to_path_buf(),
        };

        let app_config_dir = pick(self.app_config_dir, &defaults.config_dir.join("apps"));
        let data_dir = pick(self.data_dir, &defaults.data_dir);
        let bin_dir = pick(self.binary_dir, &defaults.bin_dir);
        let lib_dir = pick(self.library_dir, &defaults.lib_dir);
        let shell = self.script_shell.unwrap_or_else(|| "/bin/sh".to_string());

        Settings {
            app_config_dir,
            layout: Arc::new(Layout::under(&data_dir, &bin_dir, &lib_dir, &shell)),
            timeouts: self.timeouts,
            origin,
        }
    }
}

impl Settings {
    /// Resolve settings from the environment
    pub fn load() -> Result<Self> {
        let defaults = Defaults::from_env()?;
        let env_value = std::env::var(paths::ENV_CONFIG_FILE).ok();
        let location = SystemConfig::locate(env_value.as_deref(), &defaults.config_dir)
            .context("Could not resolve config file")?;
        let config = SystemConfig::load(location.as_deref())?;
        Ok(config.resolve(&defaults, location))
    }

    /// Load and validate every app definition
    pub fn load_apps(&self) -> Result<AppSet> {
        let defs = load_app_definitions(&self.app_config_dir)?;
        let apps = AppSet::from_definitions(defs, Arc::clone(&self.layout))?;
        Ok(apps)
    }
}

/// Read every `*.toml` app definition in `dir`, sorted by file name.
///
/// A missing directory holds no apps.
pub fn load_app_definitions(dir: &Path) -> Result<Vec<AppDefinition>> {
    if !dir.exists() {
        log::debug!("App config dir {} does not exist", dir.display());
        return Ok(Vec::new());
    }
    if !dir.is_dir() {
        bail!("App config path is not a directory: {}", dir.display());
    }

    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Could not read app config dir {}", dir.display()))?
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.path()),
            Err(e) => {
                log::warn!("Skipping unreadable entry in {}: {e}", dir.display());
                None
            }
        })
        .filter(|path| {
            path.is_file() && path.extension().is_some_and(|ext| ext == APP_FILE_EXTENSION)
        })
        .collect();
    files.sort();

    files
        .iter()
        .map(|path| {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Could not read {}", path.display()))?;
            toml::from_str::<AppDefinition>(&content)
                .with_context(|| format!("Error parsing app config {}", path.display()))
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
