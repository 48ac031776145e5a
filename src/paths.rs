//! Centralized path resolution for selfman
//!
//! # Environment Variables
//!
//! - `SELFMAN_CONFIG_DIR` - Override config directory (e.g., `~/dotfiles/selfman`)
//! - `SELFMAN_CONFIG` - Explicit system config file (see [`crate::config`])
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `SELFMAN_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/selfman` (if set)
//! 3. `~/.config/selfman`
//!
//! For data_dir():
//! 1. `XDG_DATA_HOME/selfman` (if set)
//! 2. `~/.local/share/selfman`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "SELFMAN_CONFIG_DIR";

/// Environment variable naming the system config file
pub const ENV_CONFIG_FILE: &str = "SELFMAN_CONFIG";

fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().context("Could not determine home directory")
}

/// Get the selfman config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join("selfman");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    let path = home_dir()?.join(".config").join("selfman");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Get the selfman data directory path (sources and artifacts live here)
pub fn data_dir() -> Result<PathBuf> {
    if let Ok(xdg_data) = std::env::var("XDG_DATA_HOME") {
        let path = PathBuf::from(xdg_data).join("selfman");
        log::debug!("Using XDG_DATA_HOME: {}", path.display());
        return Ok(path);
    }

    let path = home_dir()?.join(".local").join("share").join("selfman");
    log::debug!("Using default data dir: {}", path.display());
    Ok(path)
}

/// Default directory for binary links
pub fn default_bin_dir() -> Result<PathBuf> {
    Ok(home_dir()?.join(".local").join("bin"))
}

/// Default directory for library links
pub fn default_lib_dir() -> Result<PathBuf> {
    Ok(home_dir()?.join(".local").join("lib"))
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables are left as they are.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    /// Helper to run a test with temporary env var
    ///
    /// # Safety
    /// This function uses unsafe env::set_var/remove_var which can cause issues
    /// if other threads read environment variables concurrently.
    /// Only use in single-threaded test contexts.
    fn with_env_var<F, R>(key: &str, value: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: Tests run in isolation and don't read env vars concurrently
        unsafe { env::set_var(key, value) };
        let result = f();
        match original {
            // SAFETY: Tests run in isolation
            Some(v) => unsafe { env::set_var(key, v) },
            None => unsafe { env::remove_var(key) },
        }
        result
    }

    #[test]
    fn test_config_dir_env_override() {
        with_env_var(ENV_CONFIG_DIR, "/custom/selfman/config", || {
            let result = config_dir().unwrap();
            assert_eq!(result, PathBuf::from("/custom/selfman/config"));
        });
    }

    #[test]
    fn test_xdg_data_home() {
        with_env_var("XDG_DATA_HOME", "/tmp/xdg-data-test", || {
            let result = data_dir().unwrap();
            assert_eq!(result, PathBuf::from("/tmp/xdg-data-test/selfman"));
        });
    }

    #[test]
    fn test_default_link_dirs() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(default_bin_dir().unwrap(), home.join(".local/bin"));
        assert_eq!(default_lib_dir().unwrap(), home.join(".local/lib"));
    }

    #[test]
    fn test_expand_with_tilde() {
        let result = expand("~/test/path");
        let home = dirs::home_dir().unwrap();
        assert_eq!(result, home.join("test").join("path"));
    }

    #[test]
    fn test_expand_with_env_var() {
        with_env_var("SELFMAN_TEST_VAR", "test_value", || {
            let result = expand("/path/$SELFMAN_TEST_VAR/file");
            assert_eq!(result, PathBuf::from("/path/test_value/file"));
        });
    }

    #[test]
    fn test_expand_unknown_env_var_unchanged() {
        let result = expand("/path/$NONEXISTENT_VAR_12345/file");
        assert_eq!(result, PathBuf::from("/path/$NONEXISTENT_VAR_12345/file"));
    }
}
