//! Config file locations for runin
//!
//! # Environment Variables
//!
//! - `RUNIN_CONFIG_DIR` - Override the config directory (e.g., `~/dotfiles/runin`)
//!
//! # Search Order
//!
//! Without an explicit `--config`, the first of these that exists and parses
//! is used:
//!
//! 1. `.runin.toml`, `.runin.json`, `runin.toml`, `runin.json` in the current directory
//! 2. `~/.runin.toml`, `~/.runin.json`
//! 3. `config.toml`, `config.json` in [`config_dir()`]
//!
//! For config_dir():
//! 1. `RUNIN_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/runin` (if set)
//! 3. Platform default:
//!    - Windows: `%APPDATA%\runin`
//!    - macOS/Linux: `~/.config/runin`

use std::path::{Path, PathBuf};

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "RUNIN_CONFIG_DIR";

/// Config file names looked up in the working directory
const LOCAL_NAMES: [&str; 4] = [".runin.toml", ".runin.json", "runin.toml", "runin.json"];

/// Config file names looked up in the home directory
const HOME_NAMES: [&str; 2] = [".runin.toml", ".runin.json"];

/// Config file names looked up in the config directory
const DIR_NAMES: [&str; 2] = ["config.toml", "config.json"];

/// Get the runin config directory path, if one can be determined
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Some(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join("runin");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Some(path);
    }

    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            return Some(app_data.join("runin"));
        }
    }

    dirs::home_dir().map(|home| home.join(".config").join("runin"))
}

/// Every place a config file may live, in search order
pub fn candidate_paths(cwd: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = LOCAL_NAMES.iter().map(|name| cwd.join(name)).collect();

    if let Some(home) = dirs::home_dir() {
        paths.extend(HOME_NAMES.iter().map(|name| home.join(name)));
    }

    if let Some(dir) = config_dir() {
        paths.extend(DIR_NAMES.iter().map(|name| dir.join(name)));
    }

    paths
}

/// Expand ~ and environment variables in a path string.
pub fn expand(path: &str) -> PathBuf {
    PathBuf::from(fanout::resolver::expand(path))
}

// ============================================================================
// Tests
// ============================================================================
