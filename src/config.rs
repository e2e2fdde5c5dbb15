use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use fanout::GroupTable;

use crate::paths;

// ============================================================================
// Config Format
// ============================================================================

/// On-disk config format, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// `.toml` files are TOML; everything else is read as JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Json,
        }
    }
}

// ============================================================================
// Runin Config
// ============================================================================

/// The runin config file
///
/// ```json
/// {
///   // comment lines are allowed
///   "groups": {
///     "work": ["~/work/*"],
///     "all": ["group:work", "~/oss/*"]
///   }
/// }
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct RuninConfig {
    /// Named lists of target patterns, usable as `group:<name>`
    #[serde(default)]
    pub groups: GroupTable,
}

impl RuninConfig {
    /// Parse config text in the given format
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        match format {
            ConfigFormat::Json => serde_json::from_str(&strip_line_comments(content))
                .context("Invalid JSON format in runin config"),
            ConfigFormat::Toml => {
                toml::from_str(content).context("Invalid TOML format in runin config")
            }
        }
    }

    /// Load a config file, picking the format from its extension
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::parse(&content, ConfigFormat::from_path(path))
            .with_context(|| format!("Could not parse {}", path.display()))
    }

    /// Find and load the config; a missing or broken config is an empty one
    pub fn discover(explicit: Option<&Path>) -> Self {
        if let Some(path) = explicit {
            return match Self::load(path) {
                Ok(config) => {
                    log::debug!("Using config {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!("{e:#}");
                    Self::default()
                }
            };
        }

        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::first_usable(&paths::candidate_paths(&cwd))
    }

    /// First candidate that reads and parses, or an empty config
    fn first_usable(candidates: &[PathBuf]) -> Self {
        for path in candidates {
            if !path.is_file() {
                continue;
            }
            match Self::load(path) {
                Ok(config) => {
                    log::debug!(
                        "Using config {} ({} groups)",
                        path.display(),
                        config.groups.len()
                    );
                    return config;
                }
                Err(e) => log::warn!("Skipping config: {e:#}"),
            }
        }
        log::debug!("No config found, no groups defined");
        Self::default()
    }
}

/// Blank out full-line `//` comments. Inline comments are kept so URLs survive.
pub fn strip_line_comments(content: &str) -> String {
    content
        .lines()
        .map(|line| {
            if line.trim_start().starts_with("//") {
                ""
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// Tests
// ============================================================================
