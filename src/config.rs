//! User settings
//!
//! Optional defaults live in ~/.config/tunegrab/config.json. Command-line
//! flags (and their environment variables) take precedence over the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::spotify::Strategy;
use crate::ytdlp::DEFAULT_PROGRAM;

/// Base output directory when neither flag nor config names one
pub const DEFAULT_OUTPUT_DIR: &str = "downloads";

/// Settings read from the config file; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base output directory
    pub output_dir: Option<PathBuf>,
    /// Resolution strategy
    pub strategy: Option<Strategy>,
    /// yt-dlp executable
    pub ytdlp_path: Option<String>,
    /// Write playlist.m3u after downloading
    pub write_m3u: Option<bool>,
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub output_dir: Option<PathBuf>,
    pub strategy: Option<Strategy>,
    pub ytdlp_path: Option<String>,
    pub no_m3u: bool,
}

/// Fully resolved options for one run
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub output_root: PathBuf,
    pub strategy: Strategy,
    pub ytdlp_path: String,
    pub write_m3u: bool,
}

impl Settings {
    /// Load settings from the default location
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Ok(path) => Self::load_from(&path),
            Err(e) => {
                debug!("{}, using defaults", e);
                Ok(Self::default())
            }
        }
    }

    /// Load settings from a specific file; a missing file means defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        let settings: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config {:?}", path))?;

        debug!("Loaded config from {}", path.display());
        Ok(settings)
    }

    /// Get the config file path
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("tunegrab").join("config.json"))
    }

    /// Combine with command-line values, falling back to built-in defaults
    pub fn apply(self, overrides: Overrides) -> RunOptions {
        RunOptions {
            output_root: overrides
                .output_dir
                .or(self.output_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            strategy: overrides.strategy.or(self.strategy).unwrap_or_default(),
            ytdlp_path: overrides
                .ytdlp_path
                .or(self.ytdlp_path)
                .unwrap_or_else(|| DEFAULT_PROGRAM.to_string()),
            write_m3u: !overrides.no_m3u && self.write_m3u.unwrap_or(true),
        }
    }
}
