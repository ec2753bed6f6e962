// ⚙️ Configuration - leave-calendar.toml
//
// [source]  where leave events come from (json | csv | http)
// [layout]  week start + row heights
// [server]  bind address for the HTTP server
// [filter]  initial business group
//
// Every section is optional; a missing file means all defaults.

use crate::calendar::WeekStart;
use crate::height::HeightSettings;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "LEAVE_CALENDAR_CONFIG";

/// Config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "leave-calendar.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Json,
    Csv,
    Http,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,

    /// File for json/csv sources
    pub path: PathBuf,

    /// Endpoint for the http source (schedule-app.php)
    pub base_url: Option<String>,

    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            kind: SourceKind::Json,
            path: PathBuf::from("leaves.json"),
            base_url: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub week_start: WeekStart,

    /// Row heights in pixels for the HTTP layout
    #[serde(flatten)]
    pub heights: HeightSettings,

    /// Apply the start/end/title pre-sort before packing
    pub sort_events: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            week_start: WeekStart::Monday,
            heights: HeightSettings::default(),
            sort_events: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            addr: "0.0.0.0:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Business group searched on startup; empty means the first one the
    /// source lists
    pub business_group: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub layout: LayoutConfig,
    pub server: ServerConfig,
    pub filter: FilterConfig,
}

impl Config {
    /// Parse a TOML document
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse configuration")
    }

    /// Load a config file. Relative source paths resolve against the file's
    /// directory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config = Self::from_toml(&text)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        if config.source.path.is_relative() {
            if let Some(dir) = path.parent() {
                config.source.path = dir.join(&config.source.path);
            }
        }

        Ok(config)
    }

    /// `$LEAVE_CALENDAR_CONFIG`, else `./leave-calendar.toml`, else defaults.
    ///
    /// An explicitly named file must exist; the default file is optional.
    pub fn load() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(PathBuf::from(path)),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}
