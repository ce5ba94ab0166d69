// src/config.rs

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

use crate::chart::Theme;

/// Environment variable pointing at a YAML config file.
pub const CONFIG_ENV: &str = "INCIDENTBOARD_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Where merged exports and charts are written.
    pub output_dir: PathBuf,
    /// First placeholder date for tables without a date column.
    pub placeholder_epoch: NaiveDate,
    /// File name prefix for merged exports.
    pub export_prefix: String,
    pub theme: Theme,
    /// Chart width and height in pixels.
    pub chart_size: (u32, u32),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            placeholder_epoch: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default(),
            export_prefix: "merged".into(),
            theme: Theme::Light,
            chart_size: (1280, 720),
        }
    }
}

impl Config {
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        serde_yaml::from_str(s).context("parsing config YAML")
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Load from `explicit`, else `$INCIDENTBOARD_CONFIG`, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let from_env = env::var_os(CONFIG_ENV).map(PathBuf::from);
        match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => {
                info!(path = %path.display(), "loading config");
                Self::from_file(path)
            }
            None => {
                debug!("no config file, using defaults");
                Ok(Self::default())
            }
        }
    }
}
