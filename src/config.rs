use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::hidden;

const DEFAULT_ENV_PREFIX: &str = "CELLOPHANE";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub hidden: HiddenConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HiddenConfig {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_undo_window", with = "humantime_serde")]
    pub undo_window: Duration,
}

impl Default for HiddenConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            undo_window: default_undo_window(),
        }
    }
}

impl HiddenConfig {
    pub fn registry_options(&self) -> hidden::Options {
        hidden::Options {
            max_entries: self.max_entries,
            undo_window: self.undo_window,
        }
    }
}

fn default_max_entries() -> usize {
    hidden::DEFAULT_MAX_ENTRIES
}

fn default_undo_window() -> Duration {
    hidden::DEFAULT_UNDO_WINDOW
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "info".into()
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            let from_file = read_config_file(path)?;
            cfg = merge_config(cfg, from_file);
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    apply_env(&mut cfg, prefix);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if other.storage.path.is_some() {
        base.storage.path = other.storage.path;
    }

    if other.hidden.max_entries != 0 {
        base.hidden.max_entries = other.hidden.max_entries;
    }
    base.hidden.undo_window = other.hidden.undo_window;

    if !other.log.filter.trim().is_empty() {
        base.log.filter = other.log.filter;
    }

    base
}

fn apply_env(cfg: &mut Config, prefix: &str) {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    for (key, value) in map {
        apply_env_value(cfg, &key, value);
    }
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "storage.path" => {
            if !value.trim().is_empty() {
                cfg.storage.path = Some(PathBuf::from(value));
            }
        }
        "hidden.max_entries" => {
            if let Ok(parsed) = value.parse::<usize>() {
                if parsed != 0 {
                    cfg.hidden.max_entries = parsed;
                }
            }
        }
        "hidden.undo_window" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.hidden.undo_window = duration;
            }
        }
        "log.filter" => {
            if !value.trim().is_empty() {
                cfg.log.filter = value;
            }
        }
        _ => {}
    }
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("cellophane").join("config.yaml"))
}
