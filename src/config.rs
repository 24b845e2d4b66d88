use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::query::{SortOption, TypeFilter};

const DEFAULT_ENV_PREFIX: &str = "REVIEW_NOTES";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub review: ReviewConfig,
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewConfig {
    #[serde(default = "default_author")]
    pub author: String,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            author: default_author(),
        }
    }
}

fn default_author() -> String {
    env::var("USER")
        .or_else(|_| env::var("USERNAME"))
        .ok()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "reviewer".to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViewConfig {
    #[serde(default = "default_sort")]
    pub sort: String,
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            sort: default_sort(),
            filter: default_filter(),
        }
    }
}

impl ViewConfig {
    pub fn sort_option(&self) -> SortOption {
        SortOption::from_key(&self.sort)
    }

    pub fn type_filter(&self) -> TypeFilter {
        TypeFilter::from_key(&self.filter)
    }
}

fn default_sort() -> String {
    SortOption::default().as_str().into()
}

fn default_filter() -> String {
    TypeFilter::default().as_str().into()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportConfig {
    #[serde(default = "default_include_replies")]
    pub include_replies: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            include_replies: default_include_replies(),
        }
    }
}

fn default_include_replies() -> bool {
    true
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
    if !other.review.author.trim().is_empty() {
        base.review.author = other.review.author;
    }

    if !other.view.sort.is_empty() {
        base.view.sort = other.view.sort;
    }
    if !other.view.filter.is_empty() {
        base.view.filter = other.view.filter;
    }

    if other.storage.path.is_some() {
        base.storage.path = other.storage.path;
    }

    base.export.include_replies = other.export.include_replies;

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
        "review.author" => {
            if !value.trim().is_empty() {
                cfg.review.author = value;
            }
        }
        "view.sort" => cfg.view.sort = value,
        "view.filter" => cfg.view.filter = value,
        "storage.path" => cfg.storage.path = Some(PathBuf::from(value)),
        "export.include_replies" => {
            cfg.export.include_replies = matches!(value.as_str(), "1" | "true" | "TRUE" | "True");
        }
        _ => {}
    }
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("review-notes").join("config.yaml"))
}

pub fn save_author(path: Option<PathBuf>, author: &str) -> Result<PathBuf> {
    let author = author.trim();
    anyhow::ensure!(!author.is_empty(), "config: review.author is required");

    let path = if let Some(path) = path {
        path
    } else {
        default_config_path().context("config: unable to determine default config path")?
    };

    let mut cfg = if path.exists() {
        read_config_file(&path)?
    } else {
        Config::default()
    };
    cfg.review.author = author.to_string();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("config: failed to create directory {}", parent.display()))?;
    }

    let contents = serde_yaml::to_string(&cfg).context("config: failed to serialize config")?;
    fs::write(&path, contents)
        .with_context(|| format!("config: failed to write file {}", path.display()))?;

    Ok(path)
}
