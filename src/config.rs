//! Layered settings.
//!
//! Sources, lowest priority first:
//!
//! 1. Built-in defaults
//! 2. TOML file (optional; a missing file is skipped)
//! 3. Environment variables prefixed `KINDRED_`, with `__` separating levels:
//!    - `KINDRED_BUILD__NEIGHBORS=16` sets `build.neighbors`
//!    - `KINDRED_SERVE__REMOTE_URL=https://...` sets `serve.remote_url`
//!
//! ```no_run
//! use kindred::config::Settings;
//!
//! let settings = Settings::load(Some("kindred.toml".as_ref())).expect("valid settings");
//! println!("K = {}", settings.build.neighbors);
//! ```

use crate::error::BuildError;
use crate::persistence::IndexSource;
use crate::text::DEFAULT_MAX_FEATURES;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "KINDRED_";

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub serve: ServeConfig,
}

/// Offline build parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Vocabulary bound (`V_max`).
    #[serde(default = "default_max_features")]
    pub max_features: usize,
    /// Neighbors kept per item (`K`). Larger K: better recall, bigger artifact.
    #[serde(default = "default_neighbors")]
    pub neighbors: usize,
    /// Use the thread pool when the `parallel` feature is compiled in.
    #[serde(default = "default_true")]
    pub parallel: bool,
}

/// Item record field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_title_field")]
    pub title_field: String,
    #[serde(default = "default_tags_field")]
    pub tags_field: String,
}

/// Where the serving side finds its index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServeConfig {
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,
    /// Tried after `index_path` when the local file is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

fn default_max_features() -> usize {
    DEFAULT_MAX_FEATURES
}

fn default_neighbors() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_title_field() -> String {
    "title".to_string()
}

fn default_tags_field() -> String {
    "tags".to_string()
}

fn default_index_path() -> PathBuf {
    PathBuf::from("kindred.idx")
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            max_features: default_max_features(),
            neighbors: default_neighbors(),
            parallel: default_true(),
        }
    }
}

impl BuildConfig {
    /// Reject parameters the pipeline cannot honor.
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.max_features == 0 {
            return Err(BuildError::InvalidConfig(
                "build.max_features must be at least 1".to_string(),
            ));
        }
        if self.neighbors == 0 {
            return Err(BuildError::InvalidConfig(
                "build.neighbors must be at least 1".to_string(),
            ));
        }
        if self.neighbors > u16::MAX as usize {
            return Err(BuildError::InvalidConfig(format!(
                "build.neighbors must be at most {}",
                u16::MAX
            )));
        }
        Ok(())
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            title_field: default_title_field(),
            tags_field: default_tags_field(),
        }
    }
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            index_path: default_index_path(),
            remote_url: None,
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

impl ServeConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Sources in the order they should be tried: local file, then remote.
    pub fn sources(&self) -> Vec<IndexSource> {
        let mut sources = vec![IndexSource::Local(self.index_path.clone())];
        if let Some(url) = &self.remote_url {
            sources.push(IndexSource::Remote {
                url: url.clone(),
                timeout: self.fetch_timeout(),
            });
        }
        sources
    }
}

impl Settings {
    /// Provider stack without extracting.
    pub fn figment(config_file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if let Some(path) = config_file {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load and validate settings.
    pub fn load(config_file: Option<&Path>) -> Result<Self, BuildError> {
        let settings: Settings = Self::figment(config_file)
            .extract()
            .map_err(|e| BuildError::InvalidConfig(e.to_string()))?;
        settings.build.validate()?;
        Ok(settings)
    }
}
