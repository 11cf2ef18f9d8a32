//! User configuration loaded from `~/.config/streamscout/config.toml`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Per-user settings forwarded with every request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// TMDB API key used for metadata lookup.
    pub tmdb_key: Option<String>,
    /// Base URL of a MediaFlow-style proxy that fronts scraped sites.
    pub proxy_url: Option<String>,
    pub proxy_password: Option<String>,
}

impl UserConfig {
    /// Load the default config file.
    ///
    /// Returns defaults if the file doesn't exist (all keys are optional).
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load an explicit config file; a missing file is an error here.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("invalid TOML in {}", path.display()))
    }

    /// Values set in `other` take precedence.
    #[must_use]
    pub fn merged_with(self, other: UserConfig) -> Self {
        Self {
            tmdb_key: other.tmdb_key.or(self.tmdb_key),
            proxy_url: other.proxy_url.or(self.proxy_url),
            proxy_password: other.proxy_password.or(self.proxy_password),
        }
    }

    /// TMDB key, treating an empty string as unset.
    pub fn tmdb_key(&self) -> Option<&str> {
        non_empty(self.tmdb_key.as_deref())
    }

    pub fn proxy_url(&self) -> Option<&str> {
        non_empty(self.proxy_url.as_deref())
    }

    pub fn proxy_password(&self) -> Option<&str> {
        non_empty(self.proxy_password.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Return the path to the config file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("streamscout")
        .join("config.toml")
}
