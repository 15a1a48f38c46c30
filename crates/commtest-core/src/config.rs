use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{ConfigPathScope, Error, Result};
use crate::{ENV_COMMTEST_CONFIG, ENV_COMMTEST_DATA_DIR};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommtestConfig {
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub public_url_base: Option<String>,
    #[serde(default = "default_log_json")]
    pub log_json: bool,
    #[serde(default)]
    pub log_level: Option<String>,
}

const fn default_log_json() -> bool {
    true
}

impl Default for CommtestConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            public_url_base: None,
            log_json: default_log_json(),
            log_level: None,
        }
    }
}

impl CommtestConfig {
    /// Reads a TOML config file; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&raw).map_err(|e| match e {
            Error::ConfigParse { message, .. } => Error::ConfigParse {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    pub fn parse(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::ConfigParse {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })
    }

    /// Loads from the first existing candidate in resolution order.
    pub fn discover() -> Result<Self> {
        for candidate in config_candidates() {
            if candidate.exists() {
                return Self::load(&candidate);
            }
        }
        Ok(Self::default())
    }

    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        if let Some(explicit) = non_empty_env(ENV_COMMTEST_DATA_DIR) {
            return PathBuf::from(explicit);
        }
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        if let Some(xdg) = non_empty_env("XDG_DATA_HOME") {
            return PathBuf::from(xdg).join("commtest");
        }
        if let Some(home) = non_empty_env("HOME") {
            return PathBuf::from(home)
                .join(".local")
                .join("share")
                .join("commtest");
        }
        PathBuf::from(".commtest").join("data")
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn config_candidates() -> Vec<PathBuf> {
    let mut out = Vec::new();
    if let Some(explicit) = non_empty_env(ENV_COMMTEST_CONFIG) {
        out.push(PathBuf::from(explicit));
    }
    out.push(resolve_config_path(ConfigPathScope::User));
    out.push(resolve_config_path(ConfigPathScope::Workspace));
    out
}

#[must_use]
pub fn resolve_config_path(scope: ConfigPathScope) -> PathBuf {
    match scope {
        ConfigPathScope::User => {
            if let Some(xdg_config_home) = non_empty_env("XDG_CONFIG_HOME") {
                return PathBuf::from(xdg_config_home)
                    .join("commtest")
                    .join("config.toml");
            }
            if let Some(home) = non_empty_env("HOME") {
                return PathBuf::from(home)
                    .join(".config")
                    .join("commtest")
                    .join("config.toml");
            }
            PathBuf::from(".commtest").join("config.toml")
        }
        ConfigPathScope::Workspace => PathBuf::from(".commtest").join("config.toml"),
    }
}
