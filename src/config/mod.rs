// Configuration loading and management.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::group::DEFAULT_JOIN_POLL;

pub const PROD: &str = "prod";
pub const DEV: &str = "dev";
#[allow(dead_code)]
pub const TEST: &str = "test";

pub const DEFAULT_GROUP_NAME: &str = "union";

pub const CONFIG_PATH: &str = "cfg/threadunion.cfg.yaml";
pub const CONFIG_PATH_LOCAL: &str = "cfg/threadunion.cfg.local.yaml";
/// Source reported when no config file was found.
pub const DEFAULTS_SOURCE: &str = "defaults";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Union {
    #[serde(rename = "threadunion")]
    pub threadunion: UnionBox,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UnionBox {
    #[serde(default = "default_env")]
    pub env: String,
    pub logs: Option<Logs>,
    #[serde(default)]
    pub group: Group,
    #[serde(default)]
    pub demo: Demo,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Logs {
    pub level: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Group {
    #[serde(default = "default_group_name")]
    pub name: String,
    #[serde(rename = "join_poll", default, with = "humantime_serde")]
    pub join_poll: Option<Duration>,
}

impl Default for Group {
    fn default() -> Self {
        Self {
            name: default_group_name(),
            join_poll: None,
        }
    }
}

/// Settings of the demo binary's workload.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Demo {
    /// Worker count, 0 means one per available core.
    #[serde(default)]
    pub workers: usize,
    /// Every n-th worker fails, 0 disables failures.
    #[serde(rename = "fail_every", default)]
    pub fail_every: usize,
    #[serde(rename = "task_duration", default, with = "humantime_serde")]
    pub task_duration: Option<Duration>,
    #[serde(rename = "run_for", default, with = "humantime_serde")]
    pub run_for: Option<Duration>,
    #[serde(rename = "shutdown_timeout", default, with = "humantime_serde")]
    pub shutdown_timeout: Option<Duration>,
}

fn default_env() -> String {
    DEV.to_string()
}

fn default_group_name() -> String {
    DEFAULT_GROUP_NAME.to_string()
}

// Config trait
pub trait ConfigTrait {
    fn logs(&self) -> Option<&Logs>;
    fn is_prod(&self) -> bool;
    #[allow(dead_code)]
    fn is_test(&self) -> bool;
    fn group(&self) -> &Group;
    fn demo(&self) -> &Demo;
    fn join_poll(&self) -> Duration;
}

// Config type alias for convenience
pub type Config = Union;

impl ConfigTrait for Config {
    fn logs(&self) -> Option<&Logs> {
        self.threadunion.logs.as_ref()
    }

    fn is_prod(&self) -> bool {
        self.threadunion.env == PROD
    }

    fn is_test(&self) -> bool {
        self.threadunion.env == TEST
    }

    fn group(&self) -> &Group {
        &self.threadunion.group
    }

    fn demo(&self) -> &Demo {
        &self.threadunion.demo
    }

    fn join_poll(&self) -> Duration {
        self.threadunion.group.join_poll.unwrap_or(DEFAULT_JOIN_POLL)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threadunion: UnionBox {
                env: default_env(),
                logs: Some(Logs {
                    level: Some("info".to_string()),
                }),
                group: Group::default(),
                demo: Demo::default(),
            },
        }
    }
}

impl Config {
    /// Loads configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Resolve absolute path
        let abs_path = path
            .canonicalize()
            .with_context(|| format!("failed to resolve absolute config filepath: {:?}", path))?;

        // Read file
        let data = std::fs::read_to_string(&abs_path)
            .with_context(|| format!("read config yaml file {:?}", abs_path))?;

        Self::parse(&data).with_context(|| format!("unmarshal yaml from {:?}", abs_path))
    }

    /// Parses configuration from YAML text.
    pub fn parse(data: &str) -> Result<Self> {
        let cfg: Union = serde_yaml::from_str(data)?;
        Ok(cfg)
    }
}

/// Loads the configuration struct from YAML file.
/// Tries local config first, then the default config, then built-in defaults.
/// Returns the config with the path (or "defaults") it came from.
pub fn load_cfg(path: Option<PathBuf>) -> Result<(Config, String)> {
    load_cfg_from(path, &[CONFIG_PATH_LOCAL, CONFIG_PATH])
}

fn load_cfg_from<P: AsRef<Path>>(
    path: Option<PathBuf>,
    candidates: &[P],
) -> Result<(Config, String)> {
    if let Some(custom_path) = path {
        let cfg = Config::load(&custom_path)
            .with_context(|| format!("failed to load custom config from {:?}", custom_path))?;
        return Ok((cfg, custom_path.display().to_string()));
    }

    for candidate in candidates {
        let candidate = candidate.as_ref();
        if let Ok(cfg) = Config::load(candidate) {
            return Ok((cfg, candidate.display().to_string()));
        }
    }

    Ok((Config::default(), DEFAULTS_SOURCE.to_string()))
}

#[cfg(test)]
mod test_config;
#[allow(unused_imports)]
#[cfg(test)]
pub use test_config::new_test_config;
