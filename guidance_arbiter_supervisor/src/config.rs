//! Guidance configuration stored as TOML, under a `[guidance]` table.
//!
//! Enum-valued knobs are plain strings in the file and are checked when the file is loaded, so
//! a typo fails at startup with the list of accepted values.

use std::fs;
use std::path::{Path, PathBuf};

use guidance_arbiter_core::{ConfigError, GuidanceCfg, GuidanceError, TaskId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::arbiter::{GuidanceArbiter, GuidanceArbiterBuilder};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Task(#[from] GuidanceError),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConfigFile {
    pub guidance: GuidanceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GuidanceConfig {
    /// Whether a guidance arbiter should be created at all.
    pub enable: bool,
    /// Compute and log guidance without showing it.
    pub counter_factual: bool,
    pub break_ties: String,
    pub grace_mode: String,
    pub attention_mode: String,
    pub grace_period: f64,
    pub fixation_window_cycles: usize,
    pub sample_history_size: usize,
    pub cycle_history_size: usize,
    /// Monitored task ids.
    pub tasks: Vec<String>,
}

impl Default for GuidanceConfig {
    fn default() -> Self {
        let cfg = GuidanceCfg::default();
        Self {
            enable: true,
            counter_factual: cfg.counter_factual,
            break_ties: cfg.break_ties.to_string(),
            grace_mode: cfg.grace_mode.to_string(),
            attention_mode: cfg.attention_mode.to_string(),
            grace_period: cfg.grace_period,
            fixation_window_cycles: cfg.fixation_window_cycles,
            sample_history_size: cfg.sample_history_size,
            cycle_history_size: cfg.cycle_history_size,
            tasks: TaskId::standard_tasks().into_iter().map(String::from).collect(),
        }
    }
}

impl GuidanceConfig {
    /// Parse and validate into the arbiter's typed configuration.
    pub fn to_cfg(&self) -> Result<GuidanceCfg, ConfigError> {
        let cfg = GuidanceCfg {
            break_ties: self.break_ties.parse()?,
            grace_mode: self.grace_mode.parse()?,
            attention_mode: self.attention_mode.parse()?,
            grace_period: self.grace_period,
            counter_factual: self.counter_factual,
            fixation_window_cycles: self.fixation_window_cycles,
            sample_history_size: self.sample_history_size,
            cycle_history_size: self.cycle_history_size,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn task_ids(&self) -> Result<Vec<TaskId>, GuidanceError> {
        self.tasks.iter().map(|t| TaskId::new(t.as_str())).collect()
    }

    /// A builder preloaded with this configuration; actuators still have to be attached.
    pub fn builder(&self) -> Result<GuidanceArbiterBuilder, LoadError> {
        Ok(GuidanceArbiter::builder(self.to_cfg()?, self.task_ids()?))
    }

    pub fn validate(&self) -> Result<(), LoadError> {
        self.to_cfg()?;
        let tasks = self.task_ids()?;
        guidance_arbiter_core::BeliefStore::new(tasks)?;
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns the defaults.
pub fn load_config(path: &Path) -> Result<GuidanceConfig, LoadError> {
    if !path.exists() {
        let cfg = GuidanceConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: ConfigFile = toml::from_str(&contents).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    file.guidance.validate()?;
    Ok(file.guidance)
}
