//! Error types for the guidance arbiter.
//!
//! `ConfigError` is raised once, when a configuration is validated, and is never recovered.
//! `GuidanceError` covers everything else, including failures reported by collaborators
//! (actuators, acceptability sources, belief logs) during a cycle.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GuidanceError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid argument: `{field}` {value:?} must be one of {expected:?}")]
    InvalidChoice {
        field: &'static str,
        value: String,
        expected: &'static [&'static str],
    },

    #[error("Invalid argument: `grace_period` {0} must be a finite value >= 0")]
    InvalidGracePeriod(f64),

    #[error("Invalid argument: `sample_history_size` must be > 0")]
    EmptySampleHistory,

    #[error(
        "Invalid argument: `fixation_window_cycles` {window} must be less than the cycle history \
         size {capacity}"
    )]
    FixationWindowTooLarge { window: usize, capacity: usize },

    #[error("Invalid argument: at least one monitored task is required")]
    NoTasks,

    #[error("Invalid argument: task `{0}` is listed more than once")]
    DuplicateTask(String),
}

#[derive(Error, Debug)]
pub enum GuidanceError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("No guidance actuator attached, guidance could never be shown")]
    MissingActuator,

    #[error("Invalid subtask: `{subtask}` doesn't exist for task `{task}`")]
    UnknownSubtask { task: String, subtask: String },

    #[error("Unknown task: `{0}` is not monitored by this arbiter")]
    UnknownTask(String),

    #[error("Invalid task id: {0:?}")]
    InvalidTaskId(String),

    #[error("Guidance actuator `{actuator}` failed: {message}")]
    Actuator { actuator: String, message: String },

    #[error("Belief log failed: {0}")]
    BeliefLog(String),
}
