use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GuidanceError;

/// Seconds on the host's cycle clock. Only differences between timestamps are meaningful.
pub type Timestamp = f64;

pub const TASK_TRACKING: &str = "tracking";
pub const TASK_SYSTEM_MONITORING: &str = "system_monitoring";
pub const TASK_RESOURCE_MANAGEMENT: &str = "resource_management";

/// Identifier of one monitored task.
///
/// Always non-empty and free of whitespace, so it can double as an element id in the UI
/// layer that renders guidance.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Result<Self, GuidanceError> {
        let id = id.into();
        if id.is_empty() || id.chars().any(char::is_whitespace) {
            return Err(GuidanceError::InvalidTaskId(id));
        }
        Ok(Self(id))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn tracking() -> Self {
        TaskId(TASK_TRACKING.to_string())
    }

    pub fn system_monitoring() -> Self {
        TaskId(TASK_SYSTEM_MONITORING.to_string())
    }

    pub fn resource_management() -> Self {
        TaskId(TASK_RESOURCE_MANAGEMENT.to_string())
    }

    /// The three tasks of the standard multi-task battery.
    pub fn standard_tasks() -> Vec<TaskId> {
        vec![Self::tracking(), Self::system_monitoring(), Self::resource_management()]
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TaskId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for TaskId {
    type Err = GuidanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskId::new(s)
    }
}

impl TryFrom<String> for TaskId {
    type Error = GuidanceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TaskId::new(value)
    }
}

impl From<TaskId> for String {
    fn from(id: TaskId) -> Self {
        id.0
    }
}
