//! Per-task beliefs held by one arbiter.
//!
//! The store is built eagerly from the monitored task list. Every lookup of an id that was not
//! registered fails with `GuidanceError::UnknownTask` rather than creating a fresh record, so a
//! mistyped id can never turn into a phantom task.
//!
//! "Never happened" is `None`. All `time_since_*` helpers return `None` in that case and the
//! callers decide explicitly what absence means for them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, GuidanceError, Result};
use crate::task::{TaskId, Timestamp};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub is_active: bool,
    pub is_acceptable: bool,
    pub is_guided: bool,
    /// Cycle start at which the task last went from acceptable to unacceptable.
    pub failure_start: Option<Timestamp>,
    pub guidance_start: Option<Timestamp>,
    pub guidance_end: Option<Timestamp>,
    pub last_attended: Option<Timestamp>,
}

impl Default for TaskRecord {
    fn default() -> Self {
        Self {
            is_active: false,
            is_acceptable: true,
            is_guided: false,
            failure_start: None,
            guidance_start: None,
            guidance_end: None,
            last_attended: None,
        }
    }
}

/// Outcome of applying one acceptability observation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcceptabilityChange {
    Unchanged,
    BecameAcceptable,
    BecameUnacceptable,
}

/// Full copy of the beliefs, handed to the belief log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BeliefSnapshot {
    pub time: Timestamp,
    pub guided_task: Option<TaskId>,
    /// Sorted by task id.
    pub tasks: Vec<(TaskId, TaskRecord)>,
}

#[derive(Clone, Debug)]
pub struct BeliefStore {
    records: BTreeMap<TaskId, TaskRecord>,
    revision: u64,
}

impl BeliefStore {
    pub fn new<I>(tasks: I) -> std::result::Result<Self, ConfigError>
    where
        I: IntoIterator<Item = TaskId>,
    {
        let mut records = BTreeMap::new();
        for task in tasks {
            if records.contains_key(&task) {
                return Err(ConfigError::DuplicateTask(task.to_string()));
            }
            records.insert(task, TaskRecord::default());
        }
        if records.is_empty() {
            return Err(ConfigError::NoTasks);
        }
        Ok(Self { records, revision: 0 })
    }

    /// Monitored tasks in ascending id order.
    pub fn tasks(&self) -> impl Iterator<Item = &TaskId> {
        self.records.keys()
    }

    pub fn contains(&self, task: &str) -> bool {
        self.records.contains_key(task)
    }

    /// Resolve a raw id to the registered `TaskId`, if monitored.
    pub fn task_id(&self, task: &str) -> Option<&TaskId> {
        self.records.get_key_value(task).map(|(k, _)| k)
    }

    pub fn get(&self, task: &str) -> Result<&TaskRecord> {
        self.records
            .get(task)
            .ok_or_else(|| GuidanceError::UnknownTask(task.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TaskId, &TaskRecord)> {
        self.records.iter()
    }

    /// Bumped on every effective change; unchanged writes leave it alone.
    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn update<F>(&mut self, task: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut TaskRecord),
    {
        let record = self
            .records
            .get_mut(task)
            .ok_or_else(|| GuidanceError::UnknownTask(task.to_string()))?;
        let before = record.clone();
        f(record);
        if *record != before {
            self.revision += 1;
        }
        Ok(())
    }

    pub fn set_failure_start(&mut self, task: &str, t: Timestamp) -> Result<()> {
        self.update(task, |r| r.failure_start = Some(t))
    }

    pub fn set_guidance_start(&mut self, task: &str, t: Timestamp) -> Result<()> {
        self.update(task, |r| r.guidance_start = Some(t))
    }

    pub fn set_guidance_end(&mut self, task: &str, t: Timestamp) -> Result<()> {
        self.update(task, |r| r.guidance_end = Some(t))
    }

    pub fn set_last_attended(&mut self, task: &str, t: Timestamp) -> Result<()> {
        self.update(task, |r| r.last_attended = Some(t))
    }

    pub fn set_guided(&mut self, task: &str, guided: bool) -> Result<()> {
        self.update(task, |r| r.is_guided = guided)
    }

    /// Apply an acceptability observation taken at cycle start `now`.
    ///
    /// `failure_start` moves only on an acceptable -> unacceptable transition, so a task that
    /// stays unacceptable keeps its original failure start.
    pub fn observe(
        &mut self,
        task: &str,
        is_active: bool,
        is_acceptable: bool,
        now: Timestamp,
    ) -> Result<AcceptabilityChange> {
        let was_acceptable = self.get(task)?.is_acceptable;
        self.update(task, |r| {
            r.is_active = is_active;
            r.is_acceptable = is_acceptable;
            if was_acceptable && !is_acceptable {
                r.failure_start = Some(now);
            }
        })?;
        Ok(match (was_acceptable, is_acceptable) {
            (true, false) => AcceptabilityChange::BecameUnacceptable,
            (false, true) => AcceptabilityChange::BecameAcceptable,
            _ => AcceptabilityChange::Unchanged,
        })
    }

    /// `now - failure_start` for `task`, or since the most recent failure of any task.
    pub fn time_since_failure_start(
        &self,
        task: Option<&str>,
        now: Timestamp,
    ) -> Result<Option<f64>> {
        self.time_since(task, now, |r| r.failure_start)
    }

    /// `now - guidance_start` for `task`, or since guidance was last shown on any task.
    pub fn time_since_guidance_start(
        &self,
        task: Option<&str>,
        now: Timestamp,
    ) -> Result<Option<f64>> {
        self.time_since(task, now, |r| r.guidance_start)
    }

    pub fn time_since_last_attended(&self, task: &str, now: Timestamp) -> Result<Option<f64>> {
        self.time_since(Some(task), now, |r| r.last_attended)
    }

    fn time_since<F>(&self, task: Option<&str>, now: Timestamp, field: F) -> Result<Option<f64>>
    where
        F: Fn(&TaskRecord) -> Option<Timestamp>,
    {
        let latest = match task {
            Some(task) => field(self.get(task)?),
            None => self
                .records
                .values()
                .filter_map(&field)
                .fold(None, |acc: Option<Timestamp>, t| Some(acc.map_or(t, |a| a.max(t)))),
        };
        Ok(latest.map(|t| now - t))
    }

    pub fn snapshot(&self, now: Timestamp, guided_task: Option<&TaskId>) -> BeliefSnapshot {
        BeliefSnapshot {
            time: now,
            guided_task: guided_task.cloned(),
            tasks: self
                .records
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}
