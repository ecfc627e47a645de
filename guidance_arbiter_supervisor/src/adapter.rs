//! Acceptability adapters: how the arbiter learns whether each task is active and acceptable.
//!
//! Deciding *why* a task is unacceptable (a tank out of range, a light in the wrong state) is
//! the job of the task simulations. They report one boolean per sub-condition through
//! `SubtaskAcceptability` or their own `AcceptabilitySource` implementation.

use std::collections::BTreeMap;

use guidance_arbiter_core::{GuidanceError, Result, TaskId};

/// Per-task acceptability, queried once per cycle.
///
/// `subtask` of `None` (or the task's own id) means the task as a whole, which is acceptable
/// only if every sub-condition is.
pub trait AcceptabilitySource {
    fn task(&self) -> &TaskId;

    fn is_active(&self, subtask: Option<&str>) -> Result<bool>;

    fn is_acceptable(&self, subtask: Option<&str>) -> Result<bool>;
}

/// A task made of named boolean sub-conditions. Sub-condition names are qualified with the task
/// id, e.g. `system_monitoring.light-1`, and only the qualified name is accepted.
///
/// A task registered without sub-conditions has one whole-task condition, addressed by the task
/// id itself.
#[derive(Clone, Debug)]
pub struct SubtaskAcceptability {
    task: TaskId,
    active: bool,
    acceptable: bool,
    subtasks: BTreeMap<String, bool>,
}

impl SubtaskAcceptability {
    /// All conditions start acceptable and the task starts active.
    pub fn new<I, S>(task: TaskId, subtasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let subtasks = subtasks
            .into_iter()
            .map(|s| (format!("{}.{}", task, s.as_ref()), true))
            .collect();
        Self {
            task,
            active: true,
            acceptable: true,
            subtasks,
        }
    }

    /// Two lights and four sliders.
    pub fn system_monitoring() -> Self {
        Self::new(
            TaskId::system_monitoring(),
            ["light-1", "light-2", "slider-1", "slider-2", "slider-3", "slider-4"],
        )
    }

    /// No sub-conditions: the target is inside the central box or it is not.
    pub fn tracking() -> Self {
        Self::new(TaskId::tracking(), std::iter::empty::<&str>())
    }

    /// The two main fuel tanks.
    pub fn resource_management() -> Self {
        Self::new(TaskId::resource_management(), ["tank-a", "tank-b"])
    }

    pub fn subtasks(&self) -> impl Iterator<Item = &str> {
        self.subtasks.keys().map(String::as_str)
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Update one sub-condition by qualified name, or the whole-task condition by task id when
    /// the task has no sub-conditions.
    pub fn set_acceptable(&mut self, subtask: &str, acceptable: bool) -> Result<()> {
        if self.subtasks.is_empty() && subtask == self.task.as_str() {
            self.acceptable = acceptable;
            return Ok(());
        }
        if !self.subtasks.contains_key(subtask) {
            return Err(self.unknown(subtask));
        }
        if let Some(slot) = self.subtasks.get_mut(subtask) {
            *slot = acceptable;
        }
        Ok(())
    }

    fn lookup(&self, subtask: &str) -> Result<bool> {
        self.subtasks
            .get(subtask)
            .copied()
            .ok_or_else(|| self.unknown(subtask))
    }

    fn unknown(&self, subtask: &str) -> GuidanceError {
        GuidanceError::UnknownSubtask {
            task: self.task.to_string(),
            subtask: subtask.to_string(),
        }
    }
}

impl AcceptabilitySource for SubtaskAcceptability {
    fn task(&self) -> &TaskId {
        &self.task
    }

    fn is_active(&self, subtask: Option<&str>) -> Result<bool> {
        if let Some(s) = subtask.filter(|s| *s != self.task.as_str()) {
            self.lookup(s)?;
        }
        Ok(self.active)
    }

    fn is_acceptable(&self, subtask: Option<&str>) -> Result<bool> {
        match subtask {
            Some(s) if s != self.task.as_str() => self.lookup(s),
            _ => Ok(self.acceptable && self.subtasks.values().all(|ok| *ok)),
        }
    }
}
