//! Attention resolution: which monitored task (if any) the user is attending right now.

use std::collections::{BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::belief::BeliefStore;
use crate::cfg::AttentionMode;
use crate::task::{TaskId, Timestamp};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleSource {
    Mouse,
    Gaze,
    Fixation,
}

/// One pointer or eye sample as routed in by the event router.
///
/// `targets` are the ids of the UI elements under the sample position, innermost first.
/// Most of them are not tasks; only ids that match a monitored task count.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttentionSample {
    pub source: SampleSource,
    pub timestamp: Timestamp,
    pub targets: Vec<String>,
    /// Set by the fixation filter on eye samples.
    #[serde(default)]
    pub fixated: bool,
}

impl AttentionSample {
    pub fn mouse(
        timestamp: Timestamp,
        targets: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self::new(SampleSource::Mouse, timestamp, targets, false)
    }

    pub fn gaze(
        timestamp: Timestamp,
        targets: impl IntoIterator<Item = impl Into<String>>,
        fixated: bool,
    ) -> Self {
        Self::new(SampleSource::Gaze, timestamp, targets, fixated)
    }

    pub fn fixation(
        timestamp: Timestamp,
        targets: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self::new(SampleSource::Fixation, timestamp, targets, true)
    }

    fn new(
        source: SampleSource,
        timestamp: Timestamp,
        targets: impl IntoIterator<Item = impl Into<String>>,
        fixated: bool,
    ) -> Self {
        Self {
            source,
            timestamp,
            targets: targets.into_iter().map(Into::into).collect(),
            fixated,
        }
    }

    #[inline]
    pub fn is_eye(&self) -> bool {
        matches!(self.source, SampleSource::Gaze | SampleSource::Fixation)
    }

    #[inline]
    pub fn is_fixation(&self) -> bool {
        self.source == SampleSource::Fixation || (self.source == SampleSource::Gaze && self.fixated)
    }

    /// First target that is a monitored task.
    pub fn task_target(&self, beliefs: &BeliefStore) -> Option<TaskId> {
        self.targets
            .iter()
            .find_map(|t| beliefs.task_id(t))
            .cloned()
    }
}

/// Bounded newest-first buffers of recent samples, one per modality.
#[derive(Clone, Debug)]
pub struct AttentionHistory {
    pointer: VecDeque<AttentionSample>,
    eye: VecDeque<AttentionSample>,
    capacity: usize,
}

impl AttentionHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            pointer: VecDeque::with_capacity(capacity),
            eye: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: AttentionSample) {
        let buf = if sample.is_eye() { &mut self.eye } else { &mut self.pointer };
        buf.push_front(sample);
        buf.truncate(self.capacity);
    }

    pub fn latest_pointer(&self) -> Option<&AttentionSample> {
        self.pointer.front()
    }

    pub fn latest_eye(&self) -> Option<&AttentionSample> {
        self.eye.front()
    }

    /// Eye samples strictly newer than `start`, newest first.
    pub fn eye_since(&self, start: Timestamp) -> impl Iterator<Item = &AttentionSample> {
        self.eye.iter().take_while(move |s| s.timestamp > start)
    }

    pub fn len(&self) -> usize {
        self.pointer.len() + self.eye.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Start times of the most recent cycles, newest first.
#[derive(Clone, Debug)]
pub struct CycleClock {
    starts: VecDeque<Timestamp>,
    capacity: usize,
}

impl CycleClock {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            starts: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn begin(&mut self, now: Timestamp) {
        self.starts.push_front(now);
        self.starts.truncate(self.capacity);
    }

    pub fn current(&self) -> Option<Timestamp> {
        self.starts.front().copied()
    }

    /// Start of the cycle `index` cycles ago. Clamped to the oldest recorded cycle, so during
    /// the first few cycles this is simply the first cycle start.
    pub fn cycle_start(&self, index: usize) -> Option<Timestamp> {
        if self.starts.is_empty() {
            return None;
        }
        let index = index.min(self.starts.len() - 1);
        self.starts.get(index).copied()
    }
}

/// Resolve the attended task. The result holds at most one task.
///
/// `window_start` only matters for `AttentionMode::Fixation`: samples at or before it are not
/// considered.
pub fn attending_tasks(
    mode: AttentionMode,
    history: &AttentionHistory,
    window_start: Timestamp,
    beliefs: &BeliefStore,
) -> BTreeSet<TaskId> {
    let sample = match mode {
        AttentionMode::Mouse => history.latest_pointer(),
        AttentionMode::Gaze => history.latest_eye(),
        AttentionMode::Fixation => history.eye_since(window_start).find(|s| s.is_fixation()),
    };
    sample
        .and_then(|s| s.task_target(beliefs))
        .into_iter()
        .collect()
}
