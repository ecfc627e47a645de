//! Where guidance effects and belief snapshots go.
//!
//! Real actuators (arrow, box, ...) live in the rendering layer and implement `GuidanceSink`.
//! The arbiter always owns one `CounterfactualSink` in addition; in counterfactual mode it is
//! the only sink that receives effects.

use std::io::Write;

use guidance_arbiter_core::{BeliefSnapshot, GuidanceAction, GuidanceError, Result, TaskId};
use tracing::info;

/// Receiver of show/hide guidance effects.
pub trait GuidanceSink {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    fn show_guidance(&mut self, task: &TaskId) -> Result<()>;

    fn hide_guidance(&mut self, task: &TaskId) -> Result<()>;
}

/// Log-only sink. Records what would have been shown so counterfactual runs can be compared
/// with real ones offline.
#[derive(Debug, Default)]
pub struct CounterfactualSink {
    effects: Vec<GuidanceAction>,
}

impl CounterfactualSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every effect received so far, oldest first.
    pub fn effects(&self) -> &[GuidanceAction] {
        &self.effects
    }
}

impl GuidanceSink for CounterfactualSink {
    fn name(&self) -> &str {
        "counterfactual"
    }

    fn show_guidance(&mut self, task: &TaskId) -> Result<()> {
        info!(target: "counterfactual", task = %task, "show guidance");
        self.effects.push(GuidanceAction::Show(task.clone()));
        Ok(())
    }

    fn hide_guidance(&mut self, task: &TaskId) -> Result<()> {
        info!(target: "counterfactual", task = %task, "hide guidance");
        self.effects.push(GuidanceAction::Hide(task.clone()));
        Ok(())
    }
}

/// Receiver of full belief snapshots, for offline analysis.
pub trait BeliefLog {
    fn log_beliefs(&mut self, snapshot: &BeliefSnapshot) -> Result<()>;
}

/// Writes one JSON object per snapshot, newline separated.
#[derive(Debug)]
pub struct JsonLinesBeliefLog<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesBeliefLog<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> BeliefLog for JsonLinesBeliefLog<W> {
    fn log_beliefs(&mut self, snapshot: &BeliefSnapshot) -> Result<()> {
        let line =
            serde_json::to_string(snapshot).map_err(|e| GuidanceError::BeliefLog(e.to_string()))?;
        writeln!(self.out, "{line}").map_err(|e| GuidanceError::BeliefLog(e.to_string()))?;
        Ok(())
    }
}
