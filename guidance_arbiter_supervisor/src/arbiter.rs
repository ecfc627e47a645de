//! The guidance arbiter as seen by the host runtime.
//!
//! One `GuidanceArbiter` owns:
//! - the belief store and the guided-task state
//! - the attention sample buffers and the cycle clock
//! - the attached guidance sinks and the counterfactual sink
//! - the optional belief log
//!
//! It never blocks and never spawns. The host calls `decide` (or `tick`) once per cycle and
//! routes attention samples in between with `on_attention_sample`. All methods take
//! `&mut self`; a multi-threaded host must serialize access itself.

use std::collections::BTreeSet;
use std::fmt;

use guidance_arbiter_core::{
    attending_tasks, decide_guidance, AcceptabilityChange, AttentionHistory, AttentionSample,
    BeliefSnapshot, BeliefStore, CycleClock, GuidanceAction, GuidanceCfg, GuidanceError,
    GuidanceState, Result, TaskId, Timestamp,
};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::{debug, info, warn};

use crate::adapter::AcceptabilitySource;
use crate::sink::{BeliefLog, CounterfactualSink, GuidanceSink};

pub struct GuidanceArbiterBuilder {
    cfg: GuidanceCfg,
    tasks: Vec<TaskId>,
    actuators: Vec<Box<dyn GuidanceSink>>,
    belief_log: Option<Box<dyn BeliefLog>>,
    rng: Option<Box<dyn RngCore>>,
}

impl GuidanceArbiterBuilder {
    /// Attach a real guidance actuator. All attached actuators receive the same effects.
    pub fn actuator(mut self, sink: impl GuidanceSink + 'static) -> Self {
        self.actuators.push(Box::new(sink));
        self
    }

    pub fn belief_log(mut self, log: impl BeliefLog + 'static) -> Self {
        self.belief_log = Some(Box::new(log));
        self
    }

    /// Random source for `BreakTies::Random`. Defaults to an entropy-seeded `StdRng`.
    pub fn rng(mut self, rng: impl RngCore + 'static) -> Self {
        self.rng = Some(Box::new(rng));
        self
    }

    pub fn build(self) -> Result<GuidanceArbiter> {
        self.cfg.validate()?;
        let beliefs = BeliefStore::new(self.tasks)?;
        if self.actuators.is_empty() {
            return Err(GuidanceError::MissingActuator);
        }
        if self.belief_log.is_none() {
            warn!("no belief log attached, belief snapshots will not be recorded");
        }
        let rng: Box<dyn RngCore> = match self.rng {
            Some(rng) => rng,
            None => Box::new(StdRng::from_entropy()),
        };

        info!(
            break_ties = %self.cfg.break_ties,
            grace_mode = %self.cfg.grace_mode,
            attention_mode = %self.cfg.attention_mode,
            grace_period = self.cfg.grace_period,
            counter_factual = self.cfg.counter_factual,
            actuators = self.actuators.len(),
            "guidance arbiter ready"
        );

        Ok(GuidanceArbiter {
            history: AttentionHistory::new(self.cfg.sample_history_size),
            clock: CycleClock::new(self.cfg.cycle_capacity()),
            cfg: self.cfg,
            state: GuidanceState::default(),
            beliefs,
            attending: BTreeSet::new(),
            actuators: self.actuators,
            counterfactual: CounterfactualSink::new(),
            belief_log: self.belief_log,
            logged_revision: None,
            rng,
        })
    }
}

pub struct GuidanceArbiter {
    cfg: GuidanceCfg,
    state: GuidanceState,
    beliefs: BeliefStore,
    history: AttentionHistory,
    clock: CycleClock,
    /// Attention as resolved in the most recent cycle.
    attending: BTreeSet<TaskId>,
    actuators: Vec<Box<dyn GuidanceSink>>,
    counterfactual: CounterfactualSink,
    belief_log: Option<Box<dyn BeliefLog>>,
    logged_revision: Option<u64>,
    rng: Box<dyn RngCore>,
}

impl fmt::Debug for GuidanceArbiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuidanceArbiter")
            .field("cfg", &self.cfg)
            .field("state", &self.state)
            .field("beliefs", &self.beliefs)
            .field("attending", &self.attending)
            .field("actuators", &self.actuators.iter().map(|a| a.name()).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl GuidanceArbiter {
    /// Start building an arbiter for `tasks`. Every task the arbiter will ever see must be
    /// listed here.
    pub fn builder(
        cfg: GuidanceCfg,
        tasks: impl IntoIterator<Item = TaskId>,
    ) -> GuidanceArbiterBuilder {
        GuidanceArbiterBuilder {
            cfg,
            tasks: tasks.into_iter().collect(),
            actuators: Vec::new(),
            belief_log: None,
            rng: None,
        }
    }

    pub fn cfg(&self) -> &GuidanceCfg {
        &self.cfg
    }

    pub fn guided_task(&self) -> Option<&TaskId> {
        self.state.guided()
    }

    pub fn beliefs(&self) -> &BeliefStore {
        &self.beliefs
    }

    /// Tasks attended as of the last `decide`.
    pub fn attending(&self) -> &BTreeSet<TaskId> {
        &self.attending
    }

    pub fn counterfactual(&self) -> &CounterfactualSink {
        &self.counterfactual
    }

    pub fn snapshot(&self, now: Timestamp) -> BeliefSnapshot {
        self.beliefs.snapshot(now, self.state.guided())
    }

    /// Entry point for the event router. Samples are only read at the next `decide`.
    pub fn on_attention_sample(&mut self, sample: AttentionSample) {
        self.history.push(sample);
    }

    /// Apply one acceptability observation for `task`, taken at cycle start `now`.
    pub fn observe(
        &mut self,
        task: &str,
        is_active: bool,
        is_acceptable: bool,
        now: Timestamp,
    ) -> Result<AcceptabilityChange> {
        let change = self.beliefs.observe(task, is_active, is_acceptable, now)?;
        match change {
            AcceptabilityChange::BecameAcceptable => {
                info!(task, acceptable = true, "task acceptability")
            }
            AcceptabilityChange::BecameUnacceptable => {
                info!(task, acceptable = false, "task acceptability")
            }
            AcceptabilityChange::Unchanged => {}
        }
        self.flush_beliefs(now)?;
        Ok(change)
    }

    /// Poll each source for its whole-task state. A failing source aborts the poll.
    pub fn observe_sources(
        &mut self,
        sources: &[&dyn AcceptabilitySource],
        now: Timestamp,
    ) -> Result<()> {
        for source in sources {
            let is_active = source.is_active(None)?;
            let is_acceptable = source.is_acceptable(None)?;
            self.observe(source.task().as_str(), is_active, is_acceptable, now)?;
        }
        Ok(())
    }

    /// Run one cycle starting at `now` and dispatch its effect, if any.
    ///
    /// Errors from sinks propagate unchanged. The cycle clock, attention and `last_attended`
    /// advance regardless; the guided state only changes once every actuator accepted the
    /// effect. A rejected show is withdrawn from the actuators that had accepted it, and a
    /// rejected hide leaves the task guided so a later cycle hides it again.
    pub fn decide(&mut self, now: Timestamp) -> Result<GuidanceAction> {
        self.clock.begin(now);
        let window_start = self
            .clock
            .cycle_start(self.cfg.fixation_window_cycles)
            .unwrap_or(now);

        let attending =
            attending_tasks(self.cfg.attention_mode, &self.history, window_start, &self.beliefs);
        if attending != self.attending {
            match attending.iter().next() {
                Some(task) => debug!(task = %task, "attending"),
                None => debug!("attending none"),
            }
            self.attending = attending;
        }

        let action = decide_guidance(
            &self.cfg,
            &self.state,
            &mut self.beliefs,
            &self.attending,
            now,
            &mut *self.rng,
        )?;

        match &action {
            GuidanceAction::Show(task) => self.show_guidance(task, now)?,
            GuidanceAction::Hide(task) => self.hide_guidance(task, now)?,
            GuidanceAction::None => {}
        }
        self.state.apply(&action);
        self.flush_beliefs(now)?;
        Ok(action)
    }

    /// `observe_sources` followed by `decide`, both at `now`.
    pub fn tick(
        &mut self,
        now: Timestamp,
        sources: &[&dyn AcceptabilitySource],
    ) -> Result<GuidanceAction> {
        self.observe_sources(sources, now)?;
        self.decide(now)
    }

    fn show_guidance(&mut self, task: &TaskId, now: Timestamp) -> Result<()> {
        if self.cfg.counter_factual {
            self.counterfactual.show_guidance(task)?;
        } else {
            let rejected = self
                .actuators
                .iter_mut()
                .enumerate()
                .find_map(|(i, actuator)| actuator.show_guidance(task).err().map(|e| (i, e)));
            if let Some((accepted, err)) = rejected {
                self.withdraw(task, accepted);
                return Err(err);
            }
        }
        self.beliefs.set_guidance_start(task.as_str(), now)?;
        self.beliefs.set_guided(task.as_str(), true)?;
        let counter_factual = self.cfg.counter_factual;
        info!(task = %task, time = now, counter_factual, "show guidance");
        Ok(())
    }

    /// Hide `task` on the first `accepted` actuators after a later one rejected the show.
    fn withdraw(&mut self, task: &TaskId, accepted: usize) {
        for actuator in &mut self.actuators[..accepted] {
            if let Err(err) = actuator.hide_guidance(task) {
                warn!(actuator = actuator.name(), task = %task, error = %err, "withdraw guidance");
            }
        }
    }

    fn hide_guidance(&mut self, task: &TaskId, now: Timestamp) -> Result<()> {
        if self.cfg.counter_factual {
            self.counterfactual.hide_guidance(task)?;
        } else {
            let mut first_err = None;
            for actuator in &mut self.actuators {
                if let Err(err) = actuator.hide_guidance(task) {
                    if first_err.is_none() {
                        first_err = Some(err);
                    }
                }
            }
            if let Some(err) = first_err {
                return Err(err);
            }
        }
        self.beliefs.set_guidance_end(task.as_str(), now)?;
        self.beliefs.set_guided(task.as_str(), false)?;
        let counter_factual = self.cfg.counter_factual;
        info!(task = %task, time = now, counter_factual, "hide guidance");
        Ok(())
    }

    fn flush_beliefs(&mut self, now: Timestamp) -> Result<()> {
        let revision = self.beliefs.revision();
        if self.logged_revision == Some(revision) {
            return Ok(());
        }
        if let Some(log) = self.belief_log.as_mut() {
            log.log_beliefs(&self.beliefs.snapshot(now, self.state.guided()))?;
        }
        self.logged_revision = Some(revision);
        Ok(())
    }
}
