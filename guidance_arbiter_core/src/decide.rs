//guidance_arbiter_core/decide.rs

use std::collections::BTreeSet;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::belief::BeliefStore;
use crate::cfg::GuidanceCfg;
use crate::error::Result;
use crate::grace::grace_period_over;
use crate::task::{TaskId, Timestamp};
use crate::tiebreak::break_tie;

/// What the arbiter wants done this cycle. At most one effect per cycle.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum GuidanceAction {
    None,
    Show(TaskId),
    Hide(TaskId),
}

impl GuidanceAction {
    pub fn task(&self) -> Option<&TaskId> {
        match self {
            GuidanceAction::None => None,
            GuidanceAction::Show(t) | GuidanceAction::Hide(t) => Some(t),
        }
    }
}

/// Which task, if any, currently has guidance. Holding an `Option` makes "two guided tasks"
/// unrepresentable.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidanceState {
    guided: Option<TaskId>,
}

impl GuidanceState {
    #[inline]
    pub fn guided(&self) -> Option<&TaskId> {
        self.guided.as_ref()
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        self.guided.is_none()
    }

    /// Commit an action once every collaborator has accepted it.
    pub fn apply(&mut self, action: &GuidanceAction) {
        match action {
            GuidanceAction::None => {}
            GuidanceAction::Show(t) => {
                debug_assert!(self.guided.is_none(), "show while guiding {:?}", self.guided);
                self.guided = Some(t.clone());
            }
            GuidanceAction::Hide(t) => {
                if self.guided.as_ref() == Some(t) {
                    self.guided = None;
                }
            }
        }
    }
}

/// Tasks that are active, unacceptable and not currently attended.
pub fn unacceptable_unattended(
    beliefs: &BeliefStore,
    attending: &BTreeSet<TaskId>,
) -> BTreeSet<TaskId> {
    beliefs
        .iter()
        .filter(|(t, r)| r.is_active && !r.is_acceptable && !attending.contains(*t))
        .map(|(t, _)| t.clone())
        .collect()
}

/// One cycle of the guidance state machine, evaluated at cycle start `now`.
///
/// Records `last_attended` for the attended task, then either checks whether the current
/// guidance should be hidden (acceptable, inactive or attended) or, when idle, selects at
/// most one new task to guide. `state` is not modified; the caller applies the returned action
/// after dispatching it.
pub fn decide_guidance<R>(
    cfg: &GuidanceCfg,
    state: &GuidanceState,
    beliefs: &mut BeliefStore,
    attending: &BTreeSet<TaskId>,
    now: Timestamp,
    rng: &mut R,
) -> Result<GuidanceAction>
where
    R: Rng + ?Sized,
{
    for t in attending {
        beliefs.set_last_attended(t.as_str(), now)?;
    }

    if let Some(guided) = state.guided() {
        let record = beliefs.get(guided.as_str())?;
        // an inactive task gives the slot back too
        if record.is_acceptable || !record.is_active || attending.contains(guided) {
            return Ok(GuidanceAction::Hide(guided.clone()));
        }
        return Ok(GuidanceAction::None);
    }

    let candidates = unacceptable_unattended(beliefs, attending);
    if candidates.is_empty() {
        return Ok(GuidanceAction::None);
    }
    let candidates = grace_period_over(candidates, cfg.grace_mode, cfg.grace_period, beliefs, now)?;
    match break_tie(&candidates, cfg.break_ties, beliefs, now, rng)? {
        Some(t) => Ok(GuidanceAction::Show(t)),
        None => Ok(GuidanceAction::None),
    }
}
