use std::collections::BTreeSet;

use crate::belief::BeliefStore;
use crate::cfg::GraceMode;
use crate::error::Result;
use crate::task::{TaskId, Timestamp};

/// Whether a cooldown measured as `since` has run out. An event that never happened counts as
/// elapsed.
#[inline]
fn elapsed_or_never(since: Option<f64>, grace_period: f64) -> bool {
    since.map_or(true, |s| s > grace_period)
}

/// Keep the candidates whose cooldown under `mode` has elapsed at `now`.
///
/// `GraceMode::GuidanceAny` is all-or-nothing: one recent guidance on any task blocks every
/// candidate. `GraceMode::Failure` treats a missing failure start as not elapsed.
pub fn grace_period_over(
    candidates: BTreeSet<TaskId>,
    mode: GraceMode,
    grace_period: f64,
    beliefs: &BeliefStore,
    now: Timestamp,
) -> Result<BTreeSet<TaskId>> {
    match mode {
        GraceMode::GuidanceAny => {
            let since = beliefs.time_since_guidance_start(None, now)?;
            if elapsed_or_never(since, grace_period) {
                Ok(candidates)
            } else {
                Ok(BTreeSet::new())
            }
        }
        GraceMode::GuidanceTask => retain(candidates, |t| {
            let since = beliefs.time_since_guidance_start(Some(t.as_str()), now)?;
            Ok(elapsed_or_never(since, grace_period))
        }),
        GraceMode::Attention => retain(candidates, |t| {
            let since = beliefs.time_since_last_attended(t.as_str(), now)?;
            Ok(elapsed_or_never(since, grace_period))
        }),
        GraceMode::Failure => retain(candidates, |t| {
            let since = beliefs.time_since_failure_start(Some(t.as_str()), now)?;
            Ok(matches!(since, Some(s) if s > grace_period))
        }),
    }
}

fn retain<F>(candidates: BTreeSet<TaskId>, mut keep: F) -> Result<BTreeSet<TaskId>>
where
    F: FnMut(&TaskId) -> Result<bool>,
{
    let mut out = BTreeSet::new();
    for t in candidates {
        if keep(&t)? {
            out.insert(t);
        }
    }
    Ok(out)
}
