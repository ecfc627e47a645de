use std::collections::BTreeSet;

use rand::seq::IteratorRandom;
use rand::Rng;

use crate::belief::BeliefStore;
use crate::cfg::BreakTies;
use crate::error::Result;
use crate::task::{TaskId, Timestamp};

/// Pick the one task to guide out of `candidates`, or `None` if there are none.
///
/// `BreakTies::Longest` keeps the first candidate (ascending id order) among equals, and ranks
/// a task with no recorded failure start below every task that has one.
pub fn break_tie<R>(
    candidates: &BTreeSet<TaskId>,
    method: BreakTies,
    beliefs: &BeliefStore,
    now: Timestamp,
    rng: &mut R,
) -> Result<Option<TaskId>>
where
    R: Rng + ?Sized,
{
    if candidates.is_empty() {
        return Ok(None);
    }
    match method {
        BreakTies::Random => Ok(candidates.iter().choose(rng).cloned()),
        BreakTies::Longest => {
            let mut best: Option<(&TaskId, Option<f64>)> = None;
            for t in candidates {
                let since = beliefs.time_since_failure_start(Some(t.as_str()), now)?;
                let better = match best {
                    None => true,
                    Some((_, best_since)) => since > best_since,
                };
                if better {
                    best = Some((t, since));
                }
            }
            Ok(best.map(|(t, _)| t.clone()))
        }
    }
}
