pub mod error;
pub mod task;

pub mod attention;
pub mod belief;
pub mod cfg;
pub mod decide;
pub mod grace;
pub mod tiebreak;

pub use error::{ConfigError, GuidanceError, Result};
pub use task::{TaskId, Timestamp, TASK_RESOURCE_MANAGEMENT, TASK_SYSTEM_MONITORING, TASK_TRACKING};

pub use attention::{attending_tasks, AttentionHistory, AttentionSample, CycleClock, SampleSource};
pub use belief::{AcceptabilityChange, BeliefSnapshot, BeliefStore, TaskRecord};
pub use cfg::{AttentionMode, BreakTies, GraceMode, GuidanceCfg, MIN_CYCLE_HISTORY};
pub use decide::{decide_guidance, unacceptable_unattended, GuidanceAction, GuidanceState};
pub use grace::grace_period_over;
pub use tiebreak::break_tie;
