use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How to pick one task when several are eligible for guidance in the same cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakTies {
    #[default]
    Random,
    /// The task that has been unacceptable for the longest time.
    Longest,
}

/// Which cooldown gates (re)showing guidance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraceMode {
    /// Time since guidance was last shown on the same task.
    GuidanceTask,
    /// Time since guidance was last shown on any task.
    GuidanceAny,
    /// Time since the task last became unacceptable.
    #[default]
    Failure,
    /// Time since the user last attended the task.
    Attention,
}

/// Signal used to infer which task the user is looking at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttentionMode {
    #[default]
    Fixation,
    Gaze,
    Mouse,
}

macro_rules! choice_enum {
    ($ty:ident, $field:literal, [$($variant:ident => $name:literal),+ $(,)?]) => {
        impl $ty {
            pub const VALUES: &'static [&'static str] = &[$($name),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($ty::$variant => $name),+
                }
            }
        }

        impl FromStr for $ty {
            type Err = ConfigError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok($ty::$variant),)+
                    other => Err(ConfigError::InvalidChoice {
                        field: $field,
                        value: other.to_string(),
                        expected: $ty::VALUES,
                    }),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

choice_enum!(BreakTies, "break_ties", [Random => "random", Longest => "longest"]);
choice_enum!(GraceMode, "grace_mode", [
    GuidanceTask => "guidance_task",
    GuidanceAny => "guidance_any",
    Failure => "failure",
    Attention => "attention",
]);
choice_enum!(AttentionMode, "attention_mode", [
    Fixation => "fixation",
    Gaze => "gaze",
    Mouse => "mouse",
]);

/// The cycle clock never keeps fewer cycle starts than this.
pub const MIN_CYCLE_HISTORY: usize = 10;

/// Immutable arbiter configuration. Reconfiguring means building a new arbiter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GuidanceCfg {
    pub break_ties: BreakTies,
    pub grace_mode: GraceMode,
    pub attention_mode: AttentionMode,
    /// Seconds; compared with a strict `>`.
    pub grace_period: f64,
    /// Route effects to the counterfactual sink only.
    pub counter_factual: bool,
    /// How many cycles back the fixation scan reaches.
    pub fixation_window_cycles: usize,
    /// Capacity of each attention sample buffer.
    pub sample_history_size: usize,
    /// Requested cycle clock capacity, raised to `MIN_CYCLE_HISTORY` if smaller.
    pub cycle_history_size: usize,
}

impl Default for GuidanceCfg {
    fn default() -> Self {
        Self {
            break_ties: BreakTies::Random,
            grace_mode: GraceMode::Failure,
            attention_mode: AttentionMode::Fixation,
            grace_period: 3.0,
            counter_factual: false,
            fixation_window_cycles: 3,
            sample_history_size: 100,
            cycle_history_size: MIN_CYCLE_HISTORY,
        }
    }
}

impl GuidanceCfg {
    #[inline]
    pub fn cycle_capacity(&self) -> usize {
        self.cycle_history_size.max(MIN_CYCLE_HISTORY)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.grace_period.is_finite() || self.grace_period < 0.0 {
            return Err(ConfigError::InvalidGracePeriod(self.grace_period));
        }
        if self.sample_history_size == 0 {
            return Err(ConfigError::EmptySampleHistory);
        }
        let capacity = self.cycle_capacity();
        if self.fixation_window_cycles >= capacity {
            return Err(ConfigError::FixationWindowTooLarge {
                window: self.fixation_window_cycles,
                capacity,
            });
        }
        Ok(())
    }
}
