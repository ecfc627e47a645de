//! guidance_arbiter_supervisor
//!
//! Host-facing layer around `guidance_arbiter_core`.
//!
//! Responsibilities:
//! - own one arbiter's beliefs, guided state and attention buffers
//! - dispatch guidance effects to real actuators or the counterfactual sink
//! - feed acceptability observations in through adapters
//! - record belief snapshots and load configuration
//!
//! Non-goals:
//! - no rendering
//! - no async, no threads (the host drives one cycle at a time)

pub mod adapter;
pub mod arbiter;
pub mod config;
pub mod logging;
pub mod sink;

pub use adapter::{AcceptabilitySource, SubtaskAcceptability};

pub use arbiter::{GuidanceArbiter, GuidanceArbiterBuilder};

pub use config::{load_config, ConfigFile, GuidanceConfig, LoadError};

pub use sink::{BeliefLog, CounterfactualSink, GuidanceSink, JsonLinesBeliefLog};
