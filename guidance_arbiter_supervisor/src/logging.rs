//! Tracing setup for hosts that do not install their own subscriber.
//!
//! Guidance decisions, acceptability transitions and counterfactual effects are emitted as
//! `tracing` events. Belief snapshots for offline analysis go through `sink::BeliefLog`
//! instead and are unaffected by `RUST_LOG`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize a tracing subscriber writing compact lines to stderr.
///
/// Reads `RUST_LOG`. Defaults to `warn` if unset.
///
/// # Example
/// ```bash
/// RUST_LOG=guidance_arbiter_supervisor=info,counterfactual=info my-host
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
