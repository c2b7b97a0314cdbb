//! Structured logging setup. Installs a global `tracing` subscriber
//! honoring `RUST_LOG`, falling back to a sensible per-crate default.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber. Call once, at process start.
pub fn init() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lighthouse_pose_tracker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
