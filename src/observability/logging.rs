//! Structured logging.
//!
//! # Design Decisions
//! - Uses the tracing crate for structured events
//! - Level configurable through `RUST_LOG`, defaulting to info for the
//!   charm and warn for everything else
//! - Hook output goes to stderr so stdout stays free for status JSON

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global subscriber. Call once, before any hook logic.
pub fn init() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "haproxy_charm=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
