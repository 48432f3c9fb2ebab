//! HAProxy charm core: a reconciliation engine over haproxy.cfg.
//!
//! # Architecture Overview
//!
//! ```text
//!   hook event (CLI)
//!       │
//!       ▼
//!   ┌───────────┐     ┌─────────────────────────────────┐
//!   │ lifecycle │────▶│            engine               │
//!   └───────────┘     │  reconciler / features / ports  │
//!                     └──────┬──────────────────┬───────┘
//!                            │                  │
//!                            ▼                  ▼
//!                     ┌────────────┐     ┌────────────┐
//!                     │   model    │     │   system   │
//!                     │ parse/     │     │ service,   │
//!                     │ render/    │     │ ports,     │
//!                     │ store      │     │ certs, cron│
//!                     └────────────┘     └────────────┘
//! ```
//!
//! Relation data and charm config come in through [`config`]; every
//! mutation flows through the [`engine`] and is persisted by the
//! [`model`] store, followed by a service reload and port sync.

pub mod config;
pub mod engine;
pub mod lifecycle;
pub mod model;
pub mod observability;
pub mod system;

pub use config::CharmConfig;
pub use engine::{CfgStatus, ProxyEngine};
pub use lifecycle::Lifecycle;
