//! Observability subsystem.
//!
//! All subsystems emit structured tracing events; this module owns the
//! subscriber setup.

pub mod logging;
