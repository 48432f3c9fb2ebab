//! Reconciliation engine subsystem.
//!
//! # Data Flow
//! ```text
//! lifecycle event
//!     → reconciler.rs (process_configs / clean_config)
//!       features.rs  (stats, redirect, TLS, timeout toggles)
//!         → model::ConfigStore (load → mutate → save)
//!         → system::SystemOps  (service reload, port bookkeeping)
//!     → ports.rs (converge externally-open ports with bound frontends)
//! ```
//!
//! # Design Decisions
//! - One save and one service reload per pass: every mutating operation
//!   takes a `save` flag so multi-step sequences defer persistence
//! - Conflicts are data (`CfgStatus`), not errors; parse/IO/collaborator
//!   failures are errors
//! - Collaborators are injected as trait objects; the engine owns no
//!   ambient process state

pub mod names;

mod features;
mod ports;
mod reconciler;

use std::io;

use thiserror::Error;

use crate::config::CharmConfig;
use crate::model::{ConfigStore, Document, StoreError};
use crate::system::{CertIssuer, Scheduler, SystemError, SystemOps};

/// Source networks considered "local" for the stats page and the
/// acl-local deny rule.
pub(crate) const LOCAL_NETWORKS: &str = "src 10.0.0.0/8 172.16.0.0/12 192.168.0.0/16 \
     127.0.0.0/8 fd00::/8 fe80::/10 ::1/128";

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    System(#[from] SystemError),
    #[error("certificate material error: {0}")]
    Cert(#[from] io::Error),
    #[error("no certificate domains configured")]
    NoDomains,
}

/// Outcome of a relation batch: applied, or stopped at a conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfgStatus {
    pub ok: bool,
    pub message: String,
}

impl CfgStatus {
    pub fn applied() -> Self {
        Self {
            ok: true,
            message: "configuration applied".to_string(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// The reconciliation engine: keeps the proxy configuration document in
/// sync with relation registrations and charm-level feature toggles.
pub struct ProxyEngine {
    charm: CharmConfig,
    store: ConfigStore,
    system: Box<dyn SystemOps>,
    certs: Box<dyn CertIssuer>,
    scheduler: Box<dyn Scheduler>,
}

impl ProxyEngine {
    pub fn new(
        charm: CharmConfig,
        system: Box<dyn SystemOps>,
        certs: Box<dyn CertIssuer>,
        scheduler: Box<dyn Scheduler>,
    ) -> Self {
        let store = ConfigStore::new(&charm.proxy_config_path);
        Self {
            charm,
            store,
            system,
            certs,
            scheduler,
        }
    }

    pub fn charm(&self) -> &CharmConfig {
        &self.charm
    }

    pub fn scheduler(&self) -> &dyn Scheduler {
        self.scheduler.as_ref()
    }

    /// The current document, loading from disk on first access.
    pub fn document(&mut self) -> Result<&Document, Error> {
        Ok(self.store.document()?)
    }

    pub fn document_mut(&mut self) -> Result<&mut Document, Error> {
        Ok(self.store.document_mut()?)
    }

    /// Drop the cached document so the next access re-reads the file.
    pub fn invalidate(&mut self) {
        self.store.invalidate();
    }

    /// Persist the document, reload the proxy service and re-sync the
    /// externally-opened ports.
    pub fn save_config(&mut self) -> Result<(), Error> {
        self.store.save()?;
        self.system.service_reload(&self.charm.service)?;
        self.update_ports()
    }
}
