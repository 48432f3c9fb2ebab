//! Lifecycle orchestration: maps charm hook events onto engine
//! operations.
//!
//! # Data Flow
//! ```text
//! install          → seed config file, create ssl directory
//! configure        → apply every feature toggle, one save
//! relation-changed → validate payload → process_configs
//! relation-departed→ derive names → clean_config per record
//! stop             → disable stats and TLS termination
//! scheduled jobs   → renew-cert / renew-upnp / release-upnp
//! ```
//!
//! # Design Decisions
//! - The orchestrator owns the engine and exposes one method per hook;
//!   it holds no state of its own
//! - configure applies toggles with deferred saves and persists once,
//!   except TLS enablement which saves around its issuer round-trip
//! - Relation payloads are validated before any document mutation, so a
//!   bad record never leaves a half-applied batch behind

use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

use crate::config::{validate_relation, RelationConfig, ValidationError};
use crate::engine::{self, CfgStatus, ProxyEngine};
use crate::engine::names::batch_names;

/// Seed configuration written on install when no config file exists.
const DEFAULT_CONFIG: &str = "\
global
    log /dev/log local0
    log /dev/log local1 notice
    daemon

defaults
    log global
    mode http
    option httplog
    option dontlognull
    timeout connect 5000
    timeout client 50000
    timeout server 50000
";

const RENEW_UPNP_JOB: &str = "renew-upnp";

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Engine(#[from] engine::Error),
    #[error("failed to prepare {path}: {source}")]
    Setup { path: String, source: io::Error },
    #[error("invalid relation data: {}", format_errors(.0))]
    InvalidRelation(Vec<ValidationError>),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Hook-level entry points over the reconciliation engine.
pub struct Lifecycle {
    engine: ProxyEngine,
}

impl Lifecycle {
    pub fn new(engine: ProxyEngine) -> Self {
        Self { engine }
    }

    pub fn engine_mut(&mut self) -> &mut ProxyEngine {
        &mut self.engine
    }

    /// First-run setup: seed the proxy config file when absent and
    /// create the certificate directory.
    pub fn install(&mut self) -> Result<(), LifecycleError> {
        let config_path = self.engine.charm().proxy_config_path.clone();
        if !config_path.exists() {
            tracing::info!(path = %config_path.display(), "Seeding default configuration");
            if let Some(parent) = config_path.parent() {
                create_dir(parent)?;
            }
            fs::write(&config_path, DEFAULT_CONFIG).map_err(|source| LifecycleError::Setup {
                path: config_path.display().to_string(),
                source,
            })?;
        }
        create_dir(&self.engine.charm().ssl_path)?;
        Ok(())
    }

    /// Apply every charm-level feature toggle. Called on install and on
    /// every charm config change.
    pub fn configure(&mut self) -> Result<CfgStatus, LifecycleError> {
        let charm = self.engine.charm().clone();

        let stats_status = if charm.stats.enabled {
            self.engine.enable_stats(false)?
        } else {
            self.engine.disable_stats(false)?;
            CfgStatus::applied()
        };

        if charm.enable_https_redirect {
            self.engine.enable_redirect(false)?;
        } else {
            self.engine.disable_redirect(false)?;
        }

        if !charm.letsencrypt.enabled {
            self.engine.disable_letsencrypt(false)?;
        }

        self.engine.add_timeout_tunnel(false)?;
        self.engine.save_config()?;

        // TLS enablement talks to the issuer and saves on its own, so it
        // runs after the batched save.
        let tls_status = if charm.letsencrypt.enabled {
            self.engine.enable_letsencrypt()?
        } else {
            CfgStatus::applied()
        };

        if charm.upnp.enabled {
            self.engine
                .scheduler()
                .add_job(RENEW_UPNP_JOB, &charm.upnp.renew_interval)
                .map_err(engine::Error::from)?;
        } else {
            self.engine
                .scheduler()
                .remove_job(RENEW_UPNP_JOB)
                .map_err(engine::Error::from)?;
        }

        if !stats_status.ok {
            return Ok(stats_status);
        }
        Ok(tls_status)
    }

    /// Register the records a related unit published.
    pub fn relation_changed(
        &mut self,
        remote_unit: &str,
        configs: &[RelationConfig],
    ) -> Result<CfgStatus, LifecycleError> {
        let mut errors = Vec::new();
        for config in configs {
            if let Err(mut errs) = validate_relation(config) {
                errors.append(&mut errs);
            }
        }
        if !errors.is_empty() {
            return Err(LifecycleError::InvalidRelation(errors));
        }
        tracing::info!(remote_unit, records = configs.len(), "Applying relation data");
        Ok(self.engine.process_configs(remote_unit, configs)?)
    }

    /// Tear down everything a departing unit registered.
    pub fn relation_departed(
        &mut self,
        remote_unit: &str,
        configs: &[RelationConfig],
    ) -> Result<(), LifecycleError> {
        tracing::info!(remote_unit, "Removing relation data");
        let group_ids: Vec<Option<&str>> =
            configs.iter().map(|c| c.group_id.as_deref()).collect();
        for names in batch_names(remote_unit, &group_ids) {
            tracing::debug!(unit = %names.unit, backend = %names.backend, "Cleaning on depart");
            self.engine.clean_config(&names.unit, &names.backend, true)?;
        }
        Ok(())
    }

    /// Shut the managed features down before the unit goes away.
    pub fn stop(&mut self) -> Result<(), LifecycleError> {
        self.engine.disable_stats(false)?;
        self.engine.disable_letsencrypt(true)?;
        Ok(())
    }

    pub fn renew_cert(&mut self, full: bool) -> Result<CfgStatus, LifecycleError> {
        Ok(self.engine.renew_cert(full)?)
    }

    pub fn renew_upnp(&mut self) -> Result<(), LifecycleError> {
        Ok(self.engine.renew_upnp()?)
    }

    pub fn release_upnp(&mut self) -> Result<(), LifecycleError> {
        Ok(self.engine.release_upnp()?)
    }

    pub fn update_ports(&mut self) -> Result<(), LifecycleError> {
        Ok(self.engine.update_ports()?)
    }
}

fn create_dir(path: &Path) -> Result<(), LifecycleError> {
    fs::create_dir_all(path).map_err(|source| LifecycleError::Setup {
        path: path.display().to_string(),
        source,
    })
}
