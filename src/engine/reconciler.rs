//! Relation reconciliation: registration, availability checks, teardown.
//!
//! # Responsibilities
//! - Apply a batch of relation records from one related application
//! - Enforce the port/mode conflict rules (a port is either
//!   HTTP-multiplexed or exclusively TCP, never both)
//! - Tear registrations down so re-registration stays idempotent
//!
//! # Design Decisions
//! - Every registration starts with a clean of its own prior state (and
//!   of its pre-indexed legacy name), so applying the same batch twice
//!   produces the same document
//! - A conflict stops the batch without rolling back earlier records and
//!   without saving; this matches the long-standing charm behavior and
//!   keeps retries predictable

use crate::config::{Mode, RelationConfig};
use crate::model::section::{Backend, Frontend};
use crate::model::{Acl, ConfigLine, OptionLine, Server, UseBackend};

use super::names::{derive_names, legacy_name, sanitize_unit};
use super::{CfgStatus, Error, ProxyEngine, LOCAL_NETWORKS};

/// Reserved frontend name for the stats endpoint; never available for
/// relation HTTP routing.
pub(crate) const STATS_FRONTEND: &str = "stats";

const COOKIE_DIRECTIVE: &str = "SERVERID insert indirect nocache";

impl ProxyEngine {
    /// Process a batch of relation records from `remote_unit`, in order.
    /// Stops at the first port/mode conflict; earlier records stay
    /// applied in memory and nothing is saved in that case.
    pub fn process_configs(
        &mut self,
        remote_unit: &str,
        configs: &[RelationConfig],
    ) -> Result<CfgStatus, Error> {
        for (index, config) in configs.iter().enumerate() {
            let names = derive_names(remote_unit, index, config.group_id.as_deref());

            // Upgrades from the pre-indexed naming scheme leave state
            // under the old name; clean it before registering.
            let legacy = legacy_name(&names.backend);
            if legacy != names.backend {
                tracing::info!(unit = %names.unit, legacy = %legacy, "Cleaning legacy configs");
                self.clean_config(&legacy, &legacy, false)?;
            }

            tracing::debug!(
                unit = %names.unit,
                backend = %names.backend,
                "Cleaning prior configs before registration"
            );
            self.clean_config(&names.unit, &names.backend, false)?;

            let urlbase = config.urlbase_trimmed().map(str::to_owned);
            let subdomain = config.subdomain.clone().filter(|s| !s.is_empty());

            {
                let doc = self.store.document_mut()?;
                let frontend = doc.ensure_frontend(config.external_port);
                match config.mode {
                    Mode::Http => {
                        if !frontend_available_for_http(frontend) {
                            tracing::error!(
                                unit = %names.unit,
                                port = config.external_port,
                                "Port not available for http routing"
                            );
                            return Ok(CfgStatus::conflict("Port not available for http routing"));
                        }
                        if urlbase.is_none() && subdomain.is_none() {
                            // Accepted, but the rule below can never match.
                            tracing::warn!(
                                unit = %names.unit,
                                "HTTP registration without urlbase or subdomain"
                            );
                        }
                        if let Some(base) = &urlbase {
                            frontend.add_acl(Acl::new(&names.unit, format!("path_beg {}/", base)));
                            frontend.add_acl(Acl::new(&names.unit, format!("path {}", base)));
                        }
                        if let Some(sub) = &subdomain {
                            frontend
                                .add_acl(Acl::new(&names.unit, format!("hdr_beg(host) -i {}", sub)));
                        }
                        frontend.add_use_backend(UseBackend::conditional(
                            &names.backend,
                            &names.unit,
                        ));
                    }
                    Mode::Tcp => {
                        if !frontend_available_for_tcp(frontend, &names.backend) {
                            tracing::error!(
                                unit = %names.unit,
                                port = config.external_port,
                                "Frontend already in use, can not set up tcp mode"
                            );
                            return Ok(CfgStatus::conflict(
                                "Frontend already in use, can not set up tcp mode",
                            ));
                        }
                        frontend.set_mode_tcp();
                        // Stale HTTP-mode leftovers would shadow the
                        // default rule.
                        frontend.use_backends.clear();
                        frontend.add_use_backend(UseBackend::default_rule(&names.backend));
                    }
                }
            }

            let doc = self.store.document_mut()?;
            let backend = doc.ensure_backend(&names.backend);
            backend.set_mode(config.mode.as_str());

            let mut server =
                Server::new(&names.unit, &config.internal_host, config.internal_port);
            if config.check {
                server.push_attributes("check fall 3 rise 2");
            }

            if config.mode == Mode::Http {
                apply_http_backend(backend, config, &names.unit, urlbase.as_deref(), &mut server);
            }
            backend.add_server(server);
        }

        self.save_config()?;
        Ok(CfgStatus::applied())
    }

    /// True unless the frontend is the stats endpoint or already runs in
    /// TCP mode.
    pub fn available_for_http(&self, frontend: &Frontend) -> bool {
        frontend_available_for_http(frontend)
    }

    /// True only if the frontend carries no ACLs and routes nowhere but
    /// `backend_name` (under its current or legacy name).
    pub fn available_for_tcp(&self, frontend: &Frontend, backend_name: &str) -> bool {
        frontend_available_for_tcp(frontend, backend_name)
    }

    /// Find the frontend bound to `port`; with `create`, make an
    /// implicit relation frontend when absent.
    pub fn get_frontend(&mut self, port: u16, create: bool) -> Result<Option<&Frontend>, Error> {
        let doc = self.store.document_mut()?;
        if create {
            Ok(Some(doc.ensure_frontend(port)))
        } else {
            Ok(doc.frontend(port))
        }
    }

    /// Find the named backend; with `create`, make an empty one when
    /// absent.
    pub fn get_backend(&mut self, name: &str, create: bool) -> Result<Option<&Backend>, Error> {
        let doc = self.store.document_mut()?;
        if create {
            Ok(Some(doc.ensure_backend(name)))
        } else {
            Ok(doc.backend(name))
        }
    }

    /// Remove every trace of `unit`: its ACLs and routing rules on all
    /// frontends, its server entries on all backends, then prune what
    /// became empty. The sole deletion path, used by relation departures
    /// and as the pre-step of every registration.
    pub fn clean_config(&mut self, unit: &str, backend_name: &str, save: bool) -> Result<(), Error> {
        let unit = sanitize_unit(unit);
        let backend_name = sanitize_unit(backend_name);
        tracing::debug!(unit = %unit, backend = %backend_name, "Cleaning configuration");

        let doc = self.store.document_mut()?;
        for frontend in &mut doc.frontends {
            // Match condition or target: TCP frontends route via an
            // unconditional default rule that only carries the name.
            frontend.retain_use_backends(|ub| !(ub.condition == unit || ub.backend == unit));
            frontend.retain_acls(|acl| acl.name != unit);
        }
        for backend in &mut doc.backends {
            backend.retain_servers(|server| server.name != unit);
        }

        doc.prune_empty_backends();
        if doc.backend(&backend_name).is_none() {
            // The cleaned backend is gone; rules still pointing at it
            // (grouped TCP default rules) would dangle.
            for frontend in &mut doc.frontends {
                frontend.retain_use_backends(|ub| ub.backend != backend_name);
            }
        }
        doc.prune_relation_frontends();

        if save {
            self.save_config()?;
        }
        Ok(())
    }
}

fn frontend_available_for_http(frontend: &Frontend) -> bool {
    frontend.name != STATS_FRONTEND && !frontend.is_tcp()
}

fn frontend_available_for_tcp(frontend: &Frontend, backend_name: &str) -> bool {
    if !frontend.acls.is_empty() {
        return false;
    }
    let legacy = legacy_name(backend_name);
    frontend
        .use_backends
        .iter()
        .all(|ub| ub.backend == backend_name || ub.backend == legacy)
}

fn apply_http_backend(
    backend: &mut Backend,
    config: &RelationConfig,
    unit: &str,
    urlbase: Option<&str>,
    server: &mut Server,
) {
    // Cookie affinity is per-backend; the matching server attribute is
    // per-unit.
    if !backend.has_config("cookie", COOKIE_DIRECTIVE) {
        backend.add_config(ConfigLine::new("cookie", COOKIE_DIRECTIVE));
    }
    server.push_attributes(&format!("cookie {}", unit));

    if config.group_id.is_some() {
        let value = format!("GET {} HTTP/1.0", urlbase.unwrap_or("/"));
        if !backend
            .options
            .iter()
            .any(|o| o.keyword == "httpchk" && o.value == value)
        {
            backend.add_option(OptionLine::new("httpchk", value));
        }
        server.push_attributes("check");
    }

    if config.rewrite_path {
        if let Some(base) = urlbase {
            let value = format!("set-path %[path,regsub(^{}/?,/)]", base);
            if !backend.has_config("http-request", &value) {
                backend.add_config(ConfigLine::new("http-request", value));
            }
        }
    }

    if config.acl_local && !backend.has_acl("local") {
        backend.add_acl(Acl::new("local", LOCAL_NETWORKS));
        backend.add_config(ConfigLine::new("http-request", "deny if !local"));
    }

    if config.proxypass {
        if !backend.has_option("forwardfor") {
            backend.add_option(OptionLine::new("forwardfor", ""));
        }
        let proto = if config.external_port == 443 {
            "https"
        } else {
            "http"
        };
        let value = format!("set-header X-Forwarded-Proto {}", proto);
        if !backend.has_config("http-request", &value) {
            backend.add_config(ConfigLine::new("http-request", value));
        }
    }

    if config.ssl {
        if config.ssl_verify {
            server.push_attributes("ssl");
        } else {
            server.push_attributes("ssl verify none");
        }
    }
}
