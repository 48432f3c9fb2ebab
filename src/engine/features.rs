//! Charm-level feature toggles: stats endpoint, HTTPS redirect, TLS
//! termination via an ACME issuer, and the tunnel timeout.
//!
//! # Design Decisions
//! - Every enable starts from its own disable, so toggling twice leaves
//!   one copy of everything
//! - TLS bind attributes are only added while the bind carries none, so
//!   repeated enables never stack `ssl crt` or `alpn` tokens
//! - Placeholder servers (`127.0.0.1:0` for the redirect backend) keep
//!   feature backends out of the empty-backend pruning

use std::fs;

use crate::model::section::Frontend;
use crate::model::{Acl, Bind, ConfigLine, Server, UseBackend};

use super::reconciler::STATS_FRONTEND;
use super::{CfgStatus, Error, ProxyEngine, LOCAL_NETWORKS};

const REDIRECT_BACKEND: &str = "redirect";

const ACME_UNIT: &str = "letsencrypt";
const ACME_BACKEND: &str = "letsencrypt-backend";
const ACME_CHALLENGE_ACL: &str = "path_beg -i /.well-known/acme-challenge/";

/// Rewrites `Destination: https` headers to plain-http form for WebDAV
/// clients talking through TLS termination.
const DESTINATION_REWRITE: &str = r"Destination:\ https(.*) Destination:\ http\\1";

const RENEW_CERT_JOB: &str = "renew-cert";

impl ProxyEngine {
    /// Enable the stats endpoint on its own frontend. Fails as a
    /// conflict when another frontend already binds the stats port.
    pub fn enable_stats(&mut self, save: bool) -> Result<CfgStatus, Error> {
        self.disable_stats(false)?;

        let stats = self.charm.stats.clone();
        if self.store.document_mut()?.frontend(stats.port).is_some() {
            tracing::error!(port = stats.port, "Stats port already in use");
            if save {
                self.save_config()?;
            }
            return Ok(CfgStatus::conflict("Stats port already in use"));
        }

        let doc = self.store.document_mut()?;
        let mut frontend = Frontend::new(STATS_FRONTEND, Bind::new("0.0.0.0", stats.port));
        frontend.add_config(ConfigLine::new("stats", "enable"));
        frontend.add_config(ConfigLine::new(
            "stats",
            format!("auth {}:{}", stats.user, stats.passwd),
        ));
        frontend.add_config(ConfigLine::new("stats", format!("uri {}", stats.url)));
        if stats.local {
            frontend.add_acl(Acl::new("local", LOCAL_NETWORKS));
            frontend.add_config(ConfigLine::new("http-request", "deny if !local"));
        }
        doc.frontends.push(frontend);

        if save {
            self.save_config()?;
        }
        Ok(CfgStatus::applied())
    }

    /// Remove the stats frontend if present.
    pub fn disable_stats(&mut self, save: bool) -> Result<(), Error> {
        let doc = self.store.document_mut()?;
        doc.remove_frontend_named(STATS_FRONTEND);
        if save {
            self.save_config()?;
        }
        Ok(())
    }

    /// Redirect every port-80 request to HTTPS via a dedicated backend.
    pub fn enable_redirect(&mut self, save: bool) -> Result<(), Error> {
        self.disable_redirect(false)?;

        let doc = self.store.document_mut()?;
        let frontend = doc.ensure_frontend(80);
        frontend.add_use_backend(UseBackend::default_rule(REDIRECT_BACKEND));

        let backend = doc.ensure_backend(REDIRECT_BACKEND);
        backend.add_config(ConfigLine::new("redirect", "scheme https"));
        // Placeholder server; the redirect rule answers before any
        // forwarding happens.
        backend.add_server(Server::new(REDIRECT_BACKEND, "127.0.0.1", 0));

        if save {
            self.save_config()?;
        }
        Ok(())
    }

    /// Remove the HTTPS redirect backend and every rule pointing at it.
    pub fn disable_redirect(&mut self, save: bool) -> Result<(), Error> {
        let doc = self.store.document_mut()?;
        for frontend in &mut doc.frontends {
            frontend.retain_use_backends(|ub| ub.backend != REDIRECT_BACKEND);
        }
        self.clean_config(REDIRECT_BACKEND, REDIRECT_BACKEND, save)
    }

    /// Enable TLS termination: route ACME HTTP challenges on port 80 to
    /// the issuer's responder, register the configured domains, install
    /// the combined certificate on the port-443 bind and schedule
    /// renewal.
    pub fn enable_letsencrypt(&mut self) -> Result<CfgStatus, Error> {
        tracing::debug!("Enabling certificate issuance");
        if self.charm.letsencrypt.domains.is_empty() {
            return Err(Error::NoDomains);
        }
        let challenge_port = self.charm.letsencrypt.challenge_port;

        let first_run = {
            let doc = self.store.document_mut()?;
            let frontend = doc.ensure_frontend(80);
            if frontend.name == STATS_FRONTEND || frontend.is_tcp() {
                tracing::error!("Port 80 not available for certificate challenges");
                return Ok(CfgStatus::conflict(
                    "Port 80 not available for certificate challenges",
                ));
            }

            // Challenge routing already present means this is a re-run;
            // skip the pieces that would duplicate.
            let first_run = !frontend.has_acl(ACME_UNIT);
            if first_run {
                frontend.add_acl(Acl::new(ACME_UNIT, ACME_CHALLENGE_ACL));
                frontend.add_use_backend(UseBackend::conditional(ACME_BACKEND, ACME_UNIT));
                let backend = doc.ensure_backend(ACME_BACKEND);
                backend.add_server(Server::new(ACME_UNIT, "127.0.0.1", challenge_port));
            }
            first_run
        };
        if first_run {
            self.save_config()?;
        }

        let domains = self.charm.letsencrypt.domains.clone();
        tracing::debug!(?domains, challenge_port, "Registering certificate domains");
        let code = self.certs.register_domains(&domains)?;
        if code > 0 {
            tracing::error!(code, "Certificate registration failed");
            return Ok(CfgStatus::conflict("Certificate registration failed"));
        }

        self.merge_cert()?;

        {
            let cert_file = self.charm.cert_file().ok_or(Error::NoDomains)?;
            let http2 = self.charm.supports_http2();
            let rewrite = self.charm.letsencrypt.destination_https_rewrite;
            let doc = self.store.document_mut()?;
            let frontend = doc.ensure_frontend(443);
            if let Some(bind) = frontend.bind_mut() {
                if bind.attributes.is_empty() {
                    bind.push_attributes(&format!("ssl crt {}", cert_file.display()));
                    if http2 {
                        bind.push_attributes("alpn h2,http/1.1");
                    }
                }
            }
            if first_run {
                frontend.add_acl(Acl::new(ACME_UNIT, ACME_CHALLENGE_ACL));
                frontend.add_use_backend(UseBackend::conditional(ACME_BACKEND, ACME_UNIT));
                if rewrite {
                    frontend.add_config(ConfigLine::new("reqirep", DESTINATION_REWRITE));
                }
            }
        }
        if first_run {
            self.save_config()?;
        }

        let interval = self.charm.letsencrypt.renew_interval.clone();
        self.scheduler.add_job(RENEW_CERT_JOB, &interval)?;
        Ok(CfgStatus::applied())
    }

    /// Remove TLS termination: strip the port-443 bind attributes and
    /// rewrite rule, tear down the challenge routing and unschedule
    /// renewal.
    pub fn disable_letsencrypt(&mut self, save: bool) -> Result<(), Error> {
        {
            let doc = self.store.document_mut()?;
            if let Some(frontend) = doc.frontend_mut(443) {
                if let Some(bind) = frontend.bind_mut() {
                    bind.attributes.clear();
                }
                frontend.remove_config("reqirep", DESTINATION_REWRITE);
            }
        }
        self.clean_config(ACME_UNIT, ACME_BACKEND, save)?;
        self.scheduler.remove_job(RENEW_CERT_JOB)?;
        Ok(())
    }

    /// Renew certificates. The full path re-runs disable/enable so
    /// domain changes in the charm config take effect; the short path
    /// renews in place and reloads the service.
    pub fn renew_cert(&mut self, full: bool) -> Result<CfgStatus, Error> {
        tracing::info!(full, "Renewing certificate");
        if full {
            self.disable_letsencrypt(true)?;
            self.enable_letsencrypt()
        } else {
            self.certs.renew()?;
            self.merge_cert()?;
            self.system.service_reload(&self.charm.service)?;
            Ok(CfgStatus::applied())
        }
    }

    /// Concatenate the issuer's fullchain and private key into the
    /// single pem file the proxy's TLS bind expects.
    pub fn merge_cert(&mut self) -> Result<(), Error> {
        let domain = self.charm.domain_name().ok_or(Error::NoDomains)?;
        let cert_file = self.charm.cert_file().ok_or(Error::NoDomains)?;
        let live = self.charm.letsencrypt.live_root.join(domain);

        let mut combined = fs::read(live.join("fullchain.pem"))?;
        combined.extend(fs::read(live.join("privkey.pem"))?);
        if let Some(parent) = cert_file.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&cert_file, combined)?;
        tracing::debug!(path = %cert_file.display(), "Wrote combined certificate");
        Ok(())
    }

    /// Set the idle-tunnel timeout in the defaults section, replacing
    /// any previous value.
    pub fn add_timeout_tunnel(&mut self, save: bool) -> Result<(), Error> {
        let timeout = self.charm.tunnel_timeout.clone();
        let doc = self.store.document_mut()?;
        doc.defaults_mut().replace_config(
            "timeout",
            "tunnel",
            ConfigLine::new("timeout", format!("tunnel {}", timeout)),
        );
        if save {
            self.save_config()?;
        }
        Ok(())
    }
}
