//! Charm configuration schema.
//!
//! This is the operator-facing configuration for the charm itself, not
//! the proxy's own config file. All types derive Serde traits for
//! deserialization from the charm config TOML, and every field has a
//! default so a minimal config works.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root charm configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CharmConfig {
    /// Canonical path of the proxy configuration file.
    pub proxy_config_path: PathBuf,

    /// Directory holding combined certificate files.
    pub ssl_path: PathBuf,

    /// Systemd unit reloaded after every save.
    pub service: String,

    /// HAProxy branch in use (e.g. "2.8"); gates HTTP/2 bind attributes.
    pub version: String,

    /// Idle-tunnel timeout injected into the defaults section.
    pub tunnel_timeout: String,

    /// Redirect every port-80 request to HTTPS.
    pub enable_https_redirect: bool,

    pub stats: StatsConfig,
    pub letsencrypt: LetsEncryptConfig,
    pub upnp: UpnpConfig,
}

impl Default for CharmConfig {
    fn default() -> Self {
        Self {
            proxy_config_path: PathBuf::from("/etc/haproxy/haproxy.cfg"),
            ssl_path: PathBuf::from("/etc/haproxy/ssl"),
            service: "haproxy.service".to_string(),
            version: "2.8".to_string(),
            tunnel_timeout: "1h".to_string(),
            enable_https_redirect: false,
            stats: StatsConfig::default(),
            letsencrypt: LetsEncryptConfig::default(),
            upnp: UpnpConfig::default(),
        }
    }
}

impl CharmConfig {
    /// The primary certificate domain (first of the configured list).
    pub fn domain_name(&self) -> Option<&str> {
        self.letsencrypt.domains.first().map(String::as_str)
    }

    /// Path of the combined fullchain+key file handed to the TLS bind.
    pub fn cert_file(&self) -> Option<PathBuf> {
        self.domain_name()
            .map(|domain| self.ssl_path.join(format!("{}.pem", domain)))
    }

    /// HTTP/2 on the TLS frontend needs HAProxy 1.9 or later.
    pub fn supports_http2(&self) -> bool {
        let mut parts = self.version.split('.');
        let major: u32 = match parts.next().and_then(|p| p.parse().ok()) {
            Some(v) => v,
            None => return false,
        };
        let minor: u32 = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
        (major, minor) >= (1, 9)
    }
}

/// Stats endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StatsConfig {
    pub enabled: bool,

    /// Port the stats frontend binds.
    pub port: u16,

    pub user: String,
    pub passwd: String,

    /// URI of the stats page.
    pub url: String,

    /// Restrict the stats page to local source networks and keep the
    /// port out of the externally-opened set.
    pub local: bool,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 9000,
            user: "admin".to_string(),
            passwd: "admin".to_string(),
            url: "/ha-stats".to_string(),
            local: false,
        }
    }
}

/// Certificate issuance configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LetsEncryptConfig {
    pub enabled: bool,

    /// Domains to register; the first one names the combined pem.
    pub domains: Vec<String>,

    /// Local port of the HTTP challenge responder.
    pub challenge_port: u16,

    /// Root of the issuer's live certificate tree.
    pub live_root: PathBuf,

    /// Renewal schedule handed to the scheduler collaborator.
    pub renew_interval: String,

    /// Rewrite `Destination: https` headers on the TLS frontend (WebDAV
    /// style clients behind TLS termination).
    pub destination_https_rewrite: bool,
}

impl Default for LetsEncryptConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            domains: Vec::new(),
            challenge_port: 9999,
            live_root: PathBuf::from("/etc/letsencrypt/live"),
            renew_interval: "@daily".to_string(),
            destination_https_rewrite: false,
        }
    }
}

/// UPnP port-forward configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpnpConfig {
    pub enabled: bool,

    /// Lease refresh schedule handed to the scheduler collaborator.
    pub renew_interval: String,
}

impl Default for UpnpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            renew_interval: "@hourly".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supports_http2_version_gate() {
        let mut config = CharmConfig::default();
        for (version, expected) in [("1.8", false), ("1.9", true), ("2.0", true), ("2.8", true)] {
            config.version = version.to_string();
            assert_eq!(config.supports_http2(), expected, "version {}", version);
        }
        config.version = "nightly".to_string();
        assert!(!config.supports_http2());
    }

    #[test]
    fn test_cert_file_uses_first_domain() {
        let mut config = CharmConfig::default();
        assert!(config.cert_file().is_none());
        config.letsencrypt.domains =
            vec!["example.com".to_string(), "www.example.com".to_string()];
        assert_eq!(
            config.cert_file().unwrap(),
            PathBuf::from("/etc/haproxy/ssl/example.com.pem")
        );
    }

    #[test]
    fn test_minimal_toml() {
        let config: CharmConfig = toml::from_str("[stats]\nenabled = true\nport = 9999\n").unwrap();
        assert!(config.stats.enabled);
        assert_eq!(config.stats.port, 9999);
        assert_eq!(config.service, "haproxy.service");
    }
}
