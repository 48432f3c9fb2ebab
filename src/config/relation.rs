//! Relation data records.
//!
//! A related application describes each backend service it wants proxied
//! with one of these records. They arrive as JSON relation data, either
//! a single object or, for multi-service relations, an array of objects.

use serde::{Deserialize, Serialize};

/// Routing mode requested for a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Http,
    Tcp,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Http => "http",
            Mode::Tcp => "tcp",
        }
    }
}

/// Desired-state record for one service of one related unit.
///
/// Field names mirror the wire format of the relation interface: the
/// port/host fields use snake_case, the boolean feature flags kebab-case.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelationConfig {
    #[serde(default)]
    pub mode: Mode,

    /// Port the proxy listens on for this service.
    pub external_port: u16,

    /// Host the proxied service runs on.
    pub internal_host: String,

    /// Port the proxied service listens on.
    pub internal_port: u16,

    /// Path prefix discriminating this service on a shared HTTP port.
    #[serde(default)]
    pub urlbase: Option<String>,

    /// Host-header prefix discriminating this service.
    #[serde(default)]
    pub subdomain: Option<String>,

    /// Units sharing a group id collapse onto one load-balanced backend.
    #[serde(default)]
    pub group_id: Option<String>,

    /// Enable connection health checking on the server entry.
    #[serde(default)]
    pub check: bool,

    /// Connect to the internal service over TLS.
    #[serde(default)]
    pub ssl: bool,

    /// Verify the internal service's certificate.
    #[serde(default, rename = "ssl-verify")]
    pub ssl_verify: bool,

    /// Add X-Forwarded-* headers and the forwardfor option.
    #[serde(default)]
    pub proxypass: bool,

    /// Strip the urlbase prefix before forwarding.
    #[serde(default, rename = "rewrite-path")]
    pub rewrite_path: bool,

    /// Deny requests from non-local source networks.
    #[serde(default, rename = "acl-local")]
    pub acl_local: bool,
}

impl RelationConfig {
    /// The urlbase with any trailing slash stripped; older clients sent
    /// `/path/` and the ACL values add the slash themselves.
    pub fn urlbase_trimmed(&self) -> Option<&str> {
        self.urlbase
            .as_deref()
            .map(|u| u.trim_end_matches('/'))
            .filter(|u| !u.is_empty())
    }
}

/// Relation payload: modern relations send an array, legacy ones a
/// single object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RelationPayload {
    Many(Vec<RelationConfig>),
    One(RelationConfig),
}

impl RelationPayload {
    pub fn into_vec(self) -> Vec<RelationConfig> {
        match self {
            RelationPayload::Many(configs) => configs,
            RelationPayload::One(config) => vec![config],
        }
    }
}
