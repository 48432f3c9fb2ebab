//! Configuration sections: global, defaults, userlists, frontends and
//! backends.
//!
//! # Design Decisions
//! - Every child collection is an insertion-ordered Vec; HAProxy
//!   evaluates ACL and use_backend rules first-match-wins, so order is
//!   semantics, not presentation
//! - No collection deduplicates; callers decide when a duplicate is legal
//!   (grouped backends share one directive, servers never share a name)
//! - Removal helpers take predicates so callers remove exactly the
//!   entries they matched, not everything sharing a name

use super::line::{Acl, Bind, ConfigLine, OptionLine, Server, UseBackend};

/// The single `global` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Global {
    pub configs: Vec<ConfigLine>,
}

/// A `defaults` section. HAProxy allows several; the first one is the
/// one the engine targets for replace-semantics directives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Defaults {
    pub name: String,
    pub options: Vec<OptionLine>,
    pub configs: Vec<ConfigLine>,
}

impl Defaults {
    /// Remove every config whose keyword matches and whose value starts
    /// with `value_prefix`, then append the replacement.
    pub fn replace_config(&mut self, keyword: &str, value_prefix: &str, line: ConfigLine) {
        self.configs
            .retain(|c| !(c.keyword == keyword && c.value.starts_with(value_prefix)));
        self.configs.push(line);
    }
}

/// A `userlist` section, kept verbatim as free-form lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Userlist {
    pub name: String,
    pub configs: Vec<ConfigLine>,
}

/// A listening endpoint selecting backends via ACL / use_backend rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frontend {
    pub name: String,
    pub binds: Vec<Bind>,
    pub acls: Vec<Acl>,
    pub use_backends: Vec<UseBackend>,
    pub configs: Vec<ConfigLine>,
}

impl Frontend {
    pub fn new(name: impl Into<String>, bind: Bind) -> Self {
        Self {
            name: name.into(),
            binds: vec![bind],
            ..Self::default()
        }
    }

    /// The bound port. Frontends the engine manages carry exactly one
    /// bind; for hand-written multi-bind frontends the first bind wins.
    pub fn port(&self) -> Option<u16> {
        self.binds.first().map(|b| b.port)
    }

    pub fn bind_mut(&mut self) -> Option<&mut Bind> {
        self.binds.first_mut()
    }

    pub fn add_acl(&mut self, acl: Acl) {
        self.acls.push(acl);
    }

    pub fn add_use_backend(&mut self, rule: UseBackend) {
        self.use_backends.push(rule);
    }

    pub fn add_config(&mut self, line: ConfigLine) {
        self.configs.push(line);
    }

    pub fn has_acl(&self, name: &str) -> bool {
        self.acls.iter().any(|a| a.name == name)
    }

    pub fn has_use_backend(&self, backend: &str) -> bool {
        self.use_backends.iter().any(|ub| ub.backend == backend)
    }

    pub fn has_config(&self, keyword: &str, value: &str) -> bool {
        self.configs
            .iter()
            .any(|c| c.keyword == keyword && c.value == value)
    }

    /// True if a `mode tcp` directive is present.
    pub fn is_tcp(&self) -> bool {
        self.configs
            .iter()
            .any(|c| c.keyword == "mode" && c.value == "tcp")
    }

    /// Force `mode tcp`, replacing any existing mode directive.
    pub fn set_mode_tcp(&mut self) {
        self.configs.retain(|c| c.keyword != "mode");
        self.configs.push(ConfigLine::new("mode", "tcp"));
    }

    pub fn retain_acls(&mut self, keep: impl FnMut(&Acl) -> bool) {
        self.acls.retain(keep);
    }

    pub fn retain_use_backends(&mut self, keep: impl FnMut(&UseBackend) -> bool) {
        self.use_backends.retain(keep);
    }

    /// Remove one exact directive, matched on keyword and value.
    pub fn remove_config(&mut self, keyword: &str, value: &str) {
        self.configs
            .retain(|c| !(c.keyword == keyword && c.value == value));
    }
}

/// A named pool of servers providing one service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Backend {
    pub name: String,
    pub options: Vec<OptionLine>,
    pub configs: Vec<ConfigLine>,
    pub acls: Vec<Acl>,
    pub servers: Vec<Server>,
}

impl Backend {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn add_option(&mut self, option: OptionLine) {
        self.options.push(option);
    }

    pub fn add_config(&mut self, line: ConfigLine) {
        self.configs.push(line);
    }

    pub fn add_acl(&mut self, acl: Acl) {
        self.acls.push(acl);
    }

    pub fn add_server(&mut self, server: Server) {
        self.servers.push(server);
    }

    pub fn has_acl(&self, name: &str) -> bool {
        self.acls.iter().any(|a| a.name == name)
    }

    pub fn has_option(&self, keyword: &str) -> bool {
        self.options.iter().any(|o| o.keyword == keyword)
    }

    pub fn has_config(&self, keyword: &str, value: &str) -> bool {
        self.configs
            .iter()
            .any(|c| c.keyword == keyword && c.value == value)
    }

    /// Set the backend mode, replacing any previous mode directive so
    /// grouped backends never accumulate duplicates.
    pub fn set_mode(&mut self, mode: &str) {
        self.configs.retain(|c| c.keyword != "mode");
        self.configs.push(ConfigLine::new("mode", mode));
    }

    pub fn retain_servers(&mut self, keep: impl FnMut(&Server) -> bool) {
        self.servers.retain(keep);
    }
}
