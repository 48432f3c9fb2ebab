//! The whole configuration document.
//!
//! # Responsibilities
//! - Own the ordered section collections
//! - Provide the lookup / get-or-create / prune primitives the
//!   reconciliation engine composes
//!
//! # Design Decisions
//! - Frontends are addressed by bound port, backends by name
//! - Sections live in Vecs, never maps: serialized ordering must be
//!   stable across re-saves

use super::line::Bind;
use super::section::{Backend, Defaults, Frontend, Global, Userlist};

/// Prefix used for frontends created implicitly for a relation. A
/// relation frontend with no use_backend rules is garbage and gets
/// pruned.
pub const RELATION_PREFIX: &str = "relation";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub global: Global,
    pub defaults: Vec<Defaults>,
    pub userlists: Vec<Userlist>,
    pub frontends: Vec<Frontend>,
    pub backends: Vec<Backend>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            global: Global::default(),
            defaults: vec![Defaults::default()],
            userlists: Vec::new(),
            frontends: Vec::new(),
            backends: Vec::new(),
        }
    }
}

impl Document {
    /// Find the frontend bound to `port`.
    pub fn frontend(&self, port: u16) -> Option<&Frontend> {
        self.frontends.iter().find(|fe| fe.port() == Some(port))
    }

    pub fn frontend_mut(&mut self, port: u16) -> Option<&mut Frontend> {
        self.frontends.iter_mut().find(|fe| fe.port() == Some(port))
    }

    /// Find the frontend bound to `port`, creating an implicit
    /// `relation-<port>` frontend bound to 0.0.0.0 when absent.
    pub fn ensure_frontend(&mut self, port: u16) -> &mut Frontend {
        if let Some(index) = self.frontends.iter().position(|fe| fe.port() == Some(port)) {
            return &mut self.frontends[index];
        }
        tracing::info!(port, "Creating frontend");
        let name = format!("{}-{}", RELATION_PREFIX, port);
        self.frontends.push(Frontend::new(name, Bind::new("0.0.0.0", port)));
        self.frontends.last_mut().unwrap()
    }

    pub fn frontend_named(&self, name: &str) -> Option<&Frontend> {
        self.frontends.iter().find(|fe| fe.name == name)
    }

    pub fn remove_frontend_named(&mut self, name: &str) {
        self.frontends.retain(|fe| fe.name != name);
    }

    pub fn backend(&self, name: &str) -> Option<&Backend> {
        self.backends.iter().find(|be| be.name == name)
    }

    pub fn backend_mut(&mut self, name: &str) -> Option<&mut Backend> {
        self.backends.iter_mut().find(|be| be.name == name)
    }

    /// Find the named backend, creating an empty one when absent.
    pub fn ensure_backend(&mut self, name: &str) -> &mut Backend {
        if let Some(index) = self.backends.iter().position(|be| be.name == name) {
            return &mut self.backends[index];
        }
        tracing::info!(backend = name, "Creating backend");
        self.backends.push(Backend::new(name));
        self.backends.last_mut().unwrap()
    }

    /// The first defaults section, the target for replace-semantics
    /// directives like `timeout tunnel`. The document invariant keeps at
    /// least one defaults section alive.
    pub fn defaults_mut(&mut self) -> &mut Defaults {
        if self.defaults.is_empty() {
            self.defaults.push(Defaults::default());
        }
        &mut self.defaults[0]
    }

    /// Drop implicit relation frontends that no longer route anywhere.
    pub fn prune_relation_frontends(&mut self) {
        self.frontends.retain(|fe| {
            let keep = !fe.use_backends.is_empty() || !fe.name.starts_with(RELATION_PREFIX);
            if !keep {
                tracing::info!(frontend = %fe.name, "Pruning empty relation frontend");
            }
            keep
        });
    }

    /// Drop backends with no servers left.
    pub fn prune_empty_backends(&mut self) {
        self.backends.retain(|be| {
            let keep = !be.servers.is_empty();
            if !keep {
                tracing::info!(backend = %be.name, "Pruning empty backend");
            }
            keep
        });
    }

    /// Ports bound by the current frontends, in section order.
    pub fn bound_ports(&self) -> Vec<u16> {
        self.frontends.iter().filter_map(|fe| fe.port()).collect()
    }
}
