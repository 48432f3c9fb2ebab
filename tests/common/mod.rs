//! Shared fixtures for integration testing: in-memory collaborator
//! fakes and an engine wired to a temporary configuration file.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use haproxy_charm::config::{CharmConfig, Mode, RelationConfig};
use haproxy_charm::system::{CertIssuer, Scheduler, SystemError, SystemOps};
use haproxy_charm::ProxyEngine;

/// Seed configuration matching a fresh package install.
pub const SEED_CONFIG: &str = "\
global
    daemon

defaults
    mode http
    option httplog
    timeout connect 5000
    timeout client 50000
    timeout server 50000
";

#[derive(Default)]
pub struct SystemState {
    pub ports: BTreeSet<u16>,
    pub reloads: usize,
    pub open_calls: Vec<u16>,
    pub close_calls: Vec<u16>,
}

/// Fake host: tracks open ports and reload counts in memory.
#[derive(Clone, Default)]
pub struct FakeSystem {
    pub state: Arc<Mutex<SystemState>>,
}

impl SystemOps for FakeSystem {
    fn service_reload(&self, _unit: &str) -> Result<(), SystemError> {
        self.state.lock().unwrap().reloads += 1;
        Ok(())
    }

    fn open_port(&self, port: u16) -> Result<(), SystemError> {
        let mut state = self.state.lock().unwrap();
        state.open_calls.push(port);
        state.ports.insert(port);
        Ok(())
    }

    fn close_port(&self, port: u16) -> Result<(), SystemError> {
        let mut state = self.state.lock().unwrap();
        state.close_calls.push(port);
        state.ports.remove(&port);
        Ok(())
    }

    fn opened_ports(&self) -> Result<Vec<u16>, SystemError> {
        Ok(self.state.lock().unwrap().ports.iter().copied().collect())
    }
}

#[derive(Default)]
pub struct CertState {
    pub registrations: Vec<Vec<String>>,
    pub renews: usize,
}

/// Fake issuer: records calls and answers with a scripted exit code.
#[derive(Clone)]
pub struct FakeIssuer {
    pub state: Arc<Mutex<CertState>>,
    pub exit_code: i32,
    /// When set, registration drops fullchain/privkey files here the way
    /// a real issuer populates its live directory.
    pub live_dir: Option<PathBuf>,
}

impl Default for FakeIssuer {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(CertState::default())),
            exit_code: 0,
            live_dir: None,
        }
    }
}

impl CertIssuer for FakeIssuer {
    fn register_domains(&self, domains: &[String]) -> Result<i32, SystemError> {
        self.state
            .lock()
            .unwrap()
            .registrations
            .push(domains.to_vec());
        if let (Some(dir), Some(domain)) = (&self.live_dir, domains.first()) {
            let live = dir.join(domain);
            fs::create_dir_all(&live).unwrap();
            fs::write(live.join("fullchain.pem"), "CHAIN\n").unwrap();
            fs::write(live.join("privkey.pem"), "KEY\n").unwrap();
        }
        Ok(self.exit_code)
    }

    fn renew(&self) -> Result<(), SystemError> {
        self.state.lock().unwrap().renews += 1;
        Ok(())
    }
}

/// Fake scheduler: jobs live in a map keyed by action.
#[derive(Clone, Default)]
pub struct FakeScheduler {
    pub jobs: Arc<Mutex<BTreeMap<String, String>>>,
}

impl Scheduler for FakeScheduler {
    fn add_job(&self, action: &str, interval: &str) -> Result<(), SystemError> {
        self.jobs
            .lock()
            .unwrap()
            .insert(action.to_string(), interval.to_string());
        Ok(())
    }

    fn remove_job(&self, action: &str) -> Result<(), SystemError> {
        self.jobs.lock().unwrap().remove(action);
        Ok(())
    }
}

/// An engine over a temp-dir config file plus handles into every fake.
pub struct Harness {
    pub engine: ProxyEngine,
    pub system: FakeSystem,
    pub certs: FakeIssuer,
    pub scheduler: FakeScheduler,
    pub config_path: PathBuf,
    // Held so the temp dir outlives the engine.
    _dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_charm_config(|_| {})
    }

    /// Build a harness after letting the caller adjust the charm config.
    pub fn with_charm_config(adjust: impl FnOnce(&mut CharmConfig)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("haproxy.cfg");
        fs::write(&config_path, SEED_CONFIG).unwrap();

        let mut charm = CharmConfig::default();
        charm.proxy_config_path = config_path.clone();
        charm.ssl_path = dir.path().join("ssl");
        charm.letsencrypt.live_root = dir.path().join("live");
        adjust(&mut charm);

        let system = FakeSystem::default();
        let certs = FakeIssuer {
            live_dir: Some(charm.letsencrypt.live_root.clone()),
            ..FakeIssuer::default()
        };
        let scheduler = FakeScheduler::default();
        let engine = ProxyEngine::new(
            charm,
            Box::new(system.clone()),
            Box::new(certs.clone()),
            Box::new(scheduler.clone()),
        );

        Self {
            engine,
            system,
            certs,
            scheduler,
            config_path,
            _dir: dir,
        }
    }

    /// The rendered configuration currently on disk.
    pub fn saved_text(&self) -> String {
        fs::read_to_string(&self.config_path).unwrap()
    }

    pub fn open_ports(&self) -> Vec<u16> {
        self.system
            .state
            .lock()
            .unwrap()
            .ports
            .iter()
            .copied()
            .collect()
    }
}

/// An HTTP registration shaped like the reference relation payload.
pub fn http_config() -> RelationConfig {
    RelationConfig {
        mode: Mode::Http,
        external_port: 80,
        internal_host: "test-host".to_string(),
        internal_port: 8000,
        urlbase: Some("/test".to_string()),
        subdomain: None,
        group_id: None,
        check: true,
        ssl: false,
        ssl_verify: false,
        proxypass: false,
        rewrite_path: false,
        acl_local: false,
    }
}

pub fn tcp_config() -> RelationConfig {
    RelationConfig {
        mode: Mode::Tcp,
        external_port: 90,
        urlbase: None,
        ..http_config()
    }
}
