//! External collaborator boundary.
//!
//! # Responsibilities
//! - Define the trait seams the engine talks through: OS port
//!   bookkeeping + service reload, certificate issuance, scheduled jobs
//! - Provide the production implementations that shell out to the host
//!
//! # Design Decisions
//! - Traits are object-safe; the engine holds `Box<dyn ...>` so tests
//!   can substitute in-memory fakes
//! - `register_domains` reports the issuer's exit code instead of an
//!   error: a failed registration aborts the TLS enable but is not fatal
//!   to the reconciliation pass
//! - Removing a scheduled job that does not exist is a warning, never an
//!   error

use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::Command;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SystemError {
    #[error("failed to run {command}: {source}")]
    Spawn { command: String, source: io::Error },
    #[error("{command} exited with code {code}")]
    Failed { command: String, code: i32 },
    #[error("unparseable output from {command}: {output}")]
    BadOutput { command: String, output: String },
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// OS and service-manager operations.
pub trait SystemOps {
    fn service_reload(&self, unit: &str) -> Result<(), SystemError>;
    fn open_port(&self, port: u16) -> Result<(), SystemError>;
    fn close_port(&self, port: u16) -> Result<(), SystemError>;
    fn opened_ports(&self) -> Result<Vec<u16>, SystemError>;
}

/// Certificate issuance collaborator.
pub trait CertIssuer {
    /// Register the configured domains; returns the issuer exit code
    /// (0 = success).
    fn register_domains(&self, domains: &[String]) -> Result<i32, SystemError>;

    /// Renew existing certificates in place.
    fn renew(&self) -> Result<(), SystemError>;
}

/// Scheduled-job registration collaborator.
pub trait Scheduler {
    fn add_job(&self, action: &str, interval: &str) -> Result<(), SystemError>;
    fn remove_job(&self, action: &str) -> Result<(), SystemError>;
}

fn run(program: &str, args: &[&str]) -> Result<std::process::Output, SystemError> {
    let command = format!("{} {}", program, args.join(" "));
    Command::new(program)
        .args(args)
        .output()
        .map_err(|source| SystemError::Spawn {
            command: command.clone(),
            source,
        })
}

fn run_checked(program: &str, args: &[&str]) -> Result<(), SystemError> {
    let output = run(program, args)?;
    if output.status.success() {
        Ok(())
    } else {
        Err(SystemError::Failed {
            command: format!("{} {}", program, args.join(" ")),
            code: output.status.code().unwrap_or(-1),
        })
    }
}

/// Production implementation shelling out to the Juju hook tools and
/// systemctl.
#[derive(Debug, Default)]
pub struct JujuSystem;

impl SystemOps for JujuSystem {
    fn service_reload(&self, unit: &str) -> Result<(), SystemError> {
        tracing::debug!(unit, "Reloading service");
        run_checked("systemctl", &["reload", unit])
    }

    fn open_port(&self, port: u16) -> Result<(), SystemError> {
        run_checked("open-port", &[&format!("{}/tcp", port)])
    }

    fn close_port(&self, port: u16) -> Result<(), SystemError> {
        run_checked("close-port", &[&format!("{}/tcp", port)])
    }

    fn opened_ports(&self) -> Result<Vec<u16>, SystemError> {
        let output = run("opened-ports", &[])?;
        let text = String::from_utf8_lossy(&output.stdout);
        let mut ports = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            // Lines look like "80/tcp".
            let port = line
                .split('/')
                .next()
                .and_then(|p| p.parse().ok())
                .ok_or_else(|| SystemError::BadOutput {
                    command: "opened-ports".to_string(),
                    output: line.to_string(),
                })?;
            ports.push(port);
        }
        Ok(ports)
    }
}

/// Certbot-backed issuer using its standalone HTTP challenge responder
/// on a local port; the engine routes `/.well-known/acme-challenge/`
/// traffic to it.
#[derive(Debug)]
pub struct CertbotIssuer {
    pub challenge_port: u16,
}

impl CertIssuer for CertbotIssuer {
    fn register_domains(&self, domains: &[String]) -> Result<i32, SystemError> {
        let port = self.challenge_port.to_string();
        let mut args = vec![
            "certonly",
            "--standalone",
            "--non-interactive",
            "--agree-tos",
            "--register-unsafely-without-email",
            "--http-01-port",
            &port,
        ];
        for domain in domains {
            args.push("-d");
            args.push(domain);
        }
        let output = run("certbot", &args)?;
        Ok(output.status.code().unwrap_or(-1))
    }

    fn renew(&self) -> Result<(), SystemError> {
        run_checked("certbot", &["renew", "--non-interactive"])
    }
}

/// Scheduler writing cron.d entries that call back into the charm
/// binary with the named action.
#[derive(Debug)]
pub struct CronScheduler {
    pub cron_dir: PathBuf,
    pub charm_binary: PathBuf,
}

impl CronScheduler {
    pub fn new(charm_binary: impl Into<PathBuf>) -> Self {
        Self {
            cron_dir: PathBuf::from("/etc/cron.d"),
            charm_binary: charm_binary.into(),
        }
    }

    fn job_path(&self, action: &str) -> PathBuf {
        self.cron_dir.join(format!("haproxy-charm-{}", action))
    }
}

impl Scheduler for CronScheduler {
    fn add_job(&self, action: &str, interval: &str) -> Result<(), SystemError> {
        let path = self.job_path(action);
        let entry = format!(
            "{} root {} {}\n",
            interval,
            self.charm_binary.display(),
            action
        );
        fs::write(&path, entry).map_err(|source| SystemError::Write {
            path: path.clone(),
            source,
        })?;
        tracing::info!(action, interval, "Scheduled job added");
        Ok(())
    }

    fn remove_job(&self, action: &str) -> Result<(), SystemError> {
        let path = self.job_path(action);
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(action, "Scheduled job removed");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(action, "Scheduled job was not present to remove");
                Ok(())
            }
            Err(source) => Err(SystemError::Write { path, source }),
        }
    }
}
