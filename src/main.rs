//! Hook entry point. Juju dispatches every hook and scheduled job to
//! this binary with the event name as a subcommand; relation payloads
//! arrive as JSON on a file or stdin.

use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use haproxy_charm::config::{load_or_default, RelationConfig, RelationPayload};
use haproxy_charm::system::{CertbotIssuer, CronScheduler, JujuSystem};
use haproxy_charm::{CfgStatus, Lifecycle, ProxyEngine};

#[derive(Parser)]
#[command(name = "haproxy-charm")]
#[command(about = "Reconciles haproxy.cfg with charm config and relation data", long_about = None)]
struct Cli {
    /// Path of the charm configuration file.
    #[arg(short, long, default_value = "/etc/haproxy-charm.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// First-run setup: seed haproxy.cfg and the ssl directory
    Install,
    /// Apply charm-level feature toggles after a config change
    Configure,
    /// Apply relation data published by a remote unit
    RelationChanged {
        /// Remote unit name, e.g. "app/0"
        remote_unit: String,
        /// JSON payload file; "-" reads stdin
        #[arg(default_value = "-")]
        payload: String,
    },
    /// Tear down everything a departing remote unit registered
    RelationDeparted {
        remote_unit: String,
        #[arg(default_value = "-")]
        payload: String,
    },
    /// Disable managed features before the unit goes away
    Stop,
    /// Re-register certificate domains and reinstall the combined pem
    RenewCert {
        /// Renew in place without re-running domain registration
        #[arg(long)]
        renew_only: bool,
    },
    /// Refresh UPnP leases for every open port
    RenewUpnp,
    /// Release every UPnP lease
    ReleaseUpnp,
    /// Converge externally-open ports with the bound frontends
    UpdatePorts,
}

fn main() -> ExitCode {
    haproxy_charm::observability::logging::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(status) => {
            println!(
                "{}",
                serde_json::json!({ "ok": status.ok, "message": status.message })
            );
            if status.ok {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(err) => {
            tracing::error!(error = %err, "Hook failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<CfgStatus, Box<dyn std::error::Error>> {
    let charm = load_or_default(&cli.config)?;

    let binary = std::env::current_exe().unwrap_or_else(|_| PathBuf::from("haproxy-charm"));
    let engine = ProxyEngine::new(
        charm.clone(),
        Box::new(JujuSystem),
        Box::new(CertbotIssuer {
            challenge_port: charm.letsencrypt.challenge_port,
        }),
        Box::new(CronScheduler::new(binary)),
    );
    let mut lifecycle = Lifecycle::new(engine);

    let status = match cli.command {
        Commands::Install => {
            lifecycle.install()?;
            lifecycle.configure()?
        }
        Commands::Configure => lifecycle.configure()?,
        Commands::RelationChanged {
            remote_unit,
            payload,
        } => {
            let configs = read_payload(&payload)?;
            lifecycle.relation_changed(&remote_unit, &configs)?
        }
        Commands::RelationDeparted {
            remote_unit,
            payload,
        } => {
            let configs = read_payload(&payload)?;
            lifecycle.relation_departed(&remote_unit, &configs)?;
            CfgStatus::applied()
        }
        Commands::Stop => {
            lifecycle.stop()?;
            CfgStatus::applied()
        }
        Commands::RenewCert { renew_only } => lifecycle.renew_cert(!renew_only)?,
        Commands::RenewUpnp => {
            lifecycle.renew_upnp()?;
            CfgStatus::applied()
        }
        Commands::ReleaseUpnp => {
            lifecycle.release_upnp()?;
            CfgStatus::applied()
        }
        Commands::UpdatePorts => {
            lifecycle.update_ports()?;
            CfgStatus::applied()
        }
    };
    Ok(status)
}

fn read_payload(source: &str) -> Result<Vec<RelationConfig>, Box<dyn std::error::Error>> {
    let text = if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        fs::read_to_string(source)?
    };
    let payload: RelationPayload = serde_json::from_str(&text)?;
    Ok(payload.into_vec())
}
