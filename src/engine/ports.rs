//! Externally-opened port convergence.
//!
//! The set of ports the host exposes must track the set of ports the
//! frontends bind, with one carve-out: a local-only stats port stays
//! closed. UPnP leases additionally need the open/close calls re-sent
//! on a schedule even for ports already in the desired state.

use super::{Error, ProxyEngine};

impl ProxyEngine {
    /// Ports that should be externally open: every bound frontend port,
    /// minus the stats port when the stats page is local-only.
    pub fn desired_ports(&mut self) -> Result<Vec<u16>, Error> {
        let stats = &self.charm.stats;
        let skip_stats = (stats.enabled && stats.local).then_some(stats.port);
        let ports = self
            .store
            .document()?
            .bound_ports()
            .into_iter()
            .filter(|port| Some(*port) != skip_stats)
            .collect();
        Ok(ports)
    }

    /// Converge the externally-opened ports with the bound frontends:
    /// open what is missing, close what is stale.
    pub fn update_ports(&mut self) -> Result<(), Error> {
        let desired = self.desired_ports()?;
        let opened = self.system.opened_ports()?;
        tracing::debug!(?desired, ?opened, "Converging open ports");

        for port in &desired {
            if !opened.contains(port) {
                tracing::debug!(port, "Opening port");
                self.system.open_port(*port)?;
            }
        }
        for port in opened {
            if !desired.contains(&port) {
                tracing::debug!(port, "Closing port");
                self.system.close_port(port)?;
            }
        }
        Ok(())
    }

    /// Refresh UPnP leases: converge first, then re-send an open for
    /// every port that should stay forwarded.
    pub fn renew_upnp(&mut self) -> Result<(), Error> {
        tracing::info!("Renewing upnp port requests");
        self.update_ports()?;
        for port in self.system.opened_ports()? {
            self.system.open_port(port)?;
        }
        Ok(())
    }

    /// Drop UPnP leases: converge first, then close every currently
    /// opened port so the forwards are released.
    pub fn release_upnp(&mut self) -> Result<(), Error> {
        tracing::info!("Releasing upnp port requests");
        self.update_ports()?;
        for port in self.system.opened_ports()? {
            self.system.close_port(port)?;
        }
        Ok(())
    }
}
