//! TCP reachability check for server endpoints.

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use crate::error::ProvisioningError;

/// Something that can tell whether a host:port accepts connections.
pub trait PortProbe: Send {
    /// Single connection attempt; no retries.
    ///
    /// A host that cannot be resolved is an error rather than `false`.
    fn is_open(&self, host: &str, port: u16) -> Result<bool, ProvisioningError>;
}

/// Probe that opens a short-lived TCP connection.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl PortProbe for TcpProbe {
    fn is_open(&self, host: &str, port: u16) -> Result<bool, ProvisioningError> {
        let addrs: Vec<_> = (host, port)
            .to_socket_addrs()
            .map_err(|e| ProvisioningError::Unresolvable {
                host: host.to_string(),
                reason: e.to_string(),
            })?
            .collect();

        if addrs.is_empty() {
            return Err(ProvisioningError::Unresolvable {
                host: host.to_string(),
                reason: "no addresses".to_string(),
            });
        }

        for addr in addrs {
            if TcpStream::connect_timeout(&addr, self.timeout).is_ok() {
                debug!("Port {} open on {}", port, addr);
                return Ok(true);
            }
        }

        debug!("Port {} closed on {}", port, host);
        Ok(false)
    }
}
