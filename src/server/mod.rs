//! Local Tika server provisioning.
//!
//! Decides whether a server is already reachable and, when it is not,
//! fetches the server artifact and supervises a child process for it:
//! - `artifact`: locate, download and checksum-verify the server jar
//! - `probe`: check whether an endpoint already accepts TCP connections
//! - `process`: launch the server, confirm readiness, terminate it
//! - `resolver`: tie the above together behind `ensure_server`

pub mod artifact;
pub mod probe;
pub mod process;
pub mod resolver;

pub use artifact::{source_filename, ArtifactFetcher, ArtifactRecord, Origin};
pub use probe::{PortProbe, TcpProbe};
pub use process::{
    terminate, LaunchRequest, LaunchState, ProcessSupervisor, ServerHandle, ServerLauncher,
    SupervisorConfig, READINESS_MARKER, SERVER_ENTRYPOINT,
};
pub use resolver::{EndpointResolver, ServerSpec};

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::TikaError;

/// Identifies a server instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(scheme: &str, host: &str, port: u16) -> Self {
        Self {
            scheme: scheme.to_string(),
            host: host.to_string(),
            port,
        }
    }

    /// Parse `scheme://host[:port]`. A missing port uses the scheme's default.
    pub fn parse(value: &str) -> Result<Self, TikaError> {
        let url = Url::parse(value.trim())
            .map_err(|e| TikaError::Config(format!("invalid endpoint {:?}: {}", value, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(TikaError::Config(format!(
                "endpoint scheme must be http or https, got {:?}",
                url.scheme()
            )));
        }

        let host = url
            .host_str()
            .ok_or_else(|| TikaError::Config(format!("endpoint {:?} has no host", value)))?;
        // Url keeps IPv6 brackets in host_str
        let host = host.trim_start_matches('[').trim_end_matches(']');
        let port = url
            .port_or_known_default()
            .ok_or_else(|| TikaError::Config(format!("endpoint {:?} has no port", value)))?;

        Ok(Self::new(url.scheme(), host, port))
    }

    /// Whether the host is this machine, so a server may be provisioned for it.
    pub fn is_local(&self) -> bool {
        if self.host.eq_ignore_ascii_case("localhost") {
            return true;
        }
        self.host
            .parse::<IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false)
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> String {
        if self.host.contains(':') {
            format!("{}://[{}]:{}", self.scheme, self.host, self.port)
        } else {
            format!("{}://{}:{}", self.scheme, self.host, self.port)
        }
    }

    /// Full URL for a service path such as `/tika`.
    pub fn url(&self, service_path: &str) -> String {
        format!("{}{}", self.base_url(), service_path)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base_url())
    }
}
