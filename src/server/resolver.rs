//! Endpoint resolution: reuse a running server or bring one up.

use std::path::PathBuf;

use tracing::{debug, info};

use super::artifact::ArtifactFetcher;
use super::probe::PortProbe;
use super::process::{terminate, LaunchRequest, ServerHandle, ServerLauncher};
use super::Endpoint;
use crate::config::ClientConfig;
use crate::error::ProvisioningError;

/// What to run when a local server has to be provisioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSpec {
    /// Server artifact locator (path or URL).
    pub artifact: String,
    pub classpath: Vec<PathBuf>,
    pub config_path: Option<PathBuf>,
    /// Skip provisioning entirely; the server is managed externally.
    pub client_only: bool,
}

impl ServerSpec {
    pub fn from_client_config(config: &ClientConfig) -> Self {
        Self {
            artifact: config.server_jar.clone(),
            classpath: config.classpath.clone(),
            config_path: config.server_config.clone(),
            client_only: config.client_only,
        }
    }
}

/// Owns the supervised server handle for one client session.
pub struct EndpointResolver {
    probe: Box<dyn PortProbe>,
    launcher: Box<dyn ServerLauncher>,
    fetcher: ArtifactFetcher,
    handle: Option<ServerHandle>,
}

impl EndpointResolver {
    pub fn new(
        probe: Box<dyn PortProbe>,
        launcher: Box<dyn ServerLauncher>,
        fetcher: ArtifactFetcher,
    ) -> Self {
        Self {
            probe,
            launcher,
            fetcher,
            handle: None,
        }
    }

    /// Return an endpoint that is expected to serve requests.
    ///
    /// Client-only mode and non-local hosts are returned as-is. A local port
    /// that already accepts connections counts as a running server and is
    /// never launched over. Otherwise the artifact is fetched and verified,
    /// then launched; a server that never reports readiness is an error.
    pub fn ensure_server(
        &mut self,
        endpoint: &Endpoint,
        spec: &ServerSpec,
    ) -> Result<Endpoint, ProvisioningError> {
        if spec.client_only {
            debug!("Client-only mode, using {} as-is", endpoint);
            return Ok(endpoint.clone());
        }

        if !endpoint.is_local() {
            debug!("{} is remote, assuming it is managed externally", endpoint);
            return Ok(endpoint.clone());
        }

        if self.probe.is_open(&endpoint.host, endpoint.port)? {
            return Ok(endpoint.clone());
        }

        // A tracked server whose port closed has died; reap it before relaunching
        if let Some(mut stale) = self.handle.take() {
            info!("Tika server {} is no longer reachable", stale.pid());
            terminate(&mut stale);
        }

        let artifact = self.fetcher.ensure_artifact(&spec.artifact)?;
        let request = LaunchRequest {
            artifact,
            host: endpoint.host.clone(),
            port: endpoint.port,
            classpath: spec.classpath.clone(),
            config_path: spec.config_path.clone(),
        };

        let handle = self.launcher.launch(&request)?;
        self.handle = Some(handle);
        Ok(endpoint.clone())
    }

    /// The server launched by this resolver, if any.
    pub fn handle(&self) -> Option<&ServerHandle> {
        self.handle.as_ref()
    }

    /// Terminate the launched server, if any.
    pub fn shutdown(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            terminate(&mut handle);
        }
    }
}
