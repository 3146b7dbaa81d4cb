//! Client session.
//!
//! A `TikaClient` owns the endpoint resolver (and through it the supervised
//! server process, if one was launched), the request dispatcher and the
//! download cache. Dropping the session terminates any server it started.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::config::ClientConfig;
use crate::error::TikaError;
use crate::http_client::{Dispatcher, RequestSpec, ResponseEnvelope};
use crate::server::{
    ArtifactFetcher, Endpoint, EndpointResolver, ProcessSupervisor, ServerSpec, SupervisorConfig,
    TcpProbe,
};
use crate::services::{Detector, LanguageDetector, Parser, ServerConfig, Translator, Unpacker};

pub struct TikaClient {
    config: ClientConfig,
    dispatcher: Dispatcher,
    // Serializes provisioning so concurrent first calls launch at most one server
    resolver: Mutex<EndpointResolver>,
    fetcher: ArtifactFetcher,
}

impl TikaClient {
    /// Create a session that probes with TCP and launches the server as a child process.
    pub fn new(config: ClientConfig) -> Result<Self, TikaError> {
        let resolver = EndpointResolver::new(
            Box::new(TcpProbe::default()),
            Box::new(ProcessSupervisor::new(SupervisorConfig::from_client_config(
                &config,
            ))),
            ArtifactFetcher::new(&config.cache_dir),
        );
        Self::with_resolver(config, resolver)
    }

    /// Create a session from `TIKA_*` environment variables.
    pub fn from_env() -> Result<Self, TikaError> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Create a session around a custom resolver.
    pub fn with_resolver(config: ClientConfig, resolver: EndpointResolver) -> Result<Self, TikaError> {
        let dispatcher = Dispatcher::new(config.request_defaults())?;
        let fetcher = ArtifactFetcher::new(&config.cache_dir);
        Ok(Self {
            config,
            dispatcher,
            resolver: Mutex::new(resolver),
            fetcher,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Make sure the configured endpoint is serving, provisioning a local
    /// server if needed.
    pub fn ensure_server(&self) -> Result<Endpoint, TikaError> {
        if self.config.client_only {
            return Ok(self.config.endpoint.clone());
        }

        let spec = ServerSpec::from_client_config(&self.config);
        let endpoint = self
            .lock_resolver()
            .ensure_server(&self.config.endpoint, &spec)?;
        Ok(endpoint)
    }

    /// Dispatch one request against the resolved endpoint.
    pub fn call(&self, spec: RequestSpec) -> Result<ResponseEnvelope, TikaError> {
        let endpoint = self.ensure_server()?;
        self.dispatcher.send(&endpoint, spec)
    }

    /// Resolve a document locator to a local file, downloading URLs into the cache.
    pub(crate) fn fetch_document(&self, locator: &str) -> Result<PathBuf, TikaError> {
        let (path, origin) = self.fetcher.resolve(locator)?;
        debug!("Document {} resolved to {} ({:?})", locator, path.display(), origin);
        Ok(path)
    }

    /// PID of the server launched by this session, if any.
    pub fn server_pid(&self) -> Option<u32> {
        self.lock_resolver().handle().map(|h| h.pid())
    }

    /// Terminate the server launched by this session, if any.
    pub fn shutdown(&self) {
        self.lock_resolver().shutdown();
    }

    pub fn parser(&self) -> Parser<'_> {
        Parser::new(self)
    }

    pub fn detector(&self) -> Detector<'_> {
        Detector::new(self)
    }

    pub fn language(&self) -> LanguageDetector<'_> {
        LanguageDetector::new(self)
    }

    pub fn translator(&self) -> Translator<'_> {
        Translator::new(self)
    }

    pub fn unpacker(&self) -> Unpacker<'_> {
        Unpacker::new(self)
    }

    pub fn server_config(&self) -> ServerConfig<'_> {
        ServerConfig::new(self)
    }

    fn lock_resolver(&self) -> MutexGuard<'_, EndpointResolver> {
        // A panic mid-provisioning leaves the resolver usable; the handle is still tracked
        self.resolver
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for TikaClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProvisioningError;
    use crate::server::{LaunchRequest, PortProbe, ServerHandle, ServerLauncher};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct ClosedPort;

    impl PortProbe for ClosedPort {
        fn is_open(&self, _host: &str, _port: u16) -> Result<bool, ProvisioningError> {
            Ok(false)
        }
    }

    struct CountingLauncher(Arc<AtomicUsize>);

    impl ServerLauncher for CountingLauncher {
        fn launch(&mut self, _request: &LaunchRequest) -> Result<ServerHandle, ProvisioningError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(ServerHandle::new(None, 7, PathBuf::from("tika.log")))
        }
    }

    fn client(client_only: bool, launches: Arc<AtomicUsize>) -> (TikaClient, tempfile::TempDir) {
        let dir = tempfile::TempDir::new().unwrap();
        let jar = dir.path().join("tika-server.jar");
        std::fs::write(&jar, b"jar").unwrap();

        let config = ClientConfig {
            server_jar: jar.to_string_lossy().to_string(),
            cache_dir: dir.path().to_path_buf(),
            client_only,
            ..ClientConfig::default()
        };
        let resolver = EndpointResolver::new(
            Box::new(ClosedPort),
            Box::new(CountingLauncher(launches)),
            ArtifactFetcher::new(dir.path()),
        );
        (TikaClient::with_resolver(config, resolver).unwrap(), dir)
    }

    #[test]
    fn test_client_only_never_provisions() {
        let launches = Arc::new(AtomicUsize::new(0));
        let (client, _dir) = client(true, launches.clone());

        let endpoint = client.ensure_server().unwrap();
        assert_eq!(endpoint, ClientConfig::default().endpoint);
        assert_eq!(launches.load(Ordering::SeqCst), 0);
        assert_eq!(client.server_pid(), None);
    }

    #[test]
    fn test_local_endpoint_is_provisioned_and_torn_down() {
        let launches = Arc::new(AtomicUsize::new(0));
        let (client, _dir) = client(false, launches.clone());

        client.ensure_server().unwrap();
        assert_eq!(launches.load(Ordering::SeqCst), 1);
        assert_eq!(client.server_pid(), Some(7));

        client.shutdown();
        assert_eq!(client.server_pid(), None);
    }

    #[test]
    fn test_local_document_resolves_to_absolute_path() {
        let launches = Arc::new(AtomicUsize::new(0));
        let (client, dir) = client(true, launches);
        let doc = dir.path().join("doc.txt");
        std::fs::write(&doc, b"hello").unwrap();

        let path = client.fetch_document(&doc.to_string_lossy()).unwrap();
        assert_eq!(path, doc);
    }
}
