//! Error types for the Tika client.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while bringing a local server up.
///
/// Every variant is fatal to the operation that triggered provisioning.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error("Runtime binary not found: {0} (install a Java runtime or set TIKA_JAVA)")]
    RuntimeNotFound(String),

    #[error("Cannot open server log file {}: {source}", .path.display())]
    LogFileUnwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to download {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("Server artifact not found: {}", .0.display())]
    ArtifactMissing(PathBuf),

    #[error("Checksum verification failed for {}", .0.display())]
    ChecksumMismatch(PathBuf),

    #[error("Tika server did not report readiness after {attempts} attempts (see {})", .log.display())]
    ReadinessTimeout { attempts: u32, log: PathBuf },

    #[error("Failed to spawn server process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Cannot resolve host {host}: {reason}")]
    Unresolvable { host: String, reason: String },

    #[error("IO error during provisioning: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while decoding a server response.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Invalid JSON response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid archive response: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Malformed metadata record: {0}")]
    MalformedMetadata(String),

    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),
}

/// Top-level error for all client operations.
#[derive(Debug, Error)]
pub enum TikaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Provisioning(#[from] ProvisioningError),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TikaError {
    /// Whether this error stops the session from serving further requests.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TikaError::Provisioning(_))
    }
}

pub type Result<T> = std::result::Result<T, TikaError>;
