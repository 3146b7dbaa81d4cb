//! Server artifact retrieval.
//!
//! Resolves a locator (local path or http(s) URL) to a file on disk,
//! downloading remote artifacts into the cache directory and verifying
//! them against a companion SHA-512 checksum file.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use reqwest::blocking::Client;
use sha2::{Digest, Sha512};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::ProvisioningError;

/// Extension of the companion checksum file, both remotely and on disk.
pub const CHECKSUM_EXTENSION: &str = "sha512";

/// Where a resolved file came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Local,
    Remote,
}

/// A remote artifact and its on-disk cache locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRecord {
    pub source_locator: String,
    pub local_path: PathBuf,
    pub checksum_path: PathBuf,
}

impl ArtifactRecord {
    /// URL of the published checksum for this artifact.
    pub fn checksum_url(&self) -> String {
        format!("{}.{}", self.source_locator, CHECKSUM_EXTENSION)
    }
}

enum DownloadFailure {
    Transport(reqwest::Error),
    Status(u16),
    Io(io::Error),
}

impl DownloadFailure {
    fn into_error(self, url: &str) -> ProvisioningError {
        let reason = match self {
            DownloadFailure::Transport(e) => e.to_string(),
            DownloadFailure::Status(code) => format!("HTTP status {}", code),
            DownloadFailure::Io(e) => e.to_string(),
        };
        ProvisioningError::Download {
            url: url.to_string(),
            reason,
        }
    }
}

/// Downloads and caches remote files under a cache directory.
#[derive(Debug, Clone)]
pub struct ArtifactFetcher {
    cache_dir: PathBuf,
}

impl ArtifactFetcher {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Resolve a locator to a local file.
    ///
    /// Locators without an http(s) scheme are local paths and are returned
    /// as absolute paths. Remote locators are downloaded to a destination
    /// derived from the URL.
    pub fn resolve(&self, locator: &str) -> Result<(PathBuf, Origin), ProvisioningError> {
        match remote_url(locator) {
            None => Ok((absolute(Path::new(locator))?, Origin::Local)),
            Some(url) => {
                let dest = self.destination_for(&url);
                info!("Retrieving {} to {}", url, dest.display());
                let path = self.fetch_artifact(url.as_str(), &dest)?;
                Ok((path, Origin::Remote))
            }
        }
    }

    /// Deterministic cache path for a URL: `{cache_dir}/{stem}-{hash[0..8]}.{ext}`.
    pub fn destination_for(&self, url: &Url) -> PathBuf {
        let hash = hex::encode(Sha512::digest(url.as_str().as_bytes()));
        let name = url_filename(url).unwrap_or_else(|| "download".to_string());

        let filename = match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => format!("{}-{}.{}", stem, &hash[..8], ext),
            _ => format!("{}-{}", name, &hash[..8]),
        };
        self.cache_dir.join(filename)
    }

    /// Cache record for a remote artifact locator, or `None` for local paths.
    pub fn record_for(&self, locator: &str) -> Option<ArtifactRecord> {
        let url = remote_url(locator)?;
        let local_path = self.destination_for(&url);
        let mut checksum_path = local_path.clone().into_os_string();
        checksum_path.push(".");
        checksum_path.push(CHECKSUM_EXTENSION);
        Some(ArtifactRecord {
            source_locator: url.to_string(),
            local_path,
            checksum_path: PathBuf::from(checksum_path),
        })
    }

    /// Download `url` to `dest`.
    ///
    /// A transport failure (for example TLS verification) is retried once
    /// with certificate verification relaxed before giving up.
    pub fn fetch_artifact(&self, url: &str, dest: &Path) -> Result<PathBuf, ProvisioningError> {
        match self.download(url, dest, true) {
            Ok(()) => Ok(dest.to_path_buf()),
            Err(DownloadFailure::Transport(e)) => {
                warn!(
                    "Download of {} failed ({}), retrying without certificate verification",
                    url, e
                );
                self.download(url, dest, false)
                    .map(|_| dest.to_path_buf())
                    .map_err(|e| e.into_error(url))
            }
            Err(e) => Err(e.into_error(url)),
        }
    }

    fn download(&self, url: &str, dest: &Path, verify_tls: bool) -> Result<(), DownloadFailure> {
        if dest.exists() {
            debug!("Removing stale {}", dest.display());
            fs::remove_file(dest).map_err(DownloadFailure::Io)?;
        }
        let parent = dest
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).map_err(DownloadFailure::Io)?;

        let client = Client::builder()
            .timeout(None)
            .danger_accept_invalid_certs(!verify_tls)
            .build()
            .map_err(DownloadFailure::Transport)?;

        let mut response = client
            .get(url)
            .send()
            .map_err(DownloadFailure::Transport)?;
        if !response.status().is_success() {
            return Err(DownloadFailure::Status(response.status().as_u16()));
        }

        // Write next to the destination so a failed transfer never leaves a partial file
        let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(DownloadFailure::Io)?;
        response
            .copy_to(&mut tmp)
            .map_err(DownloadFailure::Transport)?;
        tmp.persist(dest)
            .map_err(|e| DownloadFailure::Io(e.error))?;
        Ok(())
    }

    /// Compare the artifact's SHA-512 against its checksum file.
    ///
    /// The checksum file is fetched if it is not cached yet. Returns false on
    /// mismatch or when no checksum can be obtained.
    pub fn verify_checksum(&self, record: &ArtifactRecord) -> bool {
        if !record.checksum_path.exists() {
            if let Err(e) = self.fetch_artifact(&record.checksum_url(), &record.checksum_path) {
                warn!("Could not fetch checksum for {}: {}", record.source_locator, e);
                return false;
            }
        }

        let expected = match fs::read_to_string(&record.checksum_path) {
            Ok(text) => text.split_whitespace().next().map(str::to_ascii_lowercase),
            Err(e) => {
                warn!("Could not read {}: {}", record.checksum_path.display(), e);
                return false;
            }
        };
        let Some(expected) = expected else {
            warn!("Checksum file {} is empty", record.checksum_path.display());
            return false;
        };

        match file_digest(&record.local_path) {
            Ok(actual) if actual == expected => true,
            Ok(actual) => {
                warn!(
                    "Checksum mismatch for {}: expected {}, got {}",
                    record.local_path.display(),
                    expected,
                    actual
                );
                false
            }
            Err(e) => {
                warn!("Could not hash {}: {}", record.local_path.display(), e);
                false
            }
        }
    }

    /// Make the server artifact available locally.
    ///
    /// Remote artifacts are downloaded when not cached and verified; a
    /// failed verification discards the cached files and re-fetches exactly
    /// once before giving up.
    pub fn ensure_artifact(&self, locator: &str) -> Result<PathBuf, ProvisioningError> {
        let Some(record) = self.record_for(locator) else {
            let path = absolute(Path::new(locator))?;
            if !path.is_file() {
                return Err(ProvisioningError::ArtifactMissing(path));
            }
            return Ok(path);
        };

        if !record.local_path.exists() {
            info!(
                "Downloading {} to {}",
                record.source_locator,
                record.local_path.display()
            );
            self.fetch_artifact(&record.source_locator, &record.local_path)?;
        }

        if self.verify_checksum(&record) {
            return Ok(record.local_path);
        }

        warn!(
            "Discarding {} and fetching it again",
            record.local_path.display()
        );
        remove_if_exists(&record.local_path)?;
        remove_if_exists(&record.checksum_path)?;
        self.fetch_artifact(&record.source_locator, &record.local_path)?;

        if self.verify_checksum(&record) {
            Ok(record.local_path)
        } else {
            Err(ProvisioningError::ChecksumMismatch(record.local_path))
        }
    }
}

/// Hex-encoded SHA-512 of a file's contents.
pub fn file_digest(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha512::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// File name a locator refers to: the decoded last URL path segment, or the
/// local path's file name.
pub fn source_filename(locator: &str) -> Option<String> {
    match remote_url(locator) {
        Some(url) => url_filename(&url),
        None => Path::new(locator)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned()),
    }
}

fn url_filename(url: &Url) -> Option<String> {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
        .map(|s| {
            urlencoding::decode(s)
                .map(|d| d.into_owned())
                .unwrap_or_else(|_| s.to_string())
        })
        .map(|name| sanitize_filename(&name))
}

fn remote_url(locator: &str) -> Option<Url> {
    Url::parse(locator)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
}

fn absolute(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}
