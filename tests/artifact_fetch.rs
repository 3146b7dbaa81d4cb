//! Artifact download and checksum recovery against a fake server.

mod common;

use std::fs;
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use sha2::{Digest, Sha512};
use tempfile::TempDir;

use common::FakeTika;
use tika::server::ArtifactFetcher;
use tika::ProvisioningError;

const JAR: &[u8] = b"PK\x03\x04 tika server bytes";

fn digest(bytes: &[u8]) -> String {
    hex::encode(Sha512::digest(bytes))
}

fn serve_jar(jar: &'static [u8], checksum: String) -> FakeTika {
    FakeTika::start(move |request| match request.url.as_str() {
        "/tika-server.jar" => (200, jar.to_vec()),
        "/tika-server.jar.sha512" => (200, format!("{}  tika-server.jar\n", checksum).into_bytes()),
        _ => (404, Vec::new()),
    })
}

#[test]
fn fresh_download_is_verified() {
    let fake = serve_jar(JAR, digest(JAR));
    let dir = TempDir::new().unwrap();
    let fetcher = ArtifactFetcher::new(dir.path());

    let path = fetcher.ensure_artifact(&fake.url("/tika-server.jar")).unwrap();

    assert_eq!(fs::read(&path).unwrap(), JAR);
    assert!(path.starts_with(dir.path()));
    assert_eq!(fake.count("/tika-server.jar"), 1);
    assert_eq!(fake.count("/tika-server.jar.sha512"), 1);

    // Cached and verified: nothing is downloaded again
    fetcher.ensure_artifact(&fake.url("/tika-server.jar")).unwrap();
    assert_eq!(fake.count("/tika-server.jar"), 1);
    assert_eq!(fake.count("/tika-server.jar.sha512"), 1);
}

#[test]
fn tampered_cache_is_refetched_once() {
    let fake = serve_jar(JAR, digest(JAR));
    let dir = TempDir::new().unwrap();
    let fetcher = ArtifactFetcher::new(dir.path());
    let locator = fake.url("/tika-server.jar");

    let record = fetcher.record_for(&locator).unwrap();
    fs::write(&record.local_path, b"truncated").unwrap();
    fs::write(&record.checksum_path, digest(JAR)).unwrap();

    let path = fetcher.ensure_artifact(&locator).unwrap();

    assert_eq!(fs::read(&path).unwrap(), JAR);
    assert_eq!(fake.count("/tika-server.jar"), 1);
}

#[test]
fn persistent_mismatch_is_fatal_after_one_refetch() {
    let fake = serve_jar(JAR, digest(b"some other release"));
    let dir = TempDir::new().unwrap();
    let fetcher = ArtifactFetcher::new(dir.path());

    let result = fetcher.ensure_artifact(&fake.url("/tika-server.jar"));

    assert!(matches!(result, Err(ProvisioningError::ChecksumMismatch(_))));
    assert_eq!(fake.count("/tika-server.jar"), 2);
}

#[test]
fn missing_remote_artifact_is_a_download_error() {
    let fake = FakeTika::start(|_| (404, Vec::new()));
    let dir = TempDir::new().unwrap();
    let fetcher = ArtifactFetcher::new(dir.path());
    let locator = fake.url("/tika-server.jar");

    let result = fetcher.ensure_artifact(&locator);

    assert!(matches!(result, Err(ProvisioningError::Download { .. })));
    assert!(!fetcher.record_for(&locator).unwrap().local_path.exists());
}

#[test]
fn transport_failure_is_retried_once_then_reported() {
    // Accepts connections and hangs up before any TLS handshake completes
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    thread::spawn(move || {
        for stream in listener.incoming() {
            counter.fetch_add(1, Ordering::SeqCst);
            drop(stream);
        }
    });

    let dir = TempDir::new().unwrap();
    let fetcher = ArtifactFetcher::new(dir.path());
    let dest = dir.path().join("tika-server.jar");
    let url = format!("https://127.0.0.1:{}/tika-server.jar", port);

    let result = fetcher.fetch_artifact(&url, &dest);

    assert!(matches!(result, Err(ProvisioningError::Download { .. })));
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert!(!dest.exists());
}
