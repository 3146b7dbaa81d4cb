//! In-process fake Tika server for integration tests.

#![allow(dead_code)]

use std::io::Read;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

use tempfile::TempDir;
use tiny_http::{Response, Server};

use tika::{ClientConfig, Endpoint, TikaClient};

/// A request as seen by the fake server.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

pub struct FakeTika {
    pub port: u16,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl FakeTika {
    /// Serve every request with `handler` on an ephemeral loopback port.
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&Recorded) -> (u16, Vec<u8>) + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = Server::from_listener(listener, None).unwrap();

        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = requests.clone();
        thread::spawn(move || {
            for mut request in server.incoming_requests() {
                let mut body = Vec::new();
                let _ = request.as_reader().read_to_end(&mut body);
                let recorded = Recorded {
                    method: request.method().to_string(),
                    url: request.url().to_string(),
                    headers: request
                        .headers()
                        .iter()
                        .map(|h| (h.field.to_string(), h.value.to_string()))
                        .collect(),
                    body,
                };

                let (status, payload) = handler(&recorded);
                log.lock().unwrap().push(recorded);
                let _ = request.respond(Response::from_data(payload).with_status_code(status));
            }
        });

        Self { port, requests }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new("http", "127.0.0.1", self.port)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, url: &str) -> usize {
        self.requests().iter().filter(|r| r.url == url).count()
    }
}

/// Client configuration pointing at `fake`, with scratch directories in `dir`.
pub fn config_for(fake: &FakeTika, dir: &TempDir) -> ClientConfig {
    ClientConfig {
        endpoint: fake.endpoint(),
        cache_dir: dir.path().join("cache"),
        log_dir: dir.path().to_path_buf(),
        client_only: true,
        ..ClientConfig::default()
    }
}

pub fn client_for(fake: &FakeTika, dir: &TempDir) -> TikaClient {
    TikaClient::new(config_for(fake, dir)).unwrap()
}
