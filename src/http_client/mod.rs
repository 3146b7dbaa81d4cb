//! Request dispatch against a resolved Tika endpoint.

mod response;

pub use response::{content_disposition, ResponseBody, ResponseEnvelope};

use std::fs::File;
use std::time::{Duration, Instant};

use reqwest::blocking::{Body, Client};
use reqwest::Method;
use tracing::{debug, warn};

use crate::config::{merge_headers, RequestOptions, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::error::TikaError;
use crate::server::Endpoint;

/// Request payload.
#[derive(Debug, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Text is sent UTF-8 encoded.
    Text(String),
    Bytes(Vec<u8>),
    /// Streamed from disk without buffering.
    File(File),
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        RequestBody::Text(text)
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        RequestBody::Text(text.to_string())
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        RequestBody::Bytes(bytes)
    }
}

impl From<&[u8]> for RequestBody {
    fn from(bytes: &[u8]) -> Self {
        RequestBody::Bytes(bytes.to_vec())
    }
}

impl From<File> for RequestBody {
    fn from(file: File) -> Self {
        RequestBody::File(file)
    }
}

impl From<RequestBody> for Body {
    fn from(body: RequestBody) -> Self {
        match body {
            RequestBody::Empty => Body::from(Vec::new()),
            RequestBody::Text(text) => Body::from(text.into_bytes()),
            RequestBody::Bytes(bytes) => Body::from(bytes),
            RequestBody::File(file) => Body::from(file),
        }
    }
}

/// One request against a service path; consumed by a single dispatch.
#[derive(Debug)]
pub struct RequestSpec {
    pub method: Method,
    pub service_path: String,
    pub body: RequestBody,
    pub headers: Vec<(String, String)>,
    /// Return the body as untouched bytes instead of decoded text.
    pub raw_response: bool,
    pub options: RequestOptions,
}

impl RequestSpec {
    pub fn new(method: Method, service_path: impl Into<String>) -> Self {
        Self {
            method,
            service_path: service_path.into(),
            body: RequestBody::Empty,
            headers: Vec::new(),
            raw_response: false,
            options: RequestOptions::default(),
        }
    }

    pub fn get(service_path: impl Into<String>) -> Self {
        Self::new(Method::GET, service_path)
    }

    pub fn put(service_path: impl Into<String>) -> Self {
        Self::new(Method::PUT, service_path)
    }

    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = body.into();
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn accept(self, mime: &str) -> Self {
        self.header("Accept", mime)
    }

    pub fn raw(mut self) -> Self {
        self.raw_response = true;
        self
    }

    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}

/// Sends requests with default timeout/TLS/header policy.
pub struct Dispatcher {
    defaults: RequestOptions,
    client: Client,
}

impl Dispatcher {
    /// Create a dispatcher; `defaults` apply wherever a request leaves a field unset.
    pub fn new(defaults: RequestOptions) -> Result<Self, TikaError> {
        let client = build_client(&defaults)?;
        Ok(Self { defaults, client })
    }

    pub fn defaults(&self) -> &RequestOptions {
        &self.defaults
    }

    /// Send a request and return its status and body.
    ///
    /// Non-success statuses are logged and returned, not raised; only
    /// transport failures are errors.
    pub fn send(
        &self,
        endpoint: &Endpoint,
        spec: RequestSpec,
    ) -> Result<ResponseEnvelope, TikaError> {
        let effective = spec.options.merged_over(&self.defaults);
        let headers = merge_headers(
            &merge_headers(&self.defaults.headers, &spec.headers),
            &spec.options.headers,
        );

        // Only build a dedicated client when transport settings differ
        let custom;
        let client = if effective.timeout == self.defaults.timeout
            && effective.verify_tls == self.defaults.verify_tls
        {
            &self.client
        } else {
            custom = build_client(&effective)?;
            &custom
        };

        let url = endpoint.url(&spec.service_path);
        debug!("{} {}", spec.method, url);

        let mut request = client.request(spec.method.clone(), &url);
        for (name, value) in &headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if !matches!(spec.body, RequestBody::Empty) {
            request = request.body(Body::from(spec.body));
        }

        let start = Instant::now();
        let response = request.send()?;
        let status = response.status().as_u16();
        let bytes = response.bytes()?;
        debug!(
            "{} {} -> {} ({} bytes, {} ms)",
            spec.method,
            url,
            status,
            bytes.len(),
            start.elapsed().as_millis()
        );

        if !(200..300).contains(&status) {
            warn!("Tika server returned status {} for {}", status, url);
        }

        Ok(if spec.raw_response {
            ResponseEnvelope::raw(status, bytes.to_vec())
        } else {
            ResponseEnvelope::text(status, String::from_utf8_lossy(&bytes).into_owned())
        })
    }
}

fn build_client(options: &RequestOptions) -> Result<Client, TikaError> {
    let timeout = options
        .timeout
        .unwrap_or(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS));
    let client = Client::builder()
        .user_agent(concat!("tika-client/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(timeout)
        .timeout(timeout)
        .danger_accept_invalid_certs(!options.verify_tls.unwrap_or(false))
        .gzip(true)
        .brotli(true)
        .build()?;
    Ok(client)
}
