//! Client configuration.
//!
//! `ClientConfig` is an immutable value built from defaults or from `TIKA_*`
//! environment variables. `RequestOptions` carries per-call overrides for the
//! dispatcher and is constructed fresh for every request.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::TikaError;
use crate::server::Endpoint;

/// Default Tika server version used to build the artifact URL.
pub const DEFAULT_TIKA_VERSION: &str = "2.9.2";

/// Default server endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:9998";

/// Default translator class for the translate service.
pub const DEFAULT_TRANSLATOR: &str = "org.apache.tika.language.translate.Lingo24Translator";

/// Default name of the server log file.
pub const DEFAULT_LOG_FILE: &str = "tika-server.log";

/// Default connect/read timeout for requests.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Default readiness poll attempts.
pub const DEFAULT_STARTUP_MAX_RETRY: u32 = 3;

/// Default delay between readiness polls.
pub const DEFAULT_STARTUP_SLEEP_SECS: u64 = 5;

/// Build the Maven Central URL for a tika-server-standard release.
pub fn default_server_jar(version: &str) -> String {
    format!(
        "https://repo1.maven.org/maven2/org/apache/tika/tika-server-standard/{v}/tika-server-standard-{v}.jar",
        v = version
    )
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|d| d.join("tika"))
        .unwrap_or_else(std::env::temp_dir)
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server endpoint (scheme, host, port).
    pub endpoint: Endpoint,
    /// Server artifact locator: a local path or an http(s) URL.
    pub server_jar: String,
    /// Directory for downloaded artifacts, checksums and remote documents.
    pub cache_dir: PathBuf,
    /// Directory holding the server log file.
    pub log_dir: PathBuf,
    /// Server log file name.
    pub log_file: String,
    /// Extra classpath entries appended after the server jar.
    #[serde(default)]
    pub classpath: Vec<PathBuf>,
    /// Never provision a server; the caller manages it externally.
    #[serde(default)]
    pub client_only: bool,
    /// Translator class used by the translate service.
    pub translator: String,
    /// Runtime binary used to launch the server.
    pub java: String,
    /// Extra arguments passed to the runtime before the classpath.
    #[serde(default)]
    pub java_args: Vec<String>,
    /// Readiness poll attempts after launch.
    pub startup_max_retry: u32,
    /// Seconds between readiness polls.
    pub startup_sleep_secs: u64,
    /// Optional server configuration file passed as `--config`.
    #[serde(default)]
    pub server_config: Option<PathBuf>,
    /// Default request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Verify TLS certificates on requests by default.
    #[serde(default)]
    pub verify_tls: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::new("http", "localhost", 9998),
            server_jar: default_server_jar(DEFAULT_TIKA_VERSION),
            cache_dir: default_cache_dir(),
            log_dir: std::env::temp_dir(),
            log_file: DEFAULT_LOG_FILE.to_string(),
            classpath: Vec::new(),
            client_only: false,
            translator: DEFAULT_TRANSLATOR.to_string(),
            java: "java".to_string(),
            java_args: Vec::new(),
            startup_max_retry: DEFAULT_STARTUP_MAX_RETRY,
            startup_sleep_secs: DEFAULT_STARTUP_SLEEP_SECS,
            server_config: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            verify_tls: false,
        }
    }
}

impl ClientConfig {
    /// Build a configuration from the process environment.
    pub fn from_env() -> Result<Self, TikaError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_vars<F>(lookup: F) -> Result<Self, TikaError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(endpoint) = get("TIKA_SERVER_ENDPOINT") {
            config.endpoint = Endpoint::parse(&endpoint)?;
        }

        let version = get("TIKA_VERSION").unwrap_or_else(|| DEFAULT_TIKA_VERSION.to_string());
        config.server_jar = get("TIKA_SERVER_JAR").unwrap_or_else(|| default_server_jar(&version));

        if let Some(path) = get("TIKA_PATH") {
            config.cache_dir = PathBuf::from(path);
        }
        if let Some(path) = get("TIKA_LOG_PATH") {
            config.log_dir = PathBuf::from(path);
        }
        if let Some(name) = get("TIKA_LOG_FILE") {
            config.log_file = name;
        }
        if let Some(classpath) = get("TIKA_SERVER_CLASSPATH") {
            config.classpath = std::env::split_paths(&classpath).collect();
        }
        if let Some(flag) = get("TIKA_CLIENT_ONLY") {
            config.client_only = parse_bool("TIKA_CLIENT_ONLY", &flag)?;
        }
        if let Some(translator) = get("TIKA_TRANSLATOR") {
            config.translator = translator;
        }
        if let Some(java) = get("TIKA_JAVA") {
            config.java = java;
        }
        if let Some(args) = get("TIKA_JAVA_ARGS") {
            config.java_args = args.split_whitespace().map(String::from).collect();
        }
        if let Some(retries) = get("TIKA_STARTUP_MAX_RETRY") {
            config.startup_max_retry = parse_number("TIKA_STARTUP_MAX_RETRY", &retries)?;
        }
        if let Some(sleep) = get("TIKA_STARTUP_SLEEP") {
            config.startup_sleep_secs = parse_number("TIKA_STARTUP_SLEEP", &sleep)?;
        }
        if let Some(path) = get("TIKA_CONFIG") {
            config.server_config = Some(PathBuf::from(path));
        }

        Ok(config)
    }

    /// Full path of the server log file.
    pub fn log_path(&self) -> PathBuf {
        self.log_dir.join(&self.log_file)
    }

    /// Delay between readiness polls.
    pub fn startup_sleep(&self) -> Duration {
        Duration::from_secs(self.startup_sleep_secs)
    }

    /// Default request options derived from this configuration.
    pub fn request_defaults(&self) -> RequestOptions {
        RequestOptions {
            timeout: Some(Duration::from_secs(self.request_timeout_secs)),
            verify_tls: Some(self.verify_tls),
            headers: Vec::new(),
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, TikaError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(TikaError::Config(format!(
            "{} must be a boolean, got {:?}",
            key, other
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, TikaError> {
    value
        .trim()
        .parse()
        .map_err(|_| TikaError::Config(format!("{} must be a number, got {:?}", key, value)))
}

/// Per-request overrides.
///
/// Unset fields fall back to the dispatcher defaults; headers are merged
/// key-by-key (case-insensitive) with the caller's value winning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub timeout: Option<Duration>,
    pub verify_tls: Option<bool>,
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = Some(verify);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Layer these options over `base`, producing the effective options.
    pub fn merged_over(&self, base: &RequestOptions) -> RequestOptions {
        RequestOptions {
            timeout: self.timeout.or(base.timeout),
            verify_tls: self.verify_tls.or(base.verify_tls),
            headers: merge_headers(&base.headers, &self.headers),
        }
    }

    /// Look up a header value by case-insensitive name.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Merge two header lists; entries in `overrides` replace same-named entries in `base`.
pub fn merge_headers(
    base: &[(String, String)],
    overrides: &[(String, String)],
) -> Vec<(String, String)> {
    let mut merged: Vec<(String, String)> = base
        .iter()
        .filter(|(k, _)| !overrides.iter().any(|(o, _)| o.eq_ignore_ascii_case(k)))
        .cloned()
        .collect();
    merged.extend(overrides.iter().cloned());
    merged
}
