//! Client for the Apache Tika REST server.
//!
//! Wraps the server's parse, detect, language, translate, unpack and
//! configuration services. When the configured endpoint is local and not
//! already serving, the client downloads the server jar, verifies it and
//! runs it as a supervised child process for the lifetime of the session.
//!
//! ```no_run
//! use tika::{ParseService, RequestOptions, TikaClient};
//!
//! # fn main() -> tika::Result<()> {
//! let client = TikaClient::from_env()?;
//! let parsed = client
//!     .parser()
//!     .from_file("report.pdf", ParseService::All, false, RequestOptions::new())?;
//! println!("{}", parsed.content.unwrap_or_default());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http_client;
pub mod server;
pub mod services;

pub use client::TikaClient;
pub use config::{ClientConfig, RequestOptions};
pub use error::{DecodeError, ProvisioningError, Result, TikaError};
pub use http_client::{RequestBody, RequestSpec, ResponseEnvelope};
pub use server::Endpoint;
pub use services::{
    ConfigOption, DetectOption, LanguageOption, ParseService, Parsed, TextResult, TranslateSpec,
    UnpackOption, Unpacked,
};
