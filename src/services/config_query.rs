//! Server configuration queries (`/mime-types`, `/detectors`, `/parsers/details`).

use std::str::FromStr;

use serde_json::Value;

use super::ACCEPT_JSON;
use crate::client::TikaClient;
use crate::config::RequestOptions;
use crate::error::TikaError;
use crate::http_client::RequestSpec;

/// Which part of the server configuration to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOption {
    MimeTypes,
    Detectors,
    Parsers,
}

impl ConfigOption {
    pub fn path(self) -> &'static str {
        match self {
            ConfigOption::MimeTypes => "/mime-types",
            ConfigOption::Detectors => "/detectors",
            ConfigOption::Parsers => "/parsers/details",
        }
    }
}

impl FromStr for ConfigOption {
    type Err = TikaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mime-types" => Ok(ConfigOption::MimeTypes),
            "detectors" => Ok(ConfigOption::Detectors),
            "parsers" => Ok(ConfigOption::Parsers),
            other => Err(TikaError::Config(format!(
                "config option must be one of mime-types, detectors, parsers; got {:?}",
                other
            ))),
        }
    }
}

/// Configuration façade.
pub struct ServerConfig<'a> {
    client: &'a TikaClient,
}

impl<'a> ServerConfig<'a> {
    pub fn new(client: &'a TikaClient) -> Self {
        Self { client }
    }

    /// Fetch a configuration document.
    ///
    /// Returns the status and the JSON document, which is `None` for a
    /// non-success status.
    pub fn get(
        &self,
        option: ConfigOption,
        options: RequestOptions,
    ) -> Result<(u16, Option<Value>), TikaError> {
        let spec = RequestSpec::get(option.path())
            .accept(ACCEPT_JSON)
            .options(options);
        let envelope = self.client.call(spec)?;

        if !envelope.is_success() {
            return Ok((envelope.status, None));
        }
        let document = serde_json::from_slice(envelope.as_bytes())
            .map_err(crate::error::DecodeError::from)?;
        Ok((envelope.status, Some(document)))
    }
}
