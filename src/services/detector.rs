//! MIME type detection (`/detect/stream`).

use std::str::FromStr;

use super::{with_document, TextResult, ACCEPT_TEXT};
use crate::client::TikaClient;
use crate::config::RequestOptions;
use crate::error::TikaError;
use crate::http_client::{RequestBody, RequestSpec};

/// Detection options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectOption {
    Type,
}

impl DetectOption {
    pub fn path(self) -> &'static str {
        match self {
            DetectOption::Type => "/detect/stream",
        }
    }
}

impl FromStr for DetectOption {
    type Err = TikaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "type" => Ok(DetectOption::Type),
            other => Err(TikaError::Config(format!(
                "detect option must be type; got {:?}",
                other
            ))),
        }
    }
}

/// Type detection façade. The result text is a MIME type such as `application/pdf`.
pub struct Detector<'a> {
    client: &'a TikaClient,
}

impl<'a> Detector<'a> {
    pub fn new(client: &'a TikaClient) -> Self {
        Self { client }
    }

    pub fn from_file(
        &self,
        locator: &str,
        option: DetectOption,
        options: RequestOptions,
    ) -> Result<TextResult, TikaError> {
        let spec = RequestSpec::put(option.path())
            .accept(ACCEPT_TEXT)
            .options(options);
        let spec = with_document(self.client, spec, locator)?;
        Ok(self.client.call(spec)?.into())
    }

    pub fn from_buffer(
        &self,
        body: impl Into<RequestBody>,
        option: DetectOption,
        options: RequestOptions,
    ) -> Result<TextResult, TikaError> {
        let spec = RequestSpec::put(option.path())
            .accept(ACCEPT_TEXT)
            .body(body)
            .options(options);
        Ok(self.client.call(spec)?.into())
    }
}
