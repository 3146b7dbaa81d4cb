//! Language identification (`/language/stream`, `/language/string`).

use std::str::FromStr;

use super::{with_document, TextResult, ACCEPT_TEXT};
use crate::client::TikaClient;
use crate::config::RequestOptions;
use crate::error::TikaError;
use crate::http_client::{RequestBody, RequestSpec};

/// Language options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageOption {
    /// Identify the language of a document's extracted text.
    File,
    /// Identify the language of a raw string.
    String,
}

impl LanguageOption {
    pub fn path(self) -> &'static str {
        match self {
            LanguageOption::File => "/language/stream",
            LanguageOption::String => "/language/string",
        }
    }
}

impl FromStr for LanguageOption {
    type Err = TikaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(LanguageOption::File),
            "string" => Ok(LanguageOption::String),
            other => Err(TikaError::Config(format!(
                "language option must be file or string; got {:?}",
                other
            ))),
        }
    }
}

/// Language façade. The result text is a two-letter code such as `en`.
pub struct LanguageDetector<'a> {
    client: &'a TikaClient,
}

impl<'a> LanguageDetector<'a> {
    pub fn new(client: &'a TikaClient) -> Self {
        Self { client }
    }

    /// Identify a document's language. `File` lets the server extract text
    /// first; `String` treats the document bytes as the text itself.
    pub fn from_file(
        &self,
        locator: &str,
        option: LanguageOption,
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
        option: LanguageOption,
        options: RequestOptions,
    ) -> Result<TextResult, TikaError> {
        let spec = RequestSpec::put(option.path())
            .accept(ACCEPT_TEXT)
            .body(body)
            .options(options);
        Ok(self.client.call(spec)?.into())
    }
}
