//! Service façades over the Tika REST API.
//!
//! Each façade maps a closed set of options to fixed service paths, sends
//! the request through the session's dispatcher and decodes the body into
//! its own result shape.

pub mod config_query;
pub mod detector;
pub mod language;
pub mod parser;
pub mod translate;
pub mod unpack;

pub use config_query::{ConfigOption, ServerConfig};
pub use detector::{DetectOption, Detector};
pub use language::{LanguageDetector, LanguageOption};
pub use parser::{Parsed, ParseService, Parser};
pub use translate::{TranslateSpec, Translator};
pub use unpack::{Unpacked, Unpacker, UnpackOption};

use std::fs::File;

use serde::Serialize;

use crate::client::TikaClient;
use crate::error::TikaError;
use crate::http_client::{content_disposition, RequestSpec, ResponseEnvelope};
use crate::server::source_filename;

pub const ACCEPT_JSON: &str = "application/json";
pub const ACCEPT_TEXT: &str = "text/plain";
pub const ACCEPT_ZIP: &str = "application/zip";

/// Plain-text service result (detect, language, translate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextResult {
    pub status: u16,
    pub text: String,
}

impl From<ResponseEnvelope> for TextResult {
    fn from(envelope: ResponseEnvelope) -> Self {
        Self {
            status: envelope.status,
            text: envelope.as_text().into_owned(),
        }
    }
}

/// Attach a document to a request as a streamed body.
///
/// URLs are fetched into the session cache first. The locator's filename is
/// sent in Content-Disposition so the server can use it as a type hint.
pub(crate) fn with_document(
    client: &TikaClient,
    spec: RequestSpec,
    locator: &str,
) -> Result<RequestSpec, TikaError> {
    let path = client.fetch_document(locator)?;
    let file = File::open(&path)?;

    // Name the document as the caller did, not as it is cached
    let spec = match source_filename(locator) {
        Some(name) => spec.header("Content-Disposition", content_disposition(&name)),
        None => spec,
    };
    Ok(spec.body(file))
}
