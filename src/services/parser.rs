//! Text and metadata extraction (`/meta`, `/tika`, `/rmeta`).

use std::fmt;
use std::str::FromStr;

use scraper::{Html, Selector};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::{with_document, ACCEPT_JSON, ACCEPT_TEXT};
use crate::client::TikaClient;
use crate::config::RequestOptions;
use crate::error::{DecodeError, TikaError};
use crate::http_client::{RequestBody, RequestSpec, ResponseEnvelope};

/// Key holding extracted text in recursive metadata parts.
pub const CONTENT_KEY: &str = "X-TIKA:content";

/// What to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseService {
    /// Metadata only.
    Meta,
    /// Text only.
    Text,
    /// Recursive text and metadata for the document and its embedded parts.
    All,
}

impl ParseService {
    pub fn path(self, xml_content: bool) -> &'static str {
        match self {
            ParseService::Meta => "/meta",
            ParseService::Text => "/tika",
            ParseService::All if xml_content => "/rmeta/xml",
            ParseService::All => "/rmeta/text",
        }
    }

    pub fn accept(self) -> &'static str {
        match self {
            ParseService::Text => ACCEPT_TEXT,
            ParseService::Meta | ParseService::All => ACCEPT_JSON,
        }
    }
}

impl FromStr for ParseService {
    type Err = TikaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "meta" => Ok(ParseService::Meta),
            "text" => Ok(ParseService::Text),
            "all" => Ok(ParseService::All),
            other => Err(TikaError::Config(format!(
                "parse option must be one of meta, text, all; got {:?}",
                other
            ))),
        }
    }
}

impl fmt::Display for ParseService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParseService::Meta => "meta",
            ParseService::Text => "text",
            ParseService::All => "all",
        };
        write!(f, "{}", name)
    }
}

/// Decoded parse result.
///
/// Both fields are `None` when the server returned no body or a
/// non-success status.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Parsed {
    pub status: u16,
    pub content: Option<String>,
    pub metadata: Option<Map<String, Value>>,
}

/// Parse façade.
pub struct Parser<'a> {
    client: &'a TikaClient,
}

impl<'a> Parser<'a> {
    pub fn new(client: &'a TikaClient) -> Self {
        Self { client }
    }

    /// Parse a local file or URL.
    pub fn from_file(
        &self,
        locator: &str,
        service: ParseService,
        xml_content: bool,
        options: RequestOptions,
    ) -> Result<Parsed, TikaError> {
        let spec = RequestSpec::put(service.path(xml_content))
            .accept(service.accept())
            .options(options);
        let spec = with_document(self.client, spec, locator)?;
        let envelope = self.client.call(spec)?;
        Ok(decode(service, &envelope)?)
    }

    /// Parse an in-memory document with the recursive service.
    pub fn from_buffer(
        &self,
        body: impl Into<RequestBody>,
        xml_content: bool,
        options: RequestOptions,
    ) -> Result<Parsed, TikaError> {
        let service = ParseService::All;
        let spec = RequestSpec::put(service.path(xml_content))
            .accept(ACCEPT_JSON)
            .body(body)
            .options(options);
        let envelope = self.client.call(spec)?;
        Ok(decode(service, &envelope)?)
    }

    /// Extract the text of each PDF page, in page order.
    ///
    /// Parses with XHTML content and splits on the `div.page` elements the
    /// PDF parser emits. A document without content yields no pages.
    pub fn pdf_pages(&self, locator: &str, options: RequestOptions) -> Result<Vec<String>, TikaError> {
        let parsed = self.from_file(locator, ParseService::All, true, options)?;
        match parsed.content {
            Some(xhtml) => Ok(split_pages(&xhtml)?),
            None => Ok(Vec::new()),
        }
    }
}

/// Trimmed text of every `div.page` element in an XHTML document.
pub fn split_pages(xhtml: &str) -> Result<Vec<String>, DecodeError> {
    let document = Html::parse_document(xhtml);
    let selector = Selector::parse("div.page")
        .map_err(|e| DecodeError::UnexpectedShape(format!("invalid page selector: {}", e)))?;

    Ok(document
        .select(&selector)
        .map(|page| page.text().collect::<String>().trim().to_string())
        .collect())
}

/// Decode a parse response for the given service.
pub fn decode(service: ParseService, envelope: &ResponseEnvelope) -> Result<Parsed, DecodeError> {
    let mut parsed = Parsed {
        status: envelope.status,
        ..Parsed::default()
    };

    if !envelope.is_success() {
        debug!("Parse returned status {}, no content decoded", envelope.status);
        return Ok(parsed);
    }
    if envelope.is_empty() {
        return Ok(parsed);
    }

    let body = envelope.as_text();
    match service {
        ParseService::Text => {
            parsed.content = Some(body.into_owned());
        }
        ParseService::Meta => match serde_json::from_str::<Value>(&body)? {
            Value::Object(map) => parsed.metadata = Some(map),
            other => {
                return Err(DecodeError::UnexpectedShape(format!(
                    "expected a metadata object, got {}",
                    json_kind(&other)
                )))
            }
        },
        ParseService::All => {
            let parts = match serde_json::from_str::<Value>(&body)? {
                Value::Array(parts) => parts,
                Value::Object(part) => vec![Value::Object(part)],
                other => {
                    return Err(DecodeError::UnexpectedShape(format!(
                        "expected a list of parts, got {}",
                        json_kind(&other)
                    )))
                }
            };
            let (content, metadata) = merge_parts(&parts)?;
            parsed.content = content;
            parsed.metadata = Some(metadata);
        }
    }

    Ok(parsed)
}

/// Concatenate content and coalesce metadata across recursive parts.
///
/// Content is joined in encounter order. A metadata key seen once stays a
/// scalar; a repeated key becomes a list, with later values appended.
fn merge_parts(parts: &[Value]) -> Result<(Option<String>, Map<String, Value>), DecodeError> {
    let mut content = String::new();
    let mut metadata = Map::new();

    for part in parts {
        let Value::Object(fields) = part else {
            return Err(DecodeError::UnexpectedShape(format!(
                "expected a metadata object, got {}",
                json_kind(part)
            )));
        };

        for (key, value) in fields {
            if key == CONTENT_KEY {
                if let Value::String(text) = value {
                    content.push_str(text);
                }
                continue;
            }

            match metadata.get_mut(key) {
                None => {
                    metadata.insert(key.clone(), value.clone());
                }
                Some(Value::Array(existing)) => existing.push(value.clone()),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value.clone()]);
                }
            }
        }
    }

    let content = if content.is_empty() {
        None
    } else {
        Some(content)
    };
    Ok((content, metadata))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
