//! Embedded resource extraction (`/unpack/all`).
//!
//! The server answers with an archive whose `__METADATA__` member holds CSV
//! `key,value[,value...]` records, whose `__TEXT__` member holds the
//! extracted text, and whose remaining members are the embedded files.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::str::FromStr;

use serde_json::{Map, Value};
use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

use super::{with_document, ACCEPT_ZIP};
use crate::client::TikaClient;
use crate::config::RequestOptions;
use crate::error::{DecodeError, TikaError};
use crate::http_client::{RequestBody, RequestSpec, ResponseEnvelope};

pub const METADATA_MEMBER: &str = "__METADATA__";
pub const TEXT_MEMBER: &str = "__TEXT__";

/// Unpack options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnpackOption {
    All,
}

impl UnpackOption {
    pub fn path(self) -> &'static str {
        match self {
            UnpackOption::All => "/unpack/all",
        }
    }
}

impl FromStr for UnpackOption {
    type Err = TikaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(UnpackOption::All),
            other => Err(TikaError::Config(format!(
                "unpack option must be all; got {:?}",
                other
            ))),
        }
    }
}

/// Decoded unpack result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Unpacked {
    pub status: u16,
    pub content: String,
    pub metadata: Map<String, Value>,
    /// Embedded files keyed by archive member name.
    pub attachments: BTreeMap<String, Vec<u8>>,
}

/// Unpack façade.
pub struct Unpacker<'a> {
    client: &'a TikaClient,
}

impl<'a> Unpacker<'a> {
    pub fn new(client: &'a TikaClient) -> Self {
        Self { client }
    }

    pub fn from_file(
        &self,
        locator: &str,
        option: UnpackOption,
        options: RequestOptions,
    ) -> Result<Unpacked, TikaError> {
        let spec = RequestSpec::put(option.path())
            .accept(ACCEPT_ZIP)
            .raw()
            .options(options);
        let spec = with_document(self.client, spec, locator)?;
        let envelope = self.client.call(spec)?;
        Ok(decode(&envelope)?)
    }

    pub fn from_buffer(
        &self,
        body: impl Into<RequestBody>,
        option: UnpackOption,
        options: RequestOptions,
    ) -> Result<Unpacked, TikaError> {
        let spec = RequestSpec::put(option.path())
            .accept(ACCEPT_ZIP)
            .raw()
            .body(body)
            .options(options);
        let envelope = self.client.call(spec)?;
        Ok(decode(&envelope)?)
    }
}

/// Decode an unpack archive.
pub fn decode(envelope: &ResponseEnvelope) -> Result<Unpacked, DecodeError> {
    let mut unpacked = Unpacked {
        status: envelope.status,
        ..Unpacked::default()
    };

    if !envelope.is_success() {
        debug!("Unpack returned status {}, nothing decoded", envelope.status);
        return Ok(unpacked);
    }
    if envelope.is_empty() {
        return Ok(unpacked);
    }

    let mut archive = ZipArchive::new(Cursor::new(envelope.as_bytes()))?;
    for index in 0..archive.len() {
        let mut member = archive.by_index(index)?;
        if !member.is_file() {
            continue;
        }

        let name = member.name().to_string();
        let mut data = Vec::new();
        member.read_to_end(&mut data).map_err(ZipError::from)?;

        match name.as_str() {
            METADATA_MEMBER => unpacked.metadata = parse_metadata(&data)?,
            TEXT_MEMBER => {
                unpacked.content = String::from_utf8(data).map_err(|e| {
                    DecodeError::UnexpectedShape(format!("{} is not UTF-8: {}", TEXT_MEMBER, e))
                })?
            }
            _ => {
                unpacked.attachments.insert(name, data);
            }
        }
    }

    Ok(unpacked)
}

/// Parse metadata records; single values stay scalars, extra values make a list.
///
/// Null bytes are stripped first: some server versions emit them inside
/// metadata values.
fn parse_metadata(data: &[u8]) -> Result<Map<String, Value>, DecodeError> {
    let text = String::from_utf8_lossy(data).replace('\0', "");
    let mut metadata = Map::new();

    for mut record in parse_csv(&text)? {
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        if record.len() < 2 {
            return Err(DecodeError::MalformedMetadata(format!(
                "record without a value: {:?}",
                record
            )));
        }

        let key = record.remove(0);
        let value = if record.len() == 1 {
            Value::String(record.remove(0))
        } else {
            Value::Array(record.into_iter().map(Value::String).collect())
        };
        metadata.insert(key, value);
    }

    Ok(metadata)
}

/// Minimal RFC 4180 reader: quoted fields, doubled quotes, CRLF or LF.
fn parse_csv(text: &str) -> Result<Vec<Vec<String>>, DecodeError> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                c => field.push(c),
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            c => field.push(c),
        }
    }

    if in_quotes {
        return Err(DecodeError::MalformedMetadata(
            "unterminated quoted field".to_string(),
        ));
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    Ok(records)
}
