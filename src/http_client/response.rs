//! HTTP response wrappers.

use std::borrow::Cow;

/// Response body, either decoded text or untouched bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    Text(String),
    Raw(Vec<u8>),
}

/// Uniform result of a dispatched request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEnvelope {
    pub status: u16,
    pub body: ResponseBody,
}

impl ResponseEnvelope {
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: ResponseBody::Text(body.into()),
        }
    }

    pub fn raw(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            body: ResponseBody::Raw(body),
        }
    }

    /// Check if the response is successful (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_raw(&self) -> bool {
        matches!(self.body, ResponseBody::Raw(_))
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    /// Body as text; raw bodies are decoded as UTF-8 with replacement.
    pub fn as_text(&self) -> Cow<'_, str> {
        match &self.body {
            ResponseBody::Text(text) => Cow::Borrowed(text),
            ResponseBody::Raw(bytes) => String::from_utf8_lossy(bytes),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match &self.body {
            ResponseBody::Text(text) => text.as_bytes(),
            ResponseBody::Raw(bytes) => bytes,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self.body {
            ResponseBody::Text(text) => text.into_bytes(),
            ResponseBody::Raw(bytes) => bytes,
        }
    }
}

/// Build a Content-Disposition value carrying the original filename.
///
/// Names that need no percent-encoding use `filename=`; anything else uses
/// the RFC 5987 `filename*=UTF-8''` form.
pub fn content_disposition(filename: &str) -> String {
    let encoded = urlencoding::encode(filename);
    if encoded == filename {
        format!("attachment; filename={}", filename)
    } else {
        format!("attachment; filename*=UTF-8''{}", encoded)
    }
}
