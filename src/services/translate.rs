//! Translation (`/translate/all/{translator}/[{src}/]{dest}`).

use std::fmt;
use std::str::FromStr;

use super::{with_document, TextResult, ACCEPT_TEXT};
use crate::client::TikaClient;
use crate::config::RequestOptions;
use crate::error::TikaError;
use crate::http_client::{RequestBody, RequestSpec};

/// Source and destination languages: `src:dest`, or just `dest` to let the
/// server detect the source language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslateSpec {
    pub src: Option<String>,
    pub dest: String,
}

impl TranslateSpec {
    pub fn new(src: Option<&str>, dest: &str) -> Self {
        Self {
            src: src.map(String::from),
            dest: dest.to_string(),
        }
    }

    pub fn path(&self, translator: &str) -> String {
        match self.src {
            Some(ref src) => format!("/translate/all/{}/{}/{}", translator, src, self.dest),
            None => format!("/translate/all/{}/{}", translator, self.dest),
        }
    }
}

impl FromStr for TranslateSpec {
    type Err = TikaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || {
            TikaError::Config(format!(
                "translate spec must be src:dest or dest; got {:?}",
                s
            ))
        };
        let valid = |lang: &str| !lang.is_empty() && lang.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

        match s.split_once(':') {
            Some((src, dest)) if valid(src) && valid(dest) => Ok(Self::new(Some(src), dest)),
            Some(_) => Err(bad()),
            None if valid(s) => Ok(Self::new(None, s)),
            None => Err(bad()),
        }
    }
}

impl fmt::Display for TranslateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.src {
            Some(ref src) => write!(f, "{}:{}", src, self.dest),
            None => write!(f, "{}", self.dest),
        }
    }
}

/// Translation façade using the session's configured translator.
pub struct Translator<'a> {
    client: &'a TikaClient,
}

impl<'a> Translator<'a> {
    pub fn new(client: &'a TikaClient) -> Self {
        Self { client }
    }

    pub fn from_file(
        &self,
        locator: &str,
        spec: &TranslateSpec,
        options: RequestOptions,
    ) -> Result<TextResult, TikaError> {
        let request = RequestSpec::put(spec.path(&self.client.config().translator))
            .accept(ACCEPT_TEXT)
            .options(options);
        let request = with_document(self.client, request, locator)?;
        Ok(self.client.call(request)?.into())
    }

    pub fn from_buffer(
        &self,
        body: impl Into<RequestBody>,
        spec: &TranslateSpec,
        options: RequestOptions,
    ) -> Result<TextResult, TikaError> {
        let request = RequestSpec::put(spec.path(&self.client.config().translator))
            .accept(ACCEPT_TEXT)
            .body(body)
            .options(options);
        Ok(self.client.call(request)?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSLATOR: &str = "org.apache.tika.language.translate.Lingo24Translator";

    #[test]
    fn test_source_and_destination() {
        let spec: TranslateSpec = "en:fr".parse().unwrap();
        assert_eq!(spec, TranslateSpec::new(Some("en"), "fr"));
        assert_eq!(
            spec.path(TRANSLATOR),
            format!("/translate/all/{}/en/fr", TRANSLATOR)
        );
        assert_eq!(spec.to_string(), "en:fr");
    }

    #[test]
    fn test_destination_only() {
        let spec: TranslateSpec = "de".parse().unwrap();
        assert_eq!(spec.src, None);
        assert_eq!(spec.path(TRANSLATOR), format!("/translate/all/{}/de", TRANSLATOR));
    }

    #[test]
    fn test_bad_specs() {
        for bad in ["", ":", "en:", ":fr", "en:fr:de", "en/fr"] {
            assert!(
                matches!(bad.parse::<TranslateSpec>(), Err(TikaError::Config(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }
}
