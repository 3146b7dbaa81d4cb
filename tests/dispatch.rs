//! End-to-end façade calls against a fake server.

mod common;

use std::fs;
use std::io::{Cursor, Write};

use serde_json::json;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use common::{client_for, config_for, FakeTika};
use tika::{
    ConfigOption, DetectOption, LanguageOption, ParseService, RequestOptions, TikaClient,
    TranslateSpec, UnpackOption,
};

const RMETA: &str = r#"[
    {"X-TIKA:content": "Quarterly ", "Content-Type": "application/pdf", "X-Parsed-By": "PDFParser"},
    {"X-TIKA:content": "report", "Content-Type": "image/png"}
]"#;

#[test]
fn parse_file_sends_document_with_headers() {
    let fake = FakeTika::start(|_| (200, RMETA.as_bytes().to_vec()));
    let dir = TempDir::new().unwrap();
    let doc = dir.path().join("report.pdf");
    fs::write(&doc, b"%PDF-1.4 fake").unwrap();

    let client = client_for(&fake, &dir);
    let parsed = client
        .parser()
        .from_file(doc.to_str().unwrap(), ParseService::All, false, RequestOptions::new())
        .unwrap();

    assert_eq!(parsed.status, 200);
    assert_eq!(parsed.content.as_deref(), Some("Quarterly report"));
    let metadata = parsed.metadata.unwrap();
    assert_eq!(metadata["Content-Type"], json!(["application/pdf", "image/png"]));
    assert_eq!(metadata["X-Parsed-By"], json!("PDFParser"));

    let requests = fake.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.method, "PUT");
    assert_eq!(request.url, "/rmeta/text");
    assert_eq!(request.header("Accept"), Some("application/json"));
    assert_eq!(
        request.header("Content-Disposition"),
        Some("attachment; filename=report.pdf")
    );
    assert_eq!(request.body, b"%PDF-1.4 fake");
}

#[test]
fn parse_buffer_with_xml_content() {
    let fake = FakeTika::start(|_| (200, RMETA.as_bytes().to_vec()));
    let dir = TempDir::new().unwrap();

    let client = client_for(&fake, &dir);
    let parsed = client
        .parser()
        .from_buffer("plain words", true, RequestOptions::new())
        .unwrap();

    assert_eq!(parsed.status, 200);
    let requests = fake.requests();
    assert_eq!(requests[0].url, "/rmeta/xml");
    assert_eq!(requests[0].body, b"plain words");
    assert_eq!(requests[0].header("Content-Disposition"), None);
}

#[test]
fn non_success_status_is_returned_not_raised() {
    let fake = FakeTika::start(|_| (422, b"Unprocessable Entity".to_vec()));
    let dir = TempDir::new().unwrap();
    let client = client_for(&fake, &dir);

    let detected = client
        .detector()
        .from_buffer(b"\x00\x01".as_slice(), DetectOption::Type, RequestOptions::new())
        .unwrap();
    assert_eq!(detected.status, 422);
    assert_eq!(detected.text, "Unprocessable Entity");

    let parsed = client
        .parser()
        .from_buffer("x", false, RequestOptions::new())
        .unwrap();
    assert_eq!(parsed.status, 422);
    assert_eq!(parsed.content, None);
    assert_eq!(parsed.metadata, None);

    let (status, document) = client
        .server_config()
        .get(ConfigOption::Parsers, RequestOptions::new())
        .unwrap();
    assert_eq!(status, 422);
    assert!(document.is_none());
}

#[test]
fn language_buffer_uses_string_service() {
    let fake = FakeTika::start(|_| (200, b"fr".to_vec()));
    let dir = TempDir::new().unwrap();
    let client = client_for(&fake, &dir);

    let result = client
        .language()
        .from_buffer("Bonjour à tous", LanguageOption::String, RequestOptions::new())
        .unwrap();

    assert_eq!(result.text, "fr");
    let requests = fake.requests();
    assert_eq!(requests[0].url, "/language/string");
    assert_eq!(requests[0].header("Accept"), Some("text/plain"));
    assert_eq!(requests[0].body, "Bonjour à tous".as_bytes());
}

#[test]
fn language_option_selects_service_path() {
    let fake = FakeTika::start(|_| (200, b"de".to_vec()));
    let dir = TempDir::new().unwrap();
    let doc = dir.path().join("brief.txt");
    fs::write(&doc, "Guten Tag").unwrap();
    let client = client_for(&fake, &dir);

    client
        .language()
        .from_file(doc.to_str().unwrap(), LanguageOption::String, RequestOptions::new())
        .unwrap();
    client
        .language()
        .from_file(doc.to_str().unwrap(), LanguageOption::File, RequestOptions::new())
        .unwrap();
    client
        .language()
        .from_buffer("Guten Tag", LanguageOption::File, RequestOptions::new())
        .unwrap();

    let urls: Vec<_> = fake.requests().into_iter().map(|r| r.url).collect();
    assert_eq!(
        urls,
        vec!["/language/string", "/language/stream", "/language/stream"]
    );
}

#[test]
fn translate_uses_configured_translator() {
    let fake = FakeTika::start(|_| (200, b"Hallo".to_vec()));
    let dir = TempDir::new().unwrap();
    let mut config = config_for(&fake, &dir);
    config.translator = "org.apache.tika.language.translate.GoogleTranslator".to_string();
    let client = TikaClient::new(config).unwrap();

    let spec: TranslateSpec = "en:de".parse().unwrap();
    let result = client
        .translator()
        .from_buffer("Hello", &spec, RequestOptions::new())
        .unwrap();
    assert_eq!(result.text, "Hallo");

    let spec: TranslateSpec = "de".parse().unwrap();
    client
        .translator()
        .from_buffer("Hello", &spec, RequestOptions::new())
        .unwrap();

    let urls: Vec<_> = fake.requests().into_iter().map(|r| r.url).collect();
    assert_eq!(
        urls,
        vec![
            "/translate/all/org.apache.tika.language.translate.GoogleTranslator/en/de",
            "/translate/all/org.apache.tika.language.translate.GoogleTranslator/de",
        ]
    );
}

#[test]
fn unpack_decodes_archive_response() {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("__METADATA__", SimpleFileOptions::default())
        .unwrap();
    writer
        .write_all(b"Content-Type,application/pdf\nAuthor,Ann\0e\n")
        .unwrap();
    writer
        .start_file("__TEXT__", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(b"body text").unwrap();
    writer
        .start_file("embedded.png", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(&[0x89, b'P', b'N', b'G', 0x00, 0xff]).unwrap();
    let archive = writer.finish().unwrap().into_inner();

    let fake = FakeTika::start(move |_| (200, archive.clone()));
    let dir = TempDir::new().unwrap();
    let client = client_for(&fake, &dir);

    let unpacked = client
        .unpacker()
        .from_buffer(b"%PDF".to_vec(), UnpackOption::All, RequestOptions::new())
        .unwrap();

    assert_eq!(unpacked.content, "body text");
    assert_eq!(unpacked.metadata["Author"], json!("Anne"));
    assert_eq!(
        unpacked.attachments["embedded.png"],
        vec![0x89, b'P', b'N', b'G', 0x00, 0xff]
    );

    let requests = fake.requests();
    assert_eq!(requests[0].url, "/unpack/all");
    assert_eq!(requests[0].header("Accept"), Some("application/zip"));
}

#[test]
fn config_query_uses_get() {
    let fake = FakeTika::start(|_| (200, br#"{"name": "DefaultDetector"}"#.to_vec()));
    let dir = TempDir::new().unwrap();
    let client = client_for(&fake, &dir);

    let (status, document) = client
        .server_config()
        .get(ConfigOption::Detectors, RequestOptions::new())
        .unwrap();

    assert_eq!(status, 200);
    assert_eq!(document, Some(json!({"name": "DefaultDetector"})));
    let requests = fake.requests();
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].url, "/detectors");
}

#[test]
fn caller_headers_win_over_defaults() {
    let fake = FakeTika::start(|_| (200, b"ok".to_vec()));
    let dir = TempDir::new().unwrap();
    let client = client_for(&fake, &dir);

    let options = RequestOptions::new()
        .header("accept", "text/html")
        .header("X-Tika-OCRLanguage", "fra");
    client.detector().from_buffer("x", DetectOption::Type, options).unwrap();

    let requests = fake.requests();
    assert_eq!(requests[0].header("Accept"), Some("text/html"));
    assert_eq!(requests[0].header("X-Tika-OCRLanguage"), Some("fra"));
}

#[test]
fn remote_document_is_fetched_then_uploaded() {
    let fake = FakeTika::start(|request| match request.url.as_str() {
        "/files/notes.txt" => (200, b"remote notes".to_vec()),
        "/detect/stream" => (200, b"text/plain".to_vec()),
        _ => (404, Vec::new()),
    });
    let dir = TempDir::new().unwrap();
    let client = client_for(&fake, &dir);

    let result = client
        .detector()
        .from_file(&fake.url("/files/notes.txt"), DetectOption::Type, RequestOptions::new())
        .unwrap();
    assert_eq!(result.text, "text/plain");

    let requests = fake.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[1].url, "/detect/stream");
    assert_eq!(requests[1].body, b"remote notes");
    assert_eq!(
        requests[1].header("Content-Disposition"),
        Some("attachment; filename=notes.txt")
    );
}

#[test]
fn running_local_server_is_reused_without_launch() {
    let fake = FakeTika::start(|_| (200, b"application/pdf".to_vec()));
    let dir = TempDir::new().unwrap();
    let mut config = config_for(&fake, &dir);
    config.client_only = false;
    // Launching would fail on this artifact, so success proves reuse
    config.server_jar = dir.path().join("absent.jar").to_string_lossy().to_string();
    let client = TikaClient::new(config).unwrap();

    for _ in 0..2 {
        let result = client
            .detector()
            .from_buffer("x", DetectOption::Type, RequestOptions::new())
            .unwrap();
        assert_eq!(result.text, "application/pdf");
    }
    assert_eq!(client.server_pid(), None);
    assert_eq!(fake.count("/detect/stream"), 2);
}

#[test]
fn unreachable_local_server_without_artifact_is_fatal() {
    let dir = TempDir::new().unwrap();
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = tika::ClientConfig {
        endpoint: tika::Endpoint::new("http", "127.0.0.1", port),
        server_jar: dir.path().join("absent.jar").to_string_lossy().to_string(),
        cache_dir: dir.path().to_path_buf(),
        ..tika::ClientConfig::default()
    };
    let client = TikaClient::new(config).unwrap();

    let err = client
        .detector()
        .from_buffer("x", DetectOption::Type, RequestOptions::new())
        .unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(
        err,
        tika::TikaError::Provisioning(tika::ProvisioningError::ArtifactMissing(_))
    ));
}

#[test]
fn pdf_pages_split_xhtml_content() {
    let body = json!([{
        "Content-Type": "application/pdf",
        "X-TIKA:content": "<html><body><div class=\"page\"><p>One</p></div><div class=\"page\"><p>Two</p></div></body></html>"
    }])
    .to_string();
    let fake = FakeTika::start(move |_| (200, body.clone().into_bytes()));
    let dir = TempDir::new().unwrap();
    let doc = dir.path().join("slides.pdf");
    fs::write(&doc, b"%PDF-1.7").unwrap();
    let client = client_for(&fake, &dir);

    let pages = client
        .parser()
        .pdf_pages(doc.to_str().unwrap(), RequestOptions::new())
        .unwrap();

    assert_eq!(pages, vec!["One", "Two"]);
    assert_eq!(fake.requests()[0].url, "/rmeta/xml");
}
