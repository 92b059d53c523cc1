//! Shared helpers for HTTP-level tests.
#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;
use tracing_subscriber::fmt::MakeWriter;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use cirrus_client::{RestClient, Settings};

/// Replays a fixed sequence of responses, repeating the last one once the
/// sequence is exhausted.
pub struct SequenceResponder {
    responses: Vec<ResponseTemplate>,
    counter: AtomicUsize,
}

impl SequenceResponder {
    pub fn new(responses: Vec<ResponseTemplate>) -> Self {
        assert!(!responses.is_empty());
        Self {
            responses,
            counter: AtomicUsize::new(0),
        }
    }
}

impl Respond for SequenceResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let index = self
            .counter
            .fetch_add(1, Ordering::SeqCst)
            .min(self.responses.len() - 1);
        self.responses[index].clone()
    }
}

/// Settings pointed at a mock server.
pub fn settings_for(server: &MockServer) -> Settings {
    Settings {
        url: server.uri(),
        ..Settings::default()
    }
}

/// Build an authenticated client against the mock server, with the token
/// cache redirected into `dir`. Mounts the `/api/auth` exchange.
pub async fn authenticated_client(server: &MockServer, dir: &tempfile::TempDir) -> RestClient {
    Mock::given(method("GET"))
        .and(path("/api/auth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"auth_token": "tok-test"})))
        .mount(server)
        .await;

    let mut client = RestClient::new(&settings_for(server))
        .unwrap()
        .with_token_cache(dir.path().join("token"));
    client.ensure_token().await.unwrap();
    client
}

/// In-memory sink for log lines emitted during a test.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn occurrences(&self, needle: &str) -> usize {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes).matches(needle).count()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Route warnings emitted on this thread into a buffer for assertions.
/// The subscriber stays installed while the guard lives.
pub fn capture_warnings() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_writer(buffer.clone())
        .with_ansi(false)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (buffer, guard)
}

/// Count requests the server received for the given path.
pub async fn requests_to(server: &MockServer, wanted: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == wanted)
        .count()
}
