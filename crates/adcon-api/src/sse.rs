//! Server-Sent-Events computer stream.
//!
//! The console backend pushes the directory-joined computer inventory over a
//! long-lived `text/event-stream` response: an optional `total` announcement,
//! one `computer` message per device, then a terminal `done` or `error`.
//!
//! This module owns the wire level only -- incremental SSE framing and
//! tagged-message decoding. Session state (ordering, progress, terminal
//! transitions) lives in `adcon-core`.
//!
//! # Example
//!
//! ```rust,ignore
//! use adcon_api::sse::EventStream;
//!
//! let mut stream = EventStream::connect(&client, url).await?;
//! while let Some(msg) = stream.next_message().await {
//!     println!("{msg:?}");
//! }
//! // Dropping the stream closes the underlying connection.
//! ```

use std::collections::VecDeque;
use std::pin::Pin;

use futures_util::{Stream, StreamExt};
use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

use crate::error::Error;

// ── Wire messages ────────────────────────────────────────────────────

/// One directory-joined computer as delivered on the stream.
///
/// `password` is the retrieved local-administrator credential; absent until
/// the backend has resolved it. Wrapped in [`SecretString`] so it never
/// appears in Debug output or logs.
#[derive(Debug, Clone, Deserialize)]
pub struct ComputerPayload {
    pub name: String,
    pub enabled: bool,
    #[serde(default)]
    pub password: Option<SecretString>,
}

/// A decoded stream message, tagged by the `type` field of the JSON body.
///
/// `computer` and `item` are wire synonyms -- older backend builds emit the
/// latter.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamMessage {
    /// Expected total announced by the server. Zero means "unknown".
    Total { count: u64 },
    /// One device record.
    #[serde(alias = "item")]
    Computer { data: ComputerPayload },
    /// Terminal success.
    Done,
    /// Terminal failure with a server-provided message.
    Error { message: String },
}

/// Decode one event body into a [`StreamMessage`].
///
/// Malformed payloads are logged and dropped (`None`) -- transient payload
/// corruption must not abort an otherwise-healthy stream. Only explicit
/// `error` messages or transport failures terminate it.
pub fn decode_message(data: &str) -> Option<StreamMessage> {
    match serde_json::from_str(data) {
        Ok(msg) => Some(msg),
        Err(e) => {
            tracing::debug!(error = %e, "Dropping malformed stream message");
            None
        }
    }
}

// ── SSE framing ──────────────────────────────────────────────────────

/// One framed event: the `event` name (defaults to `message`) and the
/// joined `data` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
}

/// Incremental `text/event-stream` parser.
///
/// Byte chunks arrive with event boundaries anywhere, including inside a
/// UTF-8 sequence, so the parser buffers raw bytes and only splits on
/// newlines. Per the SSE grammar: `data:` lines accumulate and join with
/// `\n`, a blank line dispatches, comment lines (leading `:`) are ignored,
/// and a single leading space after the colon is stripped. CR and CRLF line
/// endings are both accepted.
#[derive(Debug, Default)]
pub struct SseParser {
    buf: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes, returning every event completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buf.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop(); // the '\n'
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line).into_owned();
            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }
        events
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            // Comment / keep-alive.
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_owned()),
            "data" => self.data.push(value.to_owned()),
            // `id` and `retry` carry no meaning for this protocol.
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take().unwrap_or_else(|| "message".to_owned());
        if self.data.is_empty() {
            return None;
        }
        let data = self.data.drain(..).collect::<Vec<_>>().join("\n");
        Some(SseEvent { event, data })
    }
}

// ── EventStream ──────────────────────────────────────────────────────

type BodyStream = Pin<Box<dyn Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send>>;

/// A connected computer stream.
///
/// Pull-based: [`next_message`](Self::next_message) yields decoded messages
/// in strict delivery order. Dropping the stream closes the HTTP connection
/// deterministically -- there is no background task to orphan, and chunks
/// the server already sent but the consumer never pulled are simply
/// discarded.
pub struct EventStream {
    body: BodyStream,
    parser: SseParser,
    pending: VecDeque<SseEvent>,
    closed: bool,
}

impl EventStream {
    /// Open the stream endpoint and validate the response.
    ///
    /// `client` must be built by
    /// [`TransportConfig::build_streaming_client`](crate::transport::TransportConfig::build_streaming_client)
    /// so the long-lived body is not subject to the REST request timeout.
    pub async fn connect(client: &reqwest::Client, url: Url) -> Result<Self, Error> {
        tracing::debug!(url = %url, "Connecting to computer stream");

        let resp = client
            .get(url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| Error::StreamConnect(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::SessionExpired);
        }
        if !status.is_success() {
            return Err(Error::StreamConnect(format!("HTTP {status}")));
        }

        tracing::debug!("Computer stream connected");

        Ok(Self {
            body: Box::pin(resp.bytes_stream()),
            parser: SseParser::new(),
            pending: VecDeque::new(),
            closed: false,
        })
    }

    /// Pull the next decoded message.
    ///
    /// Returns `None` once the server closes the connection -- whether that
    /// close is clean (after `done`) or premature is for the consumer's
    /// state machine to judge. A mid-transfer transport error yields one
    /// final `Err(Error::StreamLost)` before the stream ends.
    pub async fn next_message(&mut self) -> Option<Result<StreamMessage, Error>> {
        loop {
            while let Some(event) = self.pending.pop_front() {
                if let Some(msg) = decode_message(&event.data) {
                    return Some(Ok(msg));
                }
            }

            if self.closed {
                return None;
            }

            match self.body.next().await {
                Some(Ok(chunk)) => {
                    self.pending.extend(self.parser.feed(&chunk));
                }
                Some(Err(e)) => {
                    self.closed = true;
                    return Some(Err(Error::StreamLost(e.to_string())));
                }
                None => {
                    tracing::debug!("Computer stream ended");
                    self.closed = true;
                    return None;
                }
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
