//! Server-push event stream consumer.
//!
//! The access token travels in the `token` query parameter because the push
//! channel cannot carry an `Authorization` header. Each `data:` payload is
//! decoded as JSON and handed to an [`EventStreamHandler`]. A payload with
//! `"status": "completed"` ends the stream. Dropped streams are never
//! reopened.

use futures::{Stream, StreamExt};
use reqwest::{Client, Url};
use serde_json::Value;
use std::fmt::Display;
use std::sync::Arc;

use ioverse_core::{IoverseError, Result};

use crate::token_manager::TokenManager;
use crate::transport::join_url;

pub const COMPLETED_STATUS: &str = "completed";

/// Callbacks for one stream invocation.
pub trait EventStreamHandler: Send {
    /// Called for every decoded payload, including the terminal one.
    fn on_message(&mut self, payload: &Value);

    /// Called once after the terminal payload.
    fn on_complete(&mut self, _payload: &Value) {}

    /// Called once when the stream fails; the stream is closed afterwards.
    fn on_error(&mut self, _error: &IoverseError) {}
}

/// How a stream invocation ended.
#[derive(Debug, Clone)]
pub enum StreamOutcome {
    Completed(Value),
    Failed(IoverseError),
}

impl StreamOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, StreamOutcome::Completed(_))
    }
}

pub struct StreamingEventConsumer {
    tokens: Arc<TokenManager>,
    client: Client,
    base_url: String,
}

impl StreamingEventConsumer {
    /// Streams get their own client: push channels are long-lived and must
    /// not inherit the request timeout of the API transport.
    pub fn new(tokens: Arc<TokenManager>, base_url: impl Into<String>) -> Self {
        Self {
            tokens,
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Builds the stream URL with the token appended as a query parameter.
    ///
    /// `target` is either an absolute URL or a path under the base URL.
    pub fn stream_url(&self, target: &str, token: &str) -> Result<Url> {
        let raw = if target.starts_with("http://") || target.starts_with("https://") {
            target.to_string()
        } else {
            join_url(&self.base_url, target)
        };

        let mut url = Url::parse(&raw)
            .map_err(|e| IoverseError::config(format!("Invalid stream URL {}: {}", raw, e)))?;
        url.query_pairs_mut().append_pair("token", token);
        Ok(url)
    }

    /// Opens the stream and drives `handler` until completion or failure.
    ///
    /// Fails up front with `Authentication` when no access token is stored;
    /// the handler is not invoked in that case.
    pub async fn connect<H>(&self, target: &str, handler: &mut H) -> Result<StreamOutcome>
    where
        H: EventStreamHandler,
    {
        let Some(token) = self.tokens.access_token() else {
            tracing::error!("[EventStream] No access token available for {}", target);
            return Err(IoverseError::authentication(
                "No access token available for the event stream",
            ));
        };

        let url = self.stream_url(target, &token)?;
        tracing::debug!("[EventStream] Connecting to {}", target);

        let response = match self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                let error = IoverseError::stream(format!(
                    "Event stream rejected with status {}",
                    response.status().as_u16()
                ));
                return Ok(fail(handler, error));
            }
            Err(e) => {
                let error = IoverseError::stream(format!("Event stream connect failed: {}", e));
                return Ok(fail(handler, error));
            }
        };

        Ok(consume_event_stream(response.bytes_stream(), handler).await)
    }
}

fn fail<H: EventStreamHandler>(handler: &mut H, error: IoverseError) -> StreamOutcome {
    tracing::error!("[EventStream] {}", error);
    handler.on_error(&error);
    StreamOutcome::Failed(error)
}

/// Decodes a raw byte stream as server-sent events and dispatches payloads.
///
/// Stops reading at the terminal payload. A transport error, or the stream
/// ending before the terminal payload, is reported through `on_error`.
pub async fn consume_event_stream<S, B, E, H>(stream: S, handler: &mut H) -> StreamOutcome
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
    H: EventStreamHandler,
{
    let mut stream = std::pin::pin!(stream);
    let mut decoder = SseDecoder::default();

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => return fail(handler, IoverseError::stream(format!("Stream read error: {}", e))),
        };

        for data in decoder.push(chunk.as_ref()) {
            if let Some(payload) = dispatch(&data, handler) {
                return StreamOutcome::Completed(payload);
            }
        }
    }

    if let Some(data) = decoder.finish()
        && let Some(payload) = dispatch(&data, handler)
    {
        return StreamOutcome::Completed(payload);
    }

    fail(
        handler,
        IoverseError::stream("Event stream closed before completion"),
    )
}

/// Hands one event to the handler; returns the payload if it was terminal.
fn dispatch<H: EventStreamHandler>(data: &str, handler: &mut H) -> Option<Value> {
    let payload: Value = match serde_json::from_str(data) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!("[EventStream] Skipping undecodable payload: {}", e);
            return None;
        }
    };

    handler.on_message(&payload);

    if payload.get("status").and_then(Value::as_str) == Some(COMPLETED_STATUS) {
        tracing::debug!("[EventStream] Stream completed");
        handler.on_complete(&payload);
        return Some(payload);
    }
    None
}

/// Incremental `text/event-stream` decoder yielding the data of each event.
///
/// Bytes are buffered until a full line arrives, so a character split across
/// network chunks is decoded whole.
#[derive(Debug, Default)]
struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some(line_end) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=line_end).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if let Some(event) = self.take_event() {
                    events.push(event);
                }
            } else {
                self.push_field(line);
            }
        }
        events
    }

    /// Flushes an event left unterminated at end of stream.
    fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        let rest = String::from_utf8_lossy(&rest);
        self.push_field(rest.trim_end_matches('\r'));
        self.take_event()
    }

    fn push_field(&mut self, line: &str) {
        if let Some(value) = line.strip_prefix("data:") {
            self.data
                .push(value.strip_prefix(' ').unwrap_or(value).to_string());
        }
        // Comments, `event:`, `id:` and `retry:` fields are ignored.
    }

    fn take_event(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        let event = self.data.join("\n");
        self.data.clear();
        Some(event)
    }
}
