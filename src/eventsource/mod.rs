//! Line-oriented server-sent-event framing for the assistant's `/ask` stream.
//!
//! The assistant emits one JSON object per `data: ` line. Network chunks do
//! not respect line (or even UTF-8 character) boundaries, so bytes are
//! decoded incrementally and a line is only handed to the JSON decoder once
//! its terminating newline has arrived.

use async_stream::try_stream;
use futures::{Stream, StreamExt};
use log::{debug, warn};
use reqwest::Response;
use serde::Deserialize;
use std::pin::Pin;

use crate::core::ClientError;

const DATA_PREFIX: &str = "data: ";
const LINE_DELIMITER: char = '\n';

pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, ClientError>> + Send>>;

/// One decoded frame of the assistant stream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    /// Classification of the answer that follows (e.g. `RAG`, `fallback`).
    Mode {
        #[serde(default)]
        value: String,
    },
    /// Next piece of generated text.
    Token {
        #[serde(default)]
        value: String,
    },
    /// End of the answer, carrying the authoritative full text.
    Done {
        #[serde(default)]
        full_response: String,
    },
    /// Any `type` this client does not know about.
    #[serde(other)]
    Unknown,
}

impl StreamEvent {
    /// Decodes a single line. Returns `None` for lines that carry no event:
    /// blank lines, lines without the `data: ` prefix, and empty payloads.
    pub fn parse_line(line: &str) -> Option<Result<Self, serde_json::Error>> {
        let payload = line.strip_prefix(DATA_PREFIX)?.trim();
        if payload.is_empty() {
            return None;
        }
        Some(serde_json::from_str(payload))
    }
}

/// Streaming UTF-8 decoder. Bytes of a character split across chunks are
/// held back until the rest arrives; invalid sequences decode to U+FFFD.
#[derive(Debug, Default)]
struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    fn decode(&mut self, chunk: &[u8], out: &mut String) {
        self.pending.extend_from_slice(chunk);

        let mut start = 0;
        while start < self.pending.len() {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(text) => {
                    out.push_str(text);
                    start = self.pending.len();
                }
                Err(err) => {
                    let valid_end = start + err.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[start..valid_end]));
                    match err.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + len;
                        }
                        // Incomplete sequence at the end: wait for more bytes.
                        None => {
                            start = valid_end;
                            break;
                        }
                    }
                }
            }
        }

        self.pending.drain(..start);
    }
}

/// Splits decoded text into complete lines, keeping the unterminated tail.
#[derive(Debug, Default)]
pub struct LineFramer {
    decoder: Utf8Decoder,
    buffer: String,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one network chunk and returns every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.decoder.decode(chunk, &mut self.buffer);

        let Some(last_delimiter) = self.buffer.rfind(LINE_DELIMITER) else {
            return Vec::new();
        };

        let tail = self.buffer.split_off(last_delimiter + 1);
        let complete = std::mem::replace(&mut self.buffer, tail);
        complete[..last_delimiter]
            .split(LINE_DELIMITER)
            .map(str::to_string)
            .collect()
    }

    /// Text received after the last newline.
    pub fn remainder(&self) -> &str {
        &self.buffer
    }
}

/// Turns a stream of raw body chunks into decoded stream events.
///
/// Malformed frames are logged and skipped; transport errors end the stream
/// with an `Err` item. A final line without a trailing newline is discarded.
pub fn events<S, B, E>(chunks: S) -> EventStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<ClientError> + Send + 'static,
{
    Box::pin(try_stream! {
        let mut chunks = Box::pin(chunks);
        let mut framer = LineFramer::new();

        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(Into::<ClientError>::into)?;
            for line in framer.push(chunk.as_ref()) {
                match StreamEvent::parse_line(&line) {
                    Some(Ok(event)) => yield event,
                    Some(Err(e)) => warn!("Skipping malformed stream frame {line:?}: {e}"),
                    None => {}
                }
            }
        }

        if !framer.remainder().trim().is_empty() {
            debug!(
                "Discarding unterminated frame at end of stream: {:?}",
                framer.remainder()
            );
        }
    })
}

/// Extension trait for reading a response body as assistant stream events.
pub trait EventSourceExt {
    fn stream_events(self) -> EventStream;
}

impl EventSourceExt for Response {
    /// A body that breaks off after the status line surfaces as
    /// [`ClientError::StreamError`].
    fn stream_events(self) -> EventStream {
        events(
            self.bytes_stream()
                .map(|chunk| chunk.map_err(|e| ClientError::StreamError(e.to_string()))),
        )
    }
}
