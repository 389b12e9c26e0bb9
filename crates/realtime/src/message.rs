//! Wire format of the streaming (`text/event-stream`) REST subscription.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::RealtimeError;

/// One `event:` / `data:` block as it arrived on the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub event: String,
    pub data: String,
}

/// Splits a byte stream into events. Chunks may end anywhere, including in
/// the middle of a multi-byte character.
#[derive(Debug, Default)]
pub struct EventStreamDecoder {
    buffer: Vec<u8>,
}

impl EventStreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk and return every event it completed
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<RawEvent> {
        self.buffer.extend(chunk.iter().copied().filter(|&b| b != b'\r'));

        let mut events = Vec::new();
        while let Some(end) = find_blank_line(&self.buffer) {
            let block: Vec<u8> = self.buffer.drain(..end + 2).collect();
            let text = String::from_utf8_lossy(&block[..end]);
            if let Some(event) = parse_block(&text) {
                events.push(event);
            }
        }
        events
    }
}

fn find_blank_line(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\n\n")
}

fn parse_block(block: &str) -> Option<RawEvent> {
    let mut event = None;
    let mut data: Vec<&str> = Vec::new();
    for line in block.lines() {
        if line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => event = Some(value.to_string()),
            "data" => data.push(value),
            _ => {}
        }
    }
    if event.is_none() && data.is_empty() {
        return None;
    }
    Some(RawEvent {
        event: event.unwrap_or_else(|| "message".to_string()),
        data: data.join("\n"),
    })
}

#[derive(Deserialize)]
struct PathData {
    path: String,
    data: Value,
}

/// A decoded server event
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// Replace the value at `path` (relative to the subscribed location)
    Put { path: String, data: Value },
    /// Overwrite the listed children of `path`
    Patch { path: String, data: Map<String, Value> },
    KeepAlive,
    /// The server stopped the stream, usually because rules deny the read
    Cancel(String),
    AuthRevoked,
    Unknown(String),
}

impl ServerEvent {
    pub fn parse(raw: &RawEvent) -> Result<Self, RealtimeError> {
        match raw.event.as_str() {
            "put" => {
                let body: PathData = serde_json::from_str(&raw.data)?;
                Ok(Self::Put {
                    path: body.path,
                    data: body.data,
                })
            }
            "patch" => {
                let body: PathData = serde_json::from_str(&raw.data)?;
                match body.data {
                    Value::Object(data) => Ok(Self::Patch {
                        path: body.path,
                        data,
                    }),
                    other => Err(RealtimeError::subscription(format!(
                        "patch event carried a non-object body: {}",
                        other
                    ))),
                }
            }
            "keep-alive" => Ok(Self::KeepAlive),
            "cancel" => Ok(Self::Cancel(raw.data.clone())),
            "auth_revoked" => Ok(Self::AuthRevoked),
            other => Ok(Self::Unknown(other.to_string())),
        }
    }
}
