// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Incremental Server-Sent Events decoder.
//!
//! The panel publishes state changes on `/events` as
//!
//! ```text
//! id: 81234
//! event: state
//! data: {"channel":3,"state":true}
//!
//! ```
//!
//! Chunks from the network may split lines (or UTF-8 sequences) anywhere, so
//! the decoder buffers raw bytes and only interprets complete lines.

use crate::error::ParseError;

use super::PushEvent;

/// Event name used by the panel for channel state changes.
const STATE_EVENT: &str = "state";

/// Event name assumed when a message carries no `event:` field.
const DEFAULT_EVENT: &str = "message";

/// One dispatched SSE message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseMessage {
    /// Event name (`"message"` if unspecified).
    pub event: String,
    /// Data lines joined with `\n`.
    pub data: String,
    /// Last event id, if any.
    pub id: Option<String>,
}

impl SseMessage {
    /// Interprets the message as a channel state change.
    ///
    /// Returns `None` for events other than `state`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Json`] if a `state` event carries a malformed
    /// payload.
    pub fn to_push_event(&self) -> Option<Result<PushEvent, ParseError>> {
        if self.event != STATE_EVENT {
            return None;
        }
        Some(serde_json::from_str(&self.data).map_err(ParseError::from))
    }
}

/// Stateful decoder turning byte chunks into [`SseMessage`]s.
///
/// # Examples
///
/// ```
/// use relay_panel::protocol::SseDecoder;
///
/// let mut decoder = SseDecoder::new();
/// assert!(decoder.feed(b"event: state\ndata: {\"chan").is_empty());
///
/// let messages = decoder.feed(b"nel\":1,\"state\":false}\n\n");
/// assert_eq!(messages.len(), 1);
/// assert_eq!(messages[0].event, "state");
/// assert_eq!(messages[0].data, r#"{"channel":1,"state":false}"#);
/// ```
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
    last_id: Option<String>,
}

impl SseDecoder {
    /// Creates an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id of the most recent message that carried one.
    #[must_use]
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_id.as_deref()
    }

    /// Feeds a chunk and returns every message completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseMessage> {
        self.buffer.extend_from_slice(chunk);

        let mut messages = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=newline).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(message) = self.process_line(&line) {
                messages.push(message);
            }
        }
        messages
    }

    fn process_line(&mut self, line: &str) -> Option<SseMessage> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            "id" => self.last_id = Some(value.to_string()),
            other => tracing::trace!(field = other, "Ignoring SSE field"),
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseMessage> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseMessage {
            event: event.unwrap_or_else(|| DEFAULT_EVENT.to_string()),
            data,
            id: self.last_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChannelId, PowerState};

    #[test]
    fn decodes_state_event() {
        let mut decoder = SseDecoder::new();
        let messages = decoder.feed(b"id: 12\nevent: state\ndata: {\"channel\":3,\"state\":true}\n\n");

        assert_eq!(messages.len(), 1);
        let event = messages[0].to_push_event().unwrap().unwrap();
        assert_eq!(event.channel, ChannelId::new(3));
        assert_eq!(event.state, PowerState::On);
        assert_eq!(decoder.last_event_id(), Some("12"));
    }

    #[test]
    fn handles_crlf_line_endings() {
        let mut decoder = SseDecoder::new();
        let messages = decoder.feed(b"event: state\r\ndata: {\"channel\":1,\"state\":false}\r\n\r\n");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].data, r#"{"channel":1,"state":false}"#);
    }

    #[test]
    fn joins_multiline_data() {
        let mut decoder = SseDecoder::new();
        let messages = decoder.feed(b"data: first\ndata: second\n\n");
        assert_eq!(messages[0].data, "first\nsecond");
        assert_eq!(messages[0].event, "message");
    }

    #[test]
    fn skips_comments_and_empty_dispatches() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b": keep-alive\n\n").is_empty());
        assert!(decoder.feed(b"event: state\n\n").is_empty());
    }

    #[test]
    fn event_name_does_not_leak_into_next_message() {
        let mut decoder = SseDecoder::new();
        decoder.feed(b"event: state\n\n");
        let messages = decoder.feed(b"data: hello\n\n");
        assert_eq!(messages[0].event, "message");
    }

    #[test]
    fn chunk_split_inside_utf8_sequence() {
        let mut decoder = SseDecoder::new();
        let payload = "data: caf\u{e9}\n\n".as_bytes();
        let split = payload.len() - 3;
        assert!(decoder.feed(&payload[..split]).is_empty());
        let messages = decoder.feed(&payload[split..]);
        assert_eq!(messages[0].data, "caf\u{e9}");
    }

    #[test]
    fn non_state_events_are_not_push_events() {
        let message = SseMessage {
            event: "status".to_string(),
            data: "{}".to_string(),
            id: None,
        };
        assert!(message.to_push_event().is_none());
    }

    #[test]
    fn malformed_state_payload_is_an_error() {
        let message = SseMessage {
            event: "state".to_string(),
            data: "{not json".to_string(),
            id: None,
        };
        assert!(matches!(message.to_push_event(), Some(Err(ParseError::Json(_)))));
    }
}
