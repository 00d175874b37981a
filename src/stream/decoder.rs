//! Incremental event stream decoder
//!
//! Frames an append-only text stream into events: `event:` names the pending
//! event, `data:` lines accumulate its payload, a blank line flushes it. Input
//! may be cut anywhere; an unfinished line is kept until the next fragment.
//! The decoder does no I/O and never stops by itself.

use serde::Deserialize;
use tracing::warn;

const DEFAULT_EVENT: &str = "message";

/// One decoded event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuredEvent {
    Chunk { data: String },
    Error { message: String },
    Done,
    Other { data: String, message: String },
}

impl StructuredEvent {
    /// Whether the reader should stop after this event
    pub fn is_terminal(&self) -> bool {
        matches!(self, StructuredEvent::Error { .. } | StructuredEvent::Done)
    }

    fn from_parts(name: &str, payload: EventPayload) -> Self {
        let data = payload.data.unwrap_or_default();
        let message = payload.message.unwrap_or_default();
        match name {
            "chunk" => StructuredEvent::Chunk { data },
            "error" => StructuredEvent::Error { message },
            "done" => StructuredEvent::Done,
            _ => StructuredEvent::Other { data, message },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct EventPayload {
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Events decoded from one fragment
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Feed {
    pub events: Vec<StructuredEvent>,
    /// True if any of `events` is terminal
    pub stop: bool,
}

impl Feed {
    fn new(events: Vec<StructuredEvent>) -> Self {
        let stop = events.iter().any(StructuredEvent::is_terminal);
        Self { events, stop }
    }
}

/// Decoder state for exactly one stream
#[derive(Debug, Default)]
pub struct StreamEventDecoder {
    line_buffer: String,
    event_name: Option<String>,
    data_lines: Vec<String>,
}

impl StreamEventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a fragment and return every event it completes
    pub fn feed(&mut self, fragment: &str) -> Feed {
        self.line_buffer.push_str(fragment);

        let Some(last_newline) = self.line_buffer.rfind('\n') else {
            return Feed::default();
        };
        let rest = self.line_buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.line_buffer, rest);

        let mut events = Vec::new();
        for line in complete.split_terminator('\n') {
            self.process_line(line, &mut events);
        }
        Feed::new(events)
    }

    /// Flush whatever the stream left unterminated. End of stream counts as a blank line.
    pub fn finalize(mut self) -> Vec<StructuredEvent> {
        let mut events = Vec::new();
        let tail = std::mem::take(&mut self.line_buffer);
        if !tail.is_empty() {
            self.process_line(&tail, &mut events);
        }
        self.flush(&mut events);
        events
    }

    fn process_line(&mut self, line: &str, events: &mut Vec<StructuredEvent>) {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if line.is_empty() {
            self.flush(events);
        } else if let Some(name) = line.strip_prefix("event:") {
            self.event_name = Some(strip_one_space(name).to_string());
        } else if let Some(data) = line.strip_prefix("data:") {
            self.data_lines.push(strip_one_space(data).to_string());
        }
    }

    fn flush(&mut self, events: &mut Vec<StructuredEvent>) {
        if self.data_lines.is_empty() {
            return;
        }
        let raw = std::mem::take(&mut self.data_lines).join("\n");
        let name = self
            .event_name
            .take()
            .unwrap_or_else(|| DEFAULT_EVENT.to_string());

        if raw.is_empty() {
            return;
        }

        match serde_json::from_str::<EventPayload>(&raw) {
            Ok(payload) => events.push(StructuredEvent::from_parts(&name, payload)),
            Err(e) => warn!("Dropping malformed '{}' event: {} (data: {})", name, e, raw),
        }
    }
}

fn strip_one_space(value: &str) -> &str {
    value.strip_prefix(' ').unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(fragments: &[&str]) -> Vec<StructuredEvent> {
        let mut decoder = StreamEventDecoder::new();
        let mut events = Vec::new();
        for fragment in fragments {
            events.extend(decoder.feed(fragment).events);
        }
        events.extend(decoder.finalize());
        events
    }

    #[test]
    fn test_single_block() {
        let mut decoder = StreamEventDecoder::new();
        let feed = decoder.feed("event: chunk\ndata: {\"data\":\"ab\"}\n\n");
        assert_eq!(
            feed.events,
            vec![StructuredEvent::Chunk { data: "ab".into() }]
        );
        assert!(!feed.stop);
    }

    #[test]
    fn test_byte_by_byte_matches_whole() {
        let stream = "event: chunk\ndata: {\"data\":\"你好\"}\n\nevent: other\ndata: {\"message\":\"m\"}\n\nevent: done\ndata: {}\n\n";
        let whole = decode_all(&[stream]);

        let pieces: Vec<String> = stream.chars().map(|c| c.to_string()).collect();
        let pieces: Vec<&str> = pieces.iter().map(String::as_str).collect();
        assert_eq!(decode_all(&pieces), whole);

        assert_eq!(
            whole,
            vec![
                StructuredEvent::Chunk { data: "你好".into() },
                StructuredEvent::Other {
                    data: String::new(),
                    message: "m".into()
                },
                StructuredEvent::Done,
            ]
        );
    }

    #[test]
    fn test_multiple_blocks_in_one_fragment() {
        let mut decoder = StreamEventDecoder::new();
        let feed = decoder.feed(
            "event: chunk\ndata: {\"data\":\"a\"}\n\nevent: error\ndata: {\"message\":\"boom\"}\n\nevent: chunk\ndata: {\"data\":\"b\"}\n\n",
        );
        assert_eq!(feed.events.len(), 3);
        assert_eq!(
            feed.events[1],
            StructuredEvent::Error {
                message: "boom".into()
            }
        );
        assert!(feed.stop);
    }

    #[test]
    fn test_finalize_flushes_unterminated_block() {
        let mut decoder = StreamEventDecoder::new();
        assert!(decoder.feed("event: done\ndata: {}\n").events.is_empty());
        assert_eq!(decoder.finalize(), vec![StructuredEvent::Done]);
    }

    #[test]
    fn test_finalize_processes_partial_last_line() {
        let mut decoder = StreamEventDecoder::new();
        decoder.feed("event: chunk\ndata: {\"data\":\"tail\"}");
        assert_eq!(
            decoder.finalize(),
            vec![StructuredEvent::Chunk {
                data: "tail".into()
            }]
        );
    }

    #[test]
    fn test_blank_line_without_data_is_noop() {
        let mut decoder = StreamEventDecoder::new();
        let feed = decoder.feed("\n\nevent: chunk\n\n: comment\n\n");
        assert!(feed.events.is_empty());
        // The name of a block without data does not leak into the next one
        let feed = decoder.feed("data: {\"data\":\"x\"}\n\n");
        assert_eq!(
            feed.events,
            vec![StructuredEvent::Other {
                data: "x".into(),
                message: String::new()
            }]
        );
    }

    #[test]
    fn test_malformed_payload_is_dropped() {
        let events = decode_all(&[
            "event: chunk\ndata: {not json\n\n",
            "event: chunk\ndata: {\"data\":\"ok\"}\n\n",
        ]);
        assert_eq!(events, vec![StructuredEvent::Chunk { data: "ok".into() }]);
    }

    #[test]
    fn test_multiline_data_is_joined() {
        let events = decode_all(&["event: chunk\ndata: {\"data\":\ndata: \"x\"}\n\n"]);
        assert_eq!(events, vec![StructuredEvent::Chunk { data: "x".into() }]);
    }

    #[test]
    fn test_only_one_leading_space_is_stripped() {
        let events = decode_all(&["event:chunk\ndata:  {\"data\":\"y\"}\n\n"]);
        assert_eq!(events, vec![StructuredEvent::Chunk { data: "y".into() }]);

        // "event:  chunk" names the event " chunk", which is not a chunk
        let events = decode_all(&["event:  chunk\ndata: {\"data\":\"y\"}\n\n"]);
        assert_eq!(
            events,
            vec![StructuredEvent::Other {
                data: "y".into(),
                message: String::new()
            }]
        );
    }

    #[test]
    fn test_crlf_lines() {
        let events = decode_all(&["event: done\r\ndata: {}\r\n\r\n"]);
        assert_eq!(events, vec![StructuredEvent::Done]);
    }
}
