//! Incremental decoding of `data: {json}` event streams.
//!
//! Upstream bodies arrive in arbitrary chunks. Lines are reassembled across
//! chunk boundaries before any payload is parsed, so a JSON object split
//! between two reads is never dropped.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Deserialize;

const DATA_PREFIX: &str = "data: ";

/// Splits a byte stream into complete lines.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Flush a trailing line that had no terminator.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buffer);
        let line = String::from_utf8_lossy(&rest).trim_end_matches('\r').to_string();
        Some(line)
    }
}

#[derive(Debug, Deserialize)]
struct EventPayload {
    #[serde(rename = "type")]
    kind: Option<String>,
    completion: Option<String>,
    stop_reason: Option<String>,
    delta: Option<EventDelta>,
}

#[derive(Debug, Deserialize)]
struct EventDelta {
    text: Option<String>,
}

/// What a single stream line contributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Text(String),
    /// Text (possibly empty) followed by the end of the stream
    Done(String),
    Ignored,
}

/// Interpret one line. Lines without the data marker and payloads that are
/// not valid JSON are ignored.
pub fn parse_line(line: &str) -> StreamEvent {
    let Some(data) = line.strip_prefix(DATA_PREFIX) else {
        return StreamEvent::Ignored;
    };
    let Ok(payload) = serde_json::from_str::<EventPayload>(data.trim()) else {
        return StreamEvent::Ignored;
    };

    let mut text = payload.completion.unwrap_or_default();
    if let Some(delta_text) = payload.delta.and_then(|d| d.text) {
        text.push_str(&delta_text);
    }

    let finished = payload.stop_reason.is_some_and(|r| !r.is_empty())
        || payload.kind.as_deref() == Some("message_stop");
    if finished {
        StreamEvent::Done(text)
    } else if text.is_empty() {
        StreamEvent::Ignored
    } else {
        StreamEvent::Text(text)
    }
}

/// Drain a byte stream and concatenate its completion text in arrival order.
///
/// Stops at the first terminal event, or when the stream ends.
pub async fn collect_completion<S, E>(mut stream: S) -> Result<String, E>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    let mut decoder = LineDecoder::new();
    let mut text = String::new();

    while let Some(chunk) = stream.next().await {
        for line in decoder.push(&chunk?) {
            if apply(parse_line(&line), &mut text) {
                return Ok(text);
            }
        }
    }
    if let Some(line) = decoder.finish() {
        apply(parse_line(&line), &mut text);
    }
    Ok(text)
}

/// Append an event's text; returns `true` when the stream is finished.
fn apply(event: StreamEvent, text: &mut String) -> bool {
    match event {
        StreamEvent::Text(t) => {
            text.push_str(&t);
            false
        }
        StreamEvent::Done(t) => {
            text.push_str(&t);
            true
        }
        StreamEvent::Ignored => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn chunks(parts: &[&str]) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Unpin {
        stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::from(p.to_string())))
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn test_decoder_reassembles_split_lines() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(b"data: {\"compl").is_empty());
        let lines = decoder.push(b"etion\":\"Hi\"}\r\ndata: x\n");
        assert_eq!(lines, vec!["data: {\"completion\":\"Hi\"}", "data: x"]);
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_parse_line_variants() {
        assert_eq!(
            parse_line(r#"data: {"completion":"Hel"}"#),
            StreamEvent::Text("Hel".to_string())
        );
        assert_eq!(
            parse_line(r#"data: {"completion":"","stop_reason":"stop_sequence"}"#),
            StreamEvent::Done(String::new())
        );
        assert_eq!(
            parse_line(r#"data: {"completion":"x","stop_reason":null}"#),
            StreamEvent::Text("x".to_string())
        );
        assert_eq!(
            parse_line(r#"data: {"type":"content_block_delta","delta":{"text":"yo"}}"#),
            StreamEvent::Text("yo".to_string())
        );
        assert_eq!(
            parse_line(r#"data: {"type":"message_stop"}"#),
            StreamEvent::Done(String::new())
        );
        assert_eq!(parse_line("event: completion"), StreamEvent::Ignored);
        assert_eq!(parse_line("data: {not json"), StreamEvent::Ignored);
        assert_eq!(parse_line(""), StreamEvent::Ignored);
    }

    #[tokio::test]
    async fn test_collect_across_chunk_boundaries() {
        let body = chunks(&[
            "event: completion\ndata: {\"completion\":\"Hel",
            "lo\"}\n\ndata: {\"completion\":\" world\"}\n",
            "data: {\"completion\":\"\",\"stop_reason\":\"stop_sequence\"}\n",
            "data: {\"completion\":\"ignored after stop\"}\n",
        ]);

        let text = collect_completion(body).await.unwrap();
        assert_eq!(text, "Hello world");
    }

    #[tokio::test]
    async fn test_collect_without_stop_marker_or_trailing_newline() {
        let body = chunks(&["data: {\"completion\":\"a\"}\n", "data: {\"completion\":\"b\"}"]);
        assert_eq!(collect_completion(body).await.unwrap(), "ab");
    }

    #[tokio::test]
    async fn test_collect_propagates_stream_error() {
        let body = stream::iter(vec![
            Ok(Bytes::from_static(b"data: {\"completion\":\"a\"}\n")),
            Err(std::io::Error::other("reset")),
        ]);
        assert!(collect_completion(body).await.is_err());
    }
}
