//! Server-Sent Events (SSE) parser for Claude responses

use bytes::Bytes;
use futures::stream::Stream;
use futures::StreamExt;
use std::pin::Pin;

use crate::llm::core::error::LlmError;

use super::types::ClaudeStreamEvent;

/// Raw response body as delivered by reqwest
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// Parse a stream of bytes as Claude SSE events
///
/// Both the Anthropic API and Vertex AI frame events as:
/// ```text
/// event: content_block_delta
/// data: {"type":"content_block_delta",...}
///
/// ```
///
/// Bytes are buffered until a blank line closes an event, so JSON payloads
/// and multi-byte characters split across network chunks are reassembled
/// before decoding.
pub fn parse_sse_stream(
    byte_stream: ByteStream,
) -> Pin<Box<dyn Stream<Item = Result<ClaudeStreamEvent, LlmError>> + Send>> {
    let mut buffer: Vec<u8> = Vec::new();

    let event_stream = byte_stream.flat_map(move |chunk_result| {
        let chunk = match chunk_result {
            Ok(bytes) => bytes,
            Err(e) => {
                return futures::stream::iter(vec![Err(LlmError::StreamError(e.to_string()))]);
            }
        };

        buffer.extend(chunk.iter().filter(|b| **b != b'\r'));

        let mut events = Vec::new();
        while let Some(event_end) = find_boundary(&buffer) {
            let raw: Vec<u8> = buffer.drain(..event_end + 2).collect();
            match std::str::from_utf8(&raw[..event_end]) {
                Ok(event_text) => {
                    if let Some(parsed_event) = parse_event(event_text) {
                        events.push(parsed_event);
                    }
                }
                Err(e) => events.push(Err(LlmError::StreamError(format!(
                    "Invalid UTF-8 in stream: {}",
                    e
                )))),
            }
        }

        futures::stream::iter(events)
    });

    Box::pin(event_stream)
}

fn find_boundary(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\n\n")
}

/// Parse a single SSE event from its text representation
fn parse_event(event_text: &str) -> Option<Result<ClaudeStreamEvent, LlmError>> {
    let mut event_type: Option<&str> = None;
    let mut data = String::new();

    for line in event_text.lines() {
        if let Some(type_val) = line.strip_prefix("event:") {
            event_type = Some(type_val.trim());
        } else if let Some(data_val) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(data_val.trim());
        }
    }

    // Comments and keep-alives carry no data
    if data.is_empty() {
        return None;
    }

    match serde_json::from_str::<ClaudeStreamEvent>(&data) {
        Ok(event) => Some(Ok(event)),
        Err(e) => Some(Err(LlmError::SerializationError(format!(
            "Failed to parse Claude SSE event (type: {:?}): {}. Data: {}",
            event_type, e, data
        )))),
    }
}
