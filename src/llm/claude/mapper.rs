//! Mapping between abstraction types and Claude-specific types

use crate::llm::core::types::{
    ContentBlock, ContentBlockStart, ContentDelta, FinishReason, GenerateRequest, Message,
    MessageMetadata, MessageRole, StreamEvent, UsageMetadata,
};

use super::types::{
    ClaudeContent, ClaudeContentBlock, ClaudeContentBlockStart, ClaudeContentDelta,
    ClaudeMessage, ClaudeRequest, ClaudeSource, ClaudeStreamEvent,
};

/// Convert our abstraction request to Claude's request format
///
/// The endpoint-specific `model` and `anthropic_version` fields are left
/// empty; the client fills them in for its transport.
pub fn to_claude_request(request: GenerateRequest) -> ClaudeRequest {
    ClaudeRequest {
        anthropic_version: None,
        model: None,
        max_tokens: request.config.max_tokens,
        messages: request
            .messages
            .into_iter()
            .map(to_claude_message)
            .collect(),
        system: request.system,
        temperature: request.config.temperature,
        top_p: request.config.top_p,
        stop_sequences: request.config.stop_sequences,
        stream: true,
    }
}

/// Convert our Message to Claude's ClaudeMessage
fn to_claude_message(message: Message) -> ClaudeMessage {
    let role = message.role.as_str().to_string();

    // If there's only one text block, use simple text content
    if message.content.len() == 1 {
        if let ContentBlock::Text { text } = &message.content[0] {
            return ClaudeMessage {
                role,
                content: ClaudeContent::Text(text.clone()),
            };
        }
    }

    let blocks = message
        .content
        .into_iter()
        .map(to_claude_content_block)
        .collect();

    ClaudeMessage {
        role,
        content: ClaudeContent::Blocks(blocks),
    }
}

/// Convert our ContentBlock to Claude's ClaudeContentBlock
fn to_claude_content_block(block: ContentBlock) -> ClaudeContentBlock {
    let media_type = block.media_type();
    match block {
        ContentBlock::Text { text } => ClaudeContentBlock::Text { text },
        ContentBlock::Image { data, .. } => ClaudeContentBlock::Image {
            source: ClaudeSource::base64(media_type.unwrap_or_default(), data),
        },
        ContentBlock::Document { name, data, .. } => ClaudeContentBlock::Document {
            source: ClaudeSource::base64(media_type.unwrap_or_default(), data),
            title: Some(name),
        },
    }
}

fn to_finish_reason(stop_reason: &str) -> FinishReason {
    match stop_reason {
        "end_turn" => FinishReason::EndTurn,
        "max_tokens" => FinishReason::MaxTokens,
        "stop_sequence" => FinishReason::StopSequence,
        "refusal" => FinishReason::Refusal,
        other => FinishReason::Other(other.to_string()),
    }
}

/// Convert Claude's stream event to our abstraction's StreamEvent
///
/// Returns a vector because some Claude events map to nothing (pings,
/// message_stop, deltas of block kinds this layer does not surface).
pub fn from_claude_event(
    event: ClaudeStreamEvent,
    accumulated_usage: &mut UsageMetadata,
) -> Vec<StreamEvent> {
    match event {
        ClaudeStreamEvent::MessageStart { message } => {
            *accumulated_usage =
                UsageMetadata::new(message.usage.input_tokens, message.usage.output_tokens);

            vec![StreamEvent::MessageStart {
                message: MessageMetadata {
                    id: message.id,
                    role: MessageRole::Assistant,
                    usage: Some(*accumulated_usage),
                },
            }]
        }
        ClaudeStreamEvent::ContentBlockStart {
            index,
            content_block,
        } => {
            let block = match content_block {
                ClaudeContentBlockStart::Text { text } => ContentBlockStart::Text { text },
                ClaudeContentBlockStart::Other => ContentBlockStart::Other,
            };

            vec![StreamEvent::ContentBlockStart { index, block }]
        }
        ClaudeStreamEvent::ContentBlockDelta { index, delta } => match delta {
            ClaudeContentDelta::TextDelta { text } => vec![StreamEvent::ContentDelta {
                index,
                delta: ContentDelta::TextDelta { text },
            }],
            ClaudeContentDelta::Other => vec![],
        },
        ClaudeStreamEvent::ContentBlockStop { index } => {
            vec![StreamEvent::ContentBlockEnd { index }]
        }
        ClaudeStreamEvent::MessageDelta { delta, usage } => {
            // message_delta carries cumulative output tokens
            if let Some(usage) = usage {
                if usage.input_tokens > 0 {
                    accumulated_usage.input_tokens = usage.input_tokens;
                }
                accumulated_usage.output_tokens = usage.output_tokens;
                accumulated_usage.total_tokens =
                    accumulated_usage.input_tokens + accumulated_usage.output_tokens;
            }

            match delta.stop_reason {
                Some(stop_reason) => vec![StreamEvent::MessageEnd {
                    finish_reason: to_finish_reason(&stop_reason),
                    usage: *accumulated_usage,
                }],
                None => vec![StreamEvent::MessageDelta {
                    usage: Some(*accumulated_usage),
                }],
            }
        }
        ClaudeStreamEvent::MessageStop | ClaudeStreamEvent::Ping => vec![],
        ClaudeStreamEvent::Error { error } => {
            vec![StreamEvent::Error {
                error: format!("{}: {}", error.error_type, error.message),
            }]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::types::{ClaudeMessageData, ClaudeMessageDeltaData, ClaudeUsage};
    use crate::llm::core::config::GenerationConfig;

    #[test]
    fn test_to_claude_request_basic() {
        let request = GenerateRequest {
            messages: vec![Message::user("Hello")],
            config: GenerationConfig::new(1024).with_temperature(0.7).with_top_p(0.9),
            system: Some("You are helpful".to_string()),
        };

        let claude_request = to_claude_request(request);

        assert_eq!(claude_request.anthropic_version, None);
        assert_eq!(claude_request.model, None);
        assert_eq!(claude_request.max_tokens, 1024);
        assert_eq!(claude_request.temperature, Some(0.7));
        assert_eq!(claude_request.top_p, Some(0.9));
        assert_eq!(claude_request.system, Some("You are helpful".to_string()));
        assert!(claude_request.stream);
        assert_eq!(claude_request.messages.len(), 1);
    }

    #[test]
    fn test_to_claude_message_simple_text() {
        let claude_message = to_claude_message(Message::user("Hello"));

        assert_eq!(claude_message.role, "user");
        match claude_message.content {
            ClaudeContent::Text(text) => assert_eq!(text, "Hello"),
            _ => panic!("Expected simple text content"),
        }
    }

    #[test]
    fn test_to_claude_message_with_attachments() {
        let message = Message {
            role: MessageRole::User,
            content: vec![
                ContentBlock::Image {
                    format: "jpeg".to_string(),
                    data: "/9j/4AAQ".to_string(),
                },
                ContentBlock::Document {
                    format: "pdf".to_string(),
                    name: "annual_report.pdf".to_string(),
                    data: "JVBERi0=".to_string(),
                },
                ContentBlock::text("Compare these"),
            ],
        };

        let claude_message = to_claude_message(message);
        let blocks = match claude_message.content {
            ClaudeContent::Blocks(blocks) => blocks,
            _ => panic!("Expected blocks content"),
        };

        assert_eq!(blocks.len(), 3);
        match &blocks[0] {
            ClaudeContentBlock::Image { source } => {
                assert_eq!(source.media_type, "image/jpeg");
                assert_eq!(source.source_type, "base64");
                assert_eq!(source.data, "/9j/4AAQ");
            }
            _ => panic!("Expected image block"),
        }
        match &blocks[1] {
            ClaudeContentBlock::Document { source, title } => {
                assert_eq!(source.media_type, "application/pdf");
                assert_eq!(title.as_deref(), Some("annual_report.pdf"));
            }
            _ => panic!("Expected document block"),
        }
        match &blocks[2] {
            ClaudeContentBlock::Text { text } => assert_eq!(text, "Compare these"),
            _ => panic!("Expected text block"),
        }
    }

    #[test]
    fn test_from_claude_event_message_start() {
        let event = ClaudeStreamEvent::MessageStart {
            message: ClaudeMessageData {
                id: "msg_123".to_string(),
                role: "assistant".to_string(),
                model: "claude-sonnet-4-5".to_string(),
                stop_reason: None,
                usage: ClaudeUsage {
                    input_tokens: 10,
                    output_tokens: 1,
                },
            },
        };

        let mut accumulated_usage = UsageMetadata::default();
        let events = from_claude_event(event, &mut accumulated_usage);

        assert_eq!(events.len(), 1);
        match &events[0] {
            StreamEvent::MessageStart { message } => {
                assert_eq!(message.id, "msg_123");
                assert_eq!(message.role, MessageRole::Assistant);
                assert_eq!(message.usage.unwrap().input_tokens, 10);
            }
            _ => panic!("Expected MessageStart event"),
        }
        assert_eq!(accumulated_usage, UsageMetadata::new(10, 1));
    }

    #[test]
    fn test_from_claude_event_content_delta_text() {
        let event = ClaudeStreamEvent::ContentBlockDelta {
            index: 0,
            delta: ClaudeContentDelta::TextDelta {
                text: "Hello".to_string(),
            },
        };

        let mut usage = UsageMetadata::default();
        let events = from_claude_event(event, &mut usage);

        assert_eq!(events.len(), 1);
        match &events[0] {
            StreamEvent::ContentDelta {
                index,
                delta: ContentDelta::TextDelta { text },
            } => {
                assert_eq!(*index, 0);
                assert_eq!(text, "Hello");
            }
            _ => panic!("Expected ContentDelta event"),
        }
    }

    #[test]
    fn test_from_claude_event_skips_unsurfaced_deltas() {
        let event = ClaudeStreamEvent::ContentBlockDelta {
            index: 0,
            delta: ClaudeContentDelta::Other,
        };
        let mut usage = UsageMetadata::default();
        assert!(from_claude_event(event, &mut usage).is_empty());
        assert!(from_claude_event(ClaudeStreamEvent::Ping, &mut usage).is_empty());
        assert!(from_claude_event(ClaudeStreamEvent::MessageStop, &mut usage).is_empty());
    }

    #[test]
    fn test_from_claude_event_message_delta_with_stop_reason() {
        let event = ClaudeStreamEvent::MessageDelta {
            delta: ClaudeMessageDeltaData {
                stop_reason: Some("end_turn".to_string()),
                stop_sequence: None,
            },
            usage: Some(ClaudeUsage {
                input_tokens: 0,
                output_tokens: 25,
            }),
        };

        let mut accumulated_usage = UsageMetadata::new(10, 0);
        let events = from_claude_event(event, &mut accumulated_usage);

        assert_eq!(events.len(), 1);
        match &events[0] {
            StreamEvent::MessageEnd {
                finish_reason,
                usage,
            } => {
                assert_eq!(*finish_reason, FinishReason::EndTurn);
                assert_eq!(usage.input_tokens, 10);
                assert_eq!(usage.output_tokens, 25);
                assert_eq!(usage.total_tokens, 35);
            }
            _ => panic!("Expected MessageEnd event"),
        }
    }

    #[test]
    fn test_finish_reason_mapping() {
        let cases = vec![
            ("end_turn", FinishReason::EndTurn),
            ("max_tokens", FinishReason::MaxTokens),
            ("stop_sequence", FinishReason::StopSequence),
            ("refusal", FinishReason::Refusal),
            ("pause_turn", FinishReason::Other("pause_turn".to_string())),
        ];

        for (claude_reason, expected) in cases {
            assert_eq!(to_finish_reason(claude_reason), expected);
        }
    }

    #[test]
    fn test_from_claude_error_event() {
        use super::super::types::ClaudeErrorData;

        let event = ClaudeStreamEvent::Error {
            error: ClaudeErrorData {
                error_type: "overloaded_error".to_string(),
                message: "Overloaded".to_string(),
            },
        };
        let mut usage = UsageMetadata::default();
        match &from_claude_event(event, &mut usage)[0] {
            StreamEvent::Error { error } => assert_eq!(error, "overloaded_error: Overloaded"),
            _ => panic!("Expected Error event"),
        }
    }
}
