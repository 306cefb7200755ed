use serde_json::json;
use std::convert::Infallible;
use uuid::Uuid;
use warp::sse::Event;

use crate::chat::{ReplyEvent, UsageSummary};

/// Create a conversation SSE event naming the conversation being answered
pub fn create_conversation_event(
    id: Uuid,
    title: String,
    attachments: Vec<String>,
) -> Result<Event, Infallible> {
    let payload = json!({
        "id": id,
        "title": title,
        "attachments": attachments
    });

    Ok(Event::default()
        .event("conversation")
        .data(payload.to_string()))
}

/// Create an attachment_rejected SSE event
pub fn create_attachment_rejected_event(
    filename: String,
    error: String,
) -> Result<Event, Infallible> {
    let payload = json!({
        "filename": filename,
        "error": error
    });

    Ok(Event::default()
        .event("attachment_rejected")
        .data(payload.to_string()))
}

/// Create a text SSE event carrying one chunk of the reply
pub fn create_text_event(text: String) -> Result<Event, Infallible> {
    let payload = json!({ "text": text });

    Ok(Event::default().event("text").data(payload.to_string()))
}

pub fn create_error_event(message: String) -> Result<Event, Infallible> {
    let payload = json!({ "message": message });

    Ok(Event::default().event("error").data(payload.to_string()))
}

pub fn create_usage_event(summary: UsageSummary) -> Result<Event, Infallible> {
    let payload = json!(summary);

    Ok(Event::default().event("usage").data(payload.to_string()))
}

/// Create a done SSE event to signal stream completion
pub fn create_done_event(
    message_id: Option<Uuid>,
    title: String,
    input_tokens: i64,
    output_tokens: i64,
) -> Result<Event, Infallible> {
    let payload = json!({
        "message_id": message_id,
        "title": title,
        "input_tokens": input_tokens,
        "output_tokens": output_tokens
    });

    Ok(Event::default().event("done").data(payload.to_string()))
}

pub fn create_reply_event(event: ReplyEvent) -> Result<Event, Infallible> {
    match event {
        ReplyEvent::Conversation {
            id,
            title,
            attachments,
        } => create_conversation_event(id, title, attachments),
        ReplyEvent::AttachmentRejected { filename, error } => {
            create_attachment_rejected_event(filename, error)
        }
        ReplyEvent::Text { text } => create_text_event(text),
        ReplyEvent::Error { message } => create_error_event(message),
        ReplyEvent::Usage { summary } => create_usage_event(summary),
        ReplyEvent::Done {
            message_id,
            title,
            input_tokens,
            output_tokens,
        } => create_done_event(message_id, title, input_tokens, output_tokens),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::TokenUsage;
    use crate::config::Pricing;

    #[test]
    fn test_create_text_event() {
        let result = create_text_event("Hello world".to_string());
        assert!(result.is_ok());
    }

    #[test]
    fn test_text_event_wire_format() {
        let event = create_text_event("Hi".to_string()).unwrap();
        let wire = event.to_string();
        assert!(wire.contains("event:text"));
        assert!(wire.contains(r#"data:{"text":"Hi"}"#));
    }

    #[test]
    fn test_done_event_wire_format() {
        let id = Uuid::new_v4();
        let event = create_done_event(Some(id), "Greeting".to_string(), 12, 34).unwrap();
        let wire = event.to_string();
        assert!(wire.contains("event:done"));
        assert!(wire.contains(&id.to_string()));
        assert!(wire.contains(r#""output_tokens":34"#));
    }

    #[test]
    fn test_reply_event_mapping() {
        let summary = UsageSummary::new(None, TokenUsage::new(10, 20), &Pricing::default());
        let events = vec![
            ReplyEvent::Conversation {
                id: Uuid::new_v4(),
                title: "New Chat".to_string(),
                attachments: vec!["📃 notes.txt".to_string()],
            },
            ReplyEvent::AttachmentRejected {
                filename: "a.exe".to_string(),
                error: "nope".to_string(),
            },
            ReplyEvent::Error {
                message: "Error: boom".to_string(),
            },
            ReplyEvent::Usage { summary },
        ];
        let names = ["conversation", "attachment_rejected", "error", "usage"];

        for (event, name) in events.into_iter().zip(names) {
            let wire = create_reply_event(event).unwrap().to_string();
            assert!(wire.contains(&format!("event:{}", name)), "{}", wire);
        }
    }
}
