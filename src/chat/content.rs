//! Message content normalization
//!
//! Everything that reaches storage or the provider is a list of typed
//! [`ContentBlock`]s. Older rows may hold provider-shaped blocks without a
//! `type` discriminator; those are re-tagged on read.

use serde_json::Value;

use crate::llm::ContentBlock;

use super::attachments::{file_icon, ProcessedFile};

const MAX_DOCUMENT_NAME_LEN: usize = 100;
const FILE_TEXT_PREFIX: &str = "[File: ";

/// Coerce stored or incoming content into typed blocks
///
/// A bare string becomes one text block, a list keeps its order, and
/// blocks that cannot be recognized are dropped.
pub fn normalize_content(value: Value) -> Vec<ContentBlock> {
    match value {
        Value::String(text) => vec![ContentBlock::Text { text }],
        Value::Array(items) => items.into_iter().filter_map(normalize_block).collect(),
        Value::Object(_) => normalize_block(value).into_iter().collect(),
        _ => Vec::new(),
    }
}

fn normalize_block(value: Value) -> Option<ContentBlock> {
    if let Value::String(text) = value {
        return Some(ContentBlock::Text { text });
    }
    let obj = value.as_object()?;

    match obj.get("type").and_then(Value::as_str) {
        Some("text") => Some(ContentBlock::text(obj.get("text")?.as_str()?)),
        Some("image") => {
            if let Ok(block) = serde_json::from_value::<ContentBlock>(value.clone()) {
                return Some(block);
            }
            // Messages API shape: {"type":"image","source":{"media_type":...,"data":...}}
            let (media_type, data) = base64_source(obj.get("source")?)?;
            Some(ContentBlock::Image {
                format: image_format(media_type).to_string(),
                data: data.to_string(),
            })
        }
        Some("document") => {
            if let Ok(block) = serde_json::from_value::<ContentBlock>(value.clone()) {
                return Some(block);
            }
            let (_, data) = base64_source(obj.get("source")?)?;
            let name = obj
                .get("title")
                .or_else(|| obj.get("name"))
                .and_then(Value::as_str)
                .unwrap_or("document");
            Some(ContentBlock::Document {
                format: "pdf".to_string(),
                name: sanitize_document_name(name),
                data: data.to_string(),
            })
        }
        Some(_) => None,
        None => normalize_legacy_block(obj),
    }
}

/// Blocks written without a discriminator: `{"text"}`, `{"image"}`, `{"document"}`
fn normalize_legacy_block(obj: &serde_json::Map<String, Value>) -> Option<ContentBlock> {
    if let Some(text) = obj.get("text").and_then(Value::as_str) {
        return Some(ContentBlock::text(text));
    }
    if let Some(image) = obj.get("image").and_then(Value::as_object) {
        let format = image.get("format").and_then(Value::as_str).unwrap_or("png");
        let data = legacy_bytes(image.get("source")?)?;
        return Some(ContentBlock::Image {
            format: image_format(&format!("image/{}", format)).to_string(),
            data,
        });
    }
    if let Some(document) = obj.get("document").and_then(Value::as_object) {
        let name = document
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("document");
        let data = legacy_bytes(document.get("source")?)?;
        return Some(ContentBlock::Document {
            format: "pdf".to_string(),
            name: sanitize_document_name(name),
            data,
        });
    }
    None
}

fn base64_source(source: &Value) -> Option<(&str, &str)> {
    let media_type = source.get("media_type")?.as_str()?;
    let data = source.get("data")?.as_str()?;
    Some((media_type, data))
}

fn legacy_bytes(source: &Value) -> Option<String> {
    source.get("bytes")?.as_str().map(str::to_string)
}

/// Short image format for a MIME type; unknown types fall back to png
pub fn image_format(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpeg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "png",
    }
}

/// Spaces become underscores; at most 100 characters
pub fn sanitize_document_name(name: &str) -> String {
    name.replace(' ', "_")
        .chars()
        .take(MAX_DOCUMENT_NAME_LEN)
        .collect()
}

/// Build the user turn: attachments first in upload order, then the text
pub fn build_user_message(text: &str, files: &[ProcessedFile]) -> Vec<ContentBlock> {
    let mut content = Vec::with_capacity(files.len() + 1);

    for file in files {
        if file.mime_type.starts_with("image/") {
            content.push(ContentBlock::Image {
                format: image_format(&file.mime_type).to_string(),
                data: file.data.clone(),
            });
        } else if file.mime_type == "application/pdf" {
            content.push(ContentBlock::Document {
                format: "pdf".to_string(),
                name: sanitize_document_name(&file.name),
                data: file.data.clone(),
            });
        } else if let Some(extracted) = file.extracted_text.as_deref().filter(|t| !t.is_empty()) {
            content.push(ContentBlock::text(format!(
                "{}{}]\n{}",
                FILE_TEXT_PREFIX, file.name, extracted
            )));
        }
    }

    if !text.is_empty() {
        content.push(ContentBlock::text(text));
    }

    content
}

/// Text blocks joined by newlines
pub fn display_text(blocks: &[ContentBlock]) -> String {
    blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// What the user typed, leaving out inlined file contents
///
/// Falls back to [`display_text`] when the message holds nothing else.
pub fn prompt_text(blocks: &[ContentBlock]) -> String {
    let typed: Vec<&str> = blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } if !text.starts_with(FILE_TEXT_PREFIX) => {
                Some(text.as_str())
            }
            _ => None,
        })
        .collect();

    if typed.is_empty() {
        display_text(blocks)
    } else {
        typed.join("\n")
    }
}

/// Icon-prefixed labels for the attachments carried by a message
pub fn attachment_labels(blocks: &[ContentBlock]) -> Vec<String> {
    blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Image { format, .. } => Some(format!(
                "{} image.{}",
                file_icon(&format!("image/{}", format)),
                format
            )),
            ContentBlock::Document { name, .. } => {
                Some(format!("{} {}", file_icon("application/pdf"), name))
            }
            ContentBlock::Text { text } => text
                .strip_prefix(FILE_TEXT_PREFIX)
                .and_then(|rest| rest.split_once("]\n"))
                .map(|(name, _)| format!("{} {}", file_icon("text/plain"), name)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn processed(name: &str, mime_type: &str, extracted: Option<&str>) -> ProcessedFile {
        ProcessedFile {
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            data: "AAAA".to_string(),
            extracted_text: extracted.map(str::to_string),
        }
    }

    #[test]
    fn test_bare_string_becomes_text_block() {
        assert_eq!(
            normalize_content(json!("hello")),
            vec![ContentBlock::text("hello")]
        );
    }

    #[test]
    fn test_typed_blocks_are_kept_in_order() {
        let value = json!([
            {"type": "image", "format": "gif", "data": "R0lG"},
            {"type": "text", "text": "what is this"}
        ]);
        assert_eq!(
            normalize_content(value),
            vec![
                ContentBlock::Image {
                    format: "gif".to_string(),
                    data: "R0lG".to_string()
                },
                ContentBlock::text("what is this"),
            ]
        );
    }

    #[test]
    fn test_legacy_untyped_blocks_are_retagged() {
        let value = json!([
            {"image": {"format": "jpg", "source": {"bytes": "/9j/"}}},
            {"document": {"format": "pdf", "name": "q3 report.pdf", "source": {"bytes": "JVBE"}}},
            {"text": "summarize"}
        ]);
        assert_eq!(
            normalize_content(value),
            vec![
                ContentBlock::Image {
                    format: "jpeg".to_string(),
                    data: "/9j/".to_string()
                },
                ContentBlock::Document {
                    format: "pdf".to_string(),
                    name: "q3_report.pdf".to_string(),
                    data: "JVBE".to_string()
                },
                ContentBlock::text("summarize"),
            ]
        );
    }

    #[test]
    fn test_messages_api_shaped_blocks() {
        let value = json!([
            {"type": "image", "source": {"type": "base64", "media_type": "image/webp", "data": "UklG"}},
            {"type": "document", "title": "a.pdf", "source": {"type": "base64", "media_type": "application/pdf", "data": "JVBE"}}
        ]);
        let blocks = normalize_content(value);
        assert_eq!(
            blocks[0],
            ContentBlock::Image {
                format: "webp".to_string(),
                data: "UklG".to_string()
            }
        );
        assert!(matches!(&blocks[1], ContentBlock::Document { name, .. } if name == "a.pdf"));
    }

    #[test]
    fn test_unrecognized_blocks_are_dropped() {
        let value = json!([
            {"type": "tool_use", "id": "x"},
            {"video": {}},
            42,
            {"text": "kept"}
        ]);
        assert_eq!(normalize_content(value), vec![ContentBlock::text("kept")]);
        assert!(normalize_content(json!(null)).is_empty());
    }

    #[test]
    fn test_build_user_message_orders_files_before_text() {
        let files = vec![
            processed("notes.txt", "text/plain", Some("line one")),
            processed("photo.jpg", "image/jpg", None),
            processed("my report.pdf", "application/pdf", None),
        ];

        let blocks = build_user_message("Compare", &files);

        assert_eq!(blocks.len(), 4);
        assert_eq!(blocks[0], ContentBlock::text("[File: notes.txt]\nline one"));
        assert!(matches!(&blocks[1], ContentBlock::Image { format, .. } if format == "jpeg"));
        assert!(matches!(&blocks[2], ContentBlock::Document { name, .. } if name == "my_report.pdf"));
        assert_eq!(blocks[3], ContentBlock::text("Compare"));
    }

    #[test]
    fn test_build_user_message_skips_empty_parts() {
        let files = vec![processed("empty.md", "text/markdown", Some(""))];
        assert!(build_user_message("", &files).is_empty());

        let files = vec![processed("binary.doc", "application/msword", None)];
        assert_eq!(build_user_message("hi", &files), vec![ContentBlock::text("hi")]);
    }

    #[test]
    fn test_document_name_truncated() {
        let long = format!("{}.pdf", "a b".repeat(60));
        let name = sanitize_document_name(&long);
        assert_eq!(name.chars().count(), 100);
        assert!(!name.contains(' '));
    }

    #[test]
    fn test_display_and_prompt_text() {
        let blocks = vec![
            ContentBlock::text("[File: data.csv]\na,b"),
            ContentBlock::Image {
                format: "png".to_string(),
                data: "x".to_string(),
            },
            ContentBlock::text("What trends?"),
        ];

        assert_eq!(display_text(&blocks), "[File: data.csv]\na,b\nWhat trends?");
        assert_eq!(prompt_text(&blocks), "What trends?");
        assert_eq!(
            prompt_text(&blocks[..1]),
            "[File: data.csv]\na,b"
        );
    }

    #[test]
    fn test_attachment_labels() {
        let blocks = vec![
            ContentBlock::text("[File: data.csv]\na,b"),
            ContentBlock::Image {
                format: "png".to_string(),
                data: "x".to_string(),
            },
            ContentBlock::Document {
                format: "pdf".to_string(),
                name: "report.pdf".to_string(),
                data: "x".to_string(),
            },
            ContentBlock::text("plain"),
        ];

        assert_eq!(
            attachment_labels(&blocks),
            vec!["📄 data.csv", "🖼️ image.png", "📕 report.pdf"]
        );
    }
}
