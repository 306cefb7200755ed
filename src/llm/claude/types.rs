//! Claude-specific request and response types
//!
//! These types map directly to the Anthropic Messages API schema, which
//! Vertex AI's `streamRawPredict` endpoint accepts as well.

use serde::{Deserialize, Serialize};

/// Streaming Messages API request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudeRequest {
    /// API version, required in the body by Vertex AI only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anthropic_version: Option<String>,
    /// Model identifier, required in the body by the Anthropic API only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Maximum number of tokens to generate (required)
    pub max_tokens: u32,
    /// Array of messages in the conversation
    pub messages: Vec<ClaudeMessage>,
    /// System prompt (top-level field)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Temperature (0.0-1.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Top-p nucleus sampling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Stop sequences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
    /// Always true for streaming
    pub stream: bool,
}

/// A single message in the Claude conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudeMessage {
    /// Role: "user" or "assistant"
    pub role: String,
    /// Content (can be string or array of content blocks)
    pub content: ClaudeContent,
}

/// Content can be either a simple string or an array of content blocks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClaudeContent {
    /// Simple text content
    Text(String),
    /// Array of content blocks
    Blocks(Vec<ClaudeContentBlock>),
}

/// A content block within a Claude message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClaudeContentBlock {
    /// Text content
    Text { text: String },
    /// Image content
    Image { source: ClaudeSource },
    /// Document content (PDF)
    Document {
        source: ClaudeSource,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
}

/// Inline binary source of an image or document block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudeSource {
    /// Always "base64"
    #[serde(rename = "type")]
    pub source_type: String,
    pub media_type: String,
    pub data: String,
}

impl ClaudeSource {
    pub fn base64(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            source_type: "base64".to_string(),
            media_type: media_type.into(),
            data: data.into(),
        }
    }
}

/// SSE event types from Claude streaming API
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClaudeStreamEvent {
    /// Message streaming started
    MessageStart {
        message: ClaudeMessageData,
    },
    /// Content block started
    ContentBlockStart {
        index: usize,
        content_block: ClaudeContentBlockStart,
    },
    /// Content block delta (incremental update)
    ContentBlockDelta {
        index: usize,
        delta: ClaudeContentDelta,
    },
    /// Content block stopped
    ContentBlockStop {
        index: usize,
    },
    /// Message delta (metadata update)
    MessageDelta {
        delta: ClaudeMessageDeltaData,
        usage: Option<ClaudeUsage>,
    },
    /// Message streaming stopped
    MessageStop,
    /// Ping event (keep-alive)
    Ping,
    /// Error event
    Error {
        error: ClaudeErrorData,
    },
}

/// Message data from message_start event
#[derive(Debug, Clone, Deserialize)]
pub struct ClaudeMessageData {
    /// Message ID
    pub id: String,
    /// Message role (always "assistant" for responses)
    pub role: String,
    /// Model identifier
    #[serde(default)]
    pub model: String,
    /// Stop reason (null during streaming)
    pub stop_reason: Option<String>,
    /// Initial usage metadata
    pub usage: ClaudeUsage,
}

/// Content block start data
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClaudeContentBlockStart {
    /// Text block starting
    Text {
        text: String,
    },
    /// Thinking, tool use and any block kind added later
    #[serde(other)]
    Other,
}

/// Content delta (incremental update)
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClaudeContentDelta {
    /// Text delta
    TextDelta {
        text: String,
    },
    /// Thinking, signature, citation and JSON deltas
    #[serde(other)]
    Other,
}

/// Message delta data
#[derive(Debug, Clone, Deserialize)]
pub struct ClaudeMessageDeltaData {
    /// Stop reason (set when message completes)
    pub stop_reason: Option<String>,
    /// Stop sequence that triggered stop (if any)
    #[serde(default)]
    pub stop_sequence: Option<String>,
}

/// Usage metadata
#[derive(Debug, Clone, Deserialize)]
pub struct ClaudeUsage {
    /// Input tokens consumed (absent from some message_delta updates)
    #[serde(default)]
    pub input_tokens: u32,
    /// Output tokens generated
    #[serde(default)]
    pub output_tokens: u32,
}

/// Error data
#[derive(Debug, Clone, Deserialize)]
pub struct ClaudeErrorData {
    /// Error type
    #[serde(rename = "type")]
    pub error_type: String,
    /// Error message
    pub message: String,
}
