//! LLM Abstraction Layer
//!
//! A provider-neutral request/stream interface plus the Claude transport,
//! reachable either through the Anthropic API or Google Cloud Vertex AI.

pub mod auth;
pub mod claude;
pub mod core;

// Re-export commonly used types
pub use core::{
    config::GenerationConfig,
    error::LlmError,
    provider::{create_provider, EventStream, LlmProvider},
    types::{
        ContentBlock, ContentDelta, FinishReason, GenerateRequest, Message, MessageRole,
        StreamEvent, UsageMetadata,
    },
};

pub use claude::{ClaudeClient, ClaudeEndpoint, ClaudeModel};
