//! Claude provider implementation
//!
//! A single streaming client for Anthropic Claude models, reachable through
//! the Anthropic API or Google Cloud Vertex AI.

pub mod client;
pub mod mapper;
pub mod sse;
pub mod types;

pub use client::{ClaudeClient, ClaudeEndpoint, ClaudeModel, DEFAULT_ANTHROPIC_BASE_URL};
