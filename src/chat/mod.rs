//! Chat domain: content normalization, attachments, accounting and the
//! exchange orchestration that ties them to storage and the provider.

pub mod attachments;
pub mod content;
pub mod service;
pub mod usage;

pub use attachments::{AttachmentError, ProcessedFile, RejectedFile};
pub use service::{
    ChatError, ChatService, ChatSettings, ConversationView, DisplayMessage, ReplyEvent, Upload,
};
pub use usage::{TokenUsage, UsageSummary};
