//! One chat exchange and the conversation operations around it

use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

use crate::config::{AppConfig, Pricing, DEFAULT_TITLE};
use crate::db::{Conversation, ConversationUpdate, Database, DbError, User};
use crate::llm::{
    ContentBlock, ContentDelta, FinishReason, GenerateRequest, GenerationConfig, LlmProvider,
    MessageRole, StreamEvent, UsageMetadata,
};

use super::attachments::{display_label, process_file, ProcessedFile, RejectedFile};
use super::content::{attachment_labels, build_user_message, display_text, prompt_text};
use super::usage::{TokenUsage, UsageSummary};

const TITLE_MAX_CHARS: usize = 50;
const MAX_TITLE_LEN: usize = 200;

#[derive(Debug, Error)]
pub enum ChatError {
    /// Missing, or owned by another user
    #[error("Conversation not found")]
    ConversationNotFound,

    #[error("Nothing to send: enter a message or attach a supported file")]
    EmptyMessage,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Database(#[from] DbError),
}

/// Settings for the exchange, taken from the app configuration
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub system_prompt: String,
    pub max_tokens: u32,
    pub pricing: Pricing,
}

impl From<&AppConfig> for ChatSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            system_prompt: config.system_prompt.clone(),
            max_tokens: config.max_tokens,
            pricing: config.pricing,
        }
    }
}

/// A file received with a message
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Progress of one exchange, in the order the client receives them
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyEvent {
    /// The conversation the exchange belongs to (new or existing), with
    /// labels for the files that were accepted
    Conversation {
        id: Uuid,
        title: String,
        attachments: Vec<String>,
    },
    AttachmentRejected { filename: String, error: String },
    /// A chunk of assistant text
    Text { text: String },
    /// The provider failed; `message` is what was stored as the reply
    Error { message: String },
    Usage { summary: UsageSummary },
    Done {
        message_id: Option<Uuid>,
        title: String,
        input_tokens: i64,
        output_tokens: i64,
    },
}

/// A stored message prepared for the chat window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayMessage {
    pub id: Uuid,
    pub role: MessageRole,
    pub text: String,
    pub attachments: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub input_tokens: i64,
    pub output_tokens: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationView {
    pub conversation: Conversation,
    pub messages: Vec<DisplayMessage>,
}

/// Processed uploads of one send
#[derive(Debug, Default)]
pub struct ProcessedUploads {
    pub accepted: Vec<ProcessedFile>,
    pub rejected: Vec<RejectedFile>,
}

/// Validate and encode uploads; repeated file names are ignored after the first
pub fn process_uploads(uploads: Vec<Upload>) -> ProcessedUploads {
    let mut seen = HashSet::new();
    let mut processed = ProcessedUploads::default();

    for upload in uploads {
        if !seen.insert(upload.filename.clone()) {
            continue;
        }
        match process_file(&upload.filename, &upload.bytes) {
            Ok(file) => processed.accepted.push(file),
            Err(e) => {
                tracing::warn!(filename = %upload.filename, error = %e, "Rejected attachment");
                processed.rejected.push(RejectedFile {
                    filename: upload.filename,
                    error: e.to_string(),
                });
            }
        }
    }

    processed
}

/// First 50 characters, with an ellipsis when cut
pub fn title_from(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() > TITLE_MAX_CHARS {
        let head: String = text.chars().take(TITLE_MAX_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

#[derive(Clone)]
pub struct ChatService {
    db: Database,
    provider: Arc<dyn LlmProvider>,
    settings: ChatSettings,
}

impl ChatService {
    pub fn new(db: Database, provider: Arc<dyn LlmProvider>, settings: ChatSettings) -> Self {
        Self {
            db,
            provider,
            settings,
        }
    }

    async fn owned_conversation(&self, user: &User, id: Uuid) -> Result<Conversation, ChatError> {
        match self.db.conversations().get(id).await? {
            Some(conversation) if conversation.user_id == user.id => Ok(conversation),
            _ => Err(ChatError::ConversationNotFound),
        }
    }

    pub async fn new_conversation(&self, user: &User) -> Result<Conversation, ChatError> {
        let conversation = self.db.conversations().create(user.id, None).await?;
        tracing::info!(user_id = %user.id, conversation_id = %conversation.id, "Created conversation");
        Ok(conversation)
    }

    pub async fn list_conversations(
        &self,
        user: &User,
        saved_only: bool,
    ) -> Result<Vec<Conversation>, ChatError> {
        Ok(self.db.conversations().list_for_user(user.id, saved_only).await?)
    }

    pub async fn load_conversation(&self, user: &User, id: Uuid) -> Result<ConversationView, ChatError> {
        let conversation = self.owned_conversation(user, id).await?;
        let messages = self
            .db
            .messages()
            .list(id)
            .await?
            .into_iter()
            .map(|m| DisplayMessage {
                id: m.id,
                role: m.role,
                text: display_text(&m.content),
                attachments: attachment_labels(&m.content),
                created_at: m.created_at,
                input_tokens: m.input_tokens,
                output_tokens: m.output_tokens,
            })
            .collect();

        Ok(ConversationView {
            conversation,
            messages,
        })
    }

    pub async fn rename(&self, user: &User, id: Uuid, title: &str) -> Result<Conversation, ChatError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ChatError::Validation("Title cannot be empty".to_string()));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(ChatError::Validation(format!(
                "Title must be at most {} characters",
                MAX_TITLE_LEN
            )));
        }

        self.owned_conversation(user, id).await?;
        self.db
            .conversations()
            .update(id, &ConversationUpdate::title(title))
            .await?;
        self.owned_conversation(user, id).await
    }

    pub async fn set_saved(&self, user: &User, id: Uuid, is_saved: bool) -> Result<Conversation, ChatError> {
        self.owned_conversation(user, id).await?;
        self.db
            .conversations()
            .update(id, &ConversationUpdate::saved(is_saved))
            .await?;
        self.owned_conversation(user, id).await
    }

    pub async fn delete_conversation(&self, user: &User, id: Uuid) -> Result<(), ChatError> {
        self.owned_conversation(user, id).await?;
        self.db.conversations().delete(id).await?;
        tracing::info!(user_id = %user.id, conversation_id = %id, "Deleted conversation");
        Ok(())
    }

    /// Usage for one conversation (when given) plus the user's all-time totals
    pub async fn usage_summary(
        &self,
        user: &User,
        conversation_id: Option<Uuid>,
    ) -> Result<UsageSummary, ChatError> {
        let conversation = match conversation_id {
            Some(id) => {
                let c = self.owned_conversation(user, id).await?;
                Some(TokenUsage::new(c.input_tokens, c.output_tokens))
            }
            None => None,
        };

        let fresh = self
            .db
            .users()
            .get_by_id(user.id)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("user {}", user.id)))?;
        let all_time = TokenUsage::new(fresh.total_input_tokens, fresh.total_output_tokens);

        Ok(UsageSummary::new(conversation, all_time, &self.settings.pricing))
    }

    /// Run one exchange
    ///
    /// Everything up to and including storing the user's message happens
    /// before this returns, so those failures surface as errors. The reply
    /// is then streamed by a background task that finishes persisting even
    /// when the returned stream is dropped.
    pub async fn send_message(
        &self,
        user: &User,
        conversation_id: Option<Uuid>,
        text: &str,
        uploads: Vec<Upload>,
    ) -> Result<UnboundedReceiverStream<ReplyEvent>, ChatError> {
        let existing = match conversation_id {
            Some(id) => Some(self.owned_conversation(user, id).await?),
            None => None,
        };

        let uploads = process_uploads(uploads);
        let content = build_user_message(text.trim(), &uploads.accepted);
        if content.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        // Only create the conversation once there is something to put in it
        let conversation = match existing {
            Some(conversation) => conversation,
            None => self.new_conversation(user).await?,
        };

        self.db
            .messages()
            .add(conversation.id, MessageRole::User, &content, 0, 0)
            .await?;
        let history = self.db.messages().list_for_api(conversation.id).await?;

        tracing::info!(
            user_id = %user.id,
            conversation_id = %conversation.id,
            attachments = uploads.accepted.len(),
            rejected = uploads.rejected.len(),
            history_len = history.len(),
            "Sending message"
        );

        let (tx, rx) = mpsc::unbounded_channel();
        // Receiver is alive here, so these sends cannot fail
        let _ = tx.send(ReplyEvent::Conversation {
            id: conversation.id,
            title: conversation.title.clone(),
            attachments: uploads.accepted.iter().map(display_label).collect(),
        });
        for rejected in uploads.rejected {
            let _ = tx.send(ReplyEvent::AttachmentRejected {
                filename: rejected.filename,
                error: rejected.error,
            });
        }

        let request = GenerateRequest {
            messages: history,
            config: GenerationConfig::new(self.settings.max_tokens),
            system: Some(self.settings.system_prompt.clone()),
        };

        let exchange = Exchange {
            service: self.clone(),
            user: user.clone(),
            conversation,
            tx,
        };
        tokio::spawn(exchange.run(request));

        Ok(UnboundedReceiverStream::new(rx))
    }
}

/// State of one in-flight reply
struct Exchange {
    service: ChatService,
    user: User,
    conversation: Conversation,
    tx: mpsc::UnboundedSender<ReplyEvent>,
}

impl Exchange {
    async fn run(self, request: GenerateRequest) {
        let (reply, usage) = match self.stream_reply(request).await {
            Ok(result) => result,
            Err(error) => {
                tracing::error!(conversation_id = %self.conversation.id, %error, "Provider call failed");
                let message = format!("Error: {}", error);
                self.emit(ReplyEvent::Error {
                    message: message.clone(),
                });
                (message, UsageMetadata::default())
            }
        };

        match self.persist(reply, usage).await {
            Ok(done) => {
                if let Ok(summary) = self
                    .service
                    .usage_summary(&self.user, Some(self.conversation.id))
                    .await
                {
                    self.emit(ReplyEvent::Usage { summary });
                }
                self.emit(done);
            }
            Err(e) => {
                tracing::error!(conversation_id = %self.conversation.id, error = %e, "Failed to store reply");
                self.emit(ReplyEvent::Error {
                    message: format!("Error: {}", e),
                });
                self.emit(ReplyEvent::Done {
                    message_id: None,
                    title: self.conversation.title.clone(),
                    input_tokens: 0,
                    output_tokens: 0,
                });
            }
        }
    }

    /// Forward text chunks as they arrive; returns the full text and usage
    async fn stream_reply(&self, request: GenerateRequest) -> Result<(String, UsageMetadata), String> {
        let mut stream = self
            .service
            .provider
            .stream_generate(request)
            .await
            .map_err(|e| e.to_string())?;

        let mut reply = String::new();
        let mut usage = UsageMetadata::default();

        while let Some(event) = stream.next().await {
            match event.map_err(|e| e.to_string())? {
                StreamEvent::ContentDelta {
                    delta: ContentDelta::TextDelta { text },
                    ..
                } => {
                    reply.push_str(&text);
                    self.emit(ReplyEvent::Text { text });
                }
                StreamEvent::MessageStart { message } => {
                    if let Some(u) = message.usage {
                        usage = u;
                    }
                }
                StreamEvent::MessageDelta { usage: Some(u) } => usage = u,
                StreamEvent::MessageEnd {
                    finish_reason,
                    usage: u,
                } => {
                    usage = u;
                    if finish_reason == FinishReason::MaxTokens {
                        tracing::warn!(conversation_id = %self.conversation.id, "Reply cut off at max_tokens");
                    }
                }
                StreamEvent::Error { error } => return Err(error),
                _ => {}
            }
        }

        Ok((reply, usage))
    }

    async fn persist(&self, reply: String, usage: UsageMetadata) -> Result<ReplyEvent, DbError> {
        let db = &self.service.db;
        let input_tokens = i64::from(usage.input_tokens);
        let output_tokens = i64::from(usage.output_tokens);

        let message = db
            .messages()
            .add(
                self.conversation.id,
                MessageRole::Assistant,
                &[ContentBlock::text(reply)],
                input_tokens,
                output_tokens,
            )
            .await?;
        db.conversations()
            .update(
                self.conversation.id,
                &ConversationUpdate::tokens(input_tokens, output_tokens),
            )
            .await?;
        db.users()
            .add_tokens(self.user.id, input_tokens, output_tokens)
            .await?;

        let title = self.retitle().await?;

        tracing::info!(
            conversation_id = %self.conversation.id,
            input_tokens,
            output_tokens,
            "Stored reply"
        );

        Ok(ReplyEvent::Done {
            message_id: Some(message.id),
            title,
            input_tokens,
            output_tokens,
        })
    }

    /// Name a "New Chat" after its first user message
    async fn retitle(&self) -> Result<String, DbError> {
        let db = &self.service.db;
        let current = db
            .conversations()
            .get(self.conversation.id)
            .await?
            .map(|c| c.title)
            .unwrap_or_else(|| self.conversation.title.clone());
        if current != DEFAULT_TITLE {
            return Ok(current);
        }

        let messages = db.messages().list(self.conversation.id).await?;
        let first_prompt = messages
            .iter()
            .find(|m| m.role == MessageRole::User)
            .map(|m| prompt_text(&m.content))
            .unwrap_or_default();
        let title = title_from(&first_prompt);
        if title.is_empty() {
            return Ok(current);
        }

        db.conversations()
            .update(self.conversation.id, &ConversationUpdate::title(title.clone()))
            .await?;
        Ok(title)
    }

    /// Send to the client; a dropped receiver only means nobody is listening
    fn emit(&self, event: ReplyEvent) {
        let _ = self.tx.send(event);
    }
}
