// Handlers module

pub mod auth;
pub mod conversations;
pub mod error;
pub mod pages;
pub mod send_message;
pub mod usage;

pub use auth::{
    login_handler, logout_handler, me_handler, refresh_handler, register_handler, require_user,
    resolve_session,
};
pub use conversations::{
    create_conversation_handler, delete_conversation_handler, get_conversation_handler,
    list_conversations_handler, update_conversation_handler,
};
pub use error::{handle_rejection, ApiError};
pub use pages::{index_handler, login_page_handler};
pub use send_message::{send_first_message_handler, send_message_handler};
pub use usage::{info_handler, usage_handler};
