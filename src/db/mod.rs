//! Chat persistence on SQLite
//!
//! Users, conversations and messages live in a single database file.
//! Token counters are only ever incremented, never recomputed from
//! message sums.
//!
//! ```no_run
//! use chat::db::Database;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::open("chat.db").await?;
//! let user = db.users().get_by_username("alice").await?;
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod conversations;
pub mod error;
pub mod messages;
pub mod types;
pub mod users;

pub use connection::Database;
pub use conversations::ConversationRepo;
pub use error::{DbError, Result};
pub use messages::MessageRepo;
pub use types::{Conversation, ConversationUpdate, StoredMessage, User};
pub use users::UserRepo;
