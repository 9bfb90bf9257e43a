//! Testing utilities for exercising the router without Telegram or SQLite
//!
//! - `memory`: in-memory user/question stores and a canned report generator
//! - `recorder`: a messenger and an error notifier that record every call
//!
//! ## Usage
//!
//! ```rust
//! use question_bot::testing::{sender, MemoryUserStore};
//! use question_bot::dispatch::ports::Role;
//!
//! let users = MemoryUserStore::new();
//! users.insert_user(&sender(7, "alice"), Role::Admin);
//! assert_eq!(users.role_of(7), Some(Role::Admin));
//! ```

pub mod memory;
pub mod recorder;

pub use memory::{MemoryQuestionStore, MemoryUserStore, StaticReportGenerator};
pub use recorder::{GatewayCall, RecordingMessenger, RecordingNotifier};

use teloxide::types::{ChatId, MessageId};

use crate::dispatch::update::{CallbackPress, IncomingMessage, Sender};

/// Sender with a username; private chat id equals the user id
pub fn sender(id: i64, username: &str) -> Sender {
    Sender {
        id,
        username: Some(username.to_string()),
        first_name: username.to_string(),
        last_name: None,
    }
}

/// Private-chat text message from `user_id`
pub fn text_message(user_id: i64, message_id: i32, text: &str) -> IncomingMessage {
    IncomingMessage {
        id: MessageId(message_id),
        chat_id: ChatId(user_id),
        from: sender(user_id, &format!("user{}", user_id)),
        text: Some(text.to_string()),
    }
}

/// Button press on menu message `menu_id` in the private chat of `user_id`
pub fn callback_press(user_id: i64, menu_id: i32, token: &str) -> CallbackPress {
    CallbackPress {
        chat_id: ChatId(user_id),
        message_id: MessageId(menu_id),
        from: sender(user_id, &format!("user{}", user_id)),
        data: Some(token.to_string()),
    }
}
