//! Decoded inbound updates
//!
//! The router never sees raw Telegram payloads: the listener turns them into
//! these types first, which also keeps the core testable without a bot.

use teloxide::types::{ChatId, MessageId};

/// Telegram user who sent a message or pressed a button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
}

impl Sender {
    /// Human-readable label for log lines
    pub fn label(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.first_name)
    }
}

/// A plain message typed by a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub from: Sender,
    pub text: Option<String>,
}

impl IncomingMessage {
    /// Name of a bare `/command` message, without the slash and any `@botname` suffix.
    ///
    /// Only a message that consists of the command alone counts: `/start`
    /// and `/start@QuestionBot` do, `/start please` is ordinary text.
    pub fn command(&self) -> Option<&str> {
        let word = self.text.as_deref()?.trim().strip_prefix('/')?;
        if word.contains(char::is_whitespace) {
            return None;
        }
        let name = word.split('@').next().unwrap_or(word);
        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }
}

/// An inline keyboard button press
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackPress {
    pub chat_id: ChatId,
    /// Menu message the button belongs to
    pub message_id: MessageId,
    pub from: Sender,
    pub data: Option<String>,
}

/// A single unit of work for the router
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    Message(IncomingMessage),
    Callback(CallbackPress),
    /// Any other update kind; ignored by the router
    Unsupported,
}

impl Update {
    pub fn sender(&self) -> Option<&Sender> {
        match self {
            Update::Message(msg) => Some(&msg.from),
            Update::Callback(press) => Some(&press.from),
            Update::Unsupported => None,
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        self.sender().map(|s| s.id)
    }

    pub fn chat_id(&self) -> Option<ChatId> {
        match self {
            Update::Message(msg) => Some(msg.chat_id),
            Update::Callback(press) => Some(press.chat_id),
            Update::Unsupported => None,
        }
    }

    pub fn callback(&self) -> Option<&CallbackPress> {
        match self {
            Update::Callback(press) => Some(press),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<&IncomingMessage> {
        match self {
            Update::Message(msg) => Some(msg),
            _ => None,
        }
    }
}
