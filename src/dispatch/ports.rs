//! Capabilities the dispatch core calls into
//!
//! Persistence, the chat transport, report generation and error reporting are
//! collaborators behind these traits. Production wiring lives in `storage`,
//! `telegram` and `core::export`; `testing` has in-memory versions.

use async_trait::async_trait;
use serde::Serialize;
use strum::{Display, EnumString};
use teloxide::types::{ChatId, MessageId};

use super::menu::Menu;
use super::update::{Sender, Update};
use crate::core::error::{AppError, AppResult};

/// Stored role of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize)]
pub enum Role {
    #[strum(serialize = "user")]
    #[serde(rename = "user")]
    User,
    #[strum(serialize = "admin")]
    #[serde(rename = "admin")]
    Admin,
    #[strum(serialize = "superAdmin")]
    #[serde(rename = "superAdmin")]
    SuperAdmin,
}

impl Role {
    /// Roles allowed through the admin middleware
    pub fn is_privileged(self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }

    /// Parses a stored value; anything unknown degrades to `User`
    pub fn from_stored(value: &str) -> Self {
        value.parse().unwrap_or(Role::User)
    }
}

/// A user row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub role: Role,
}

/// A submitted question row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: i64,
    pub user_id: i64,
    pub text: String,
}

/// A generated export, ready to be sent as a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Creates the user if absent
    async fn ensure_user(&self, user: &Sender) -> AppResult<()>;

    /// Role of a stored user; `AppError::NotFound` when there is no such user
    async fn get_role(&self, user_id: i64) -> AppResult<Role>;

    /// Sets the role of the user with this username; `AppError::NotFound` when nobody matches
    async fn set_role_by_name(&self, role: Role, username: &str) -> AppResult<()>;

    async fn list_by_role(&self, role: Role) -> AppResult<Vec<User>>;
}

#[async_trait]
pub trait QuestionStore: Send + Sync {
    async fn insert(&self, user_id: i64, text: &str) -> AppResult<()>;

    async fn list_all(&self) -> AppResult<Vec<Question>>;
}

/// Outbound side of the chat transport
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_message(&self, chat_id: ChatId, menu: Option<&Menu>, text: &str) -> AppResult<MessageId>;

    async fn edit_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        menu: Option<&Menu>,
        text: &str,
    ) -> AppResult<MessageId>;

    async fn send_file(&self, chat_id: ChatId, file_name: &str, bytes: Vec<u8>, caption: &str)
        -> AppResult<MessageId>;

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> AppResult<()>;
}

#[async_trait]
pub trait ReportGenerator: Send + Sync {
    async fn generate_report(&self, rows: &[Question], owner_label: &str) -> AppResult<ReportArtifact>;
}

/// Best-effort reporting of handler failures to the user.
///
/// Implementations never fail; delivery problems are only logged.
#[async_trait]
pub trait ErrorNotifier: Send + Sync {
    async fn notify(&self, update: &Update, err: &AppError);
}
