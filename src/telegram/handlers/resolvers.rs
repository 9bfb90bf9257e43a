//! Resolvers for the typed-username admin operations

use std::sync::Arc;

use async_trait::async_trait;
use teloxide::utils::html;

use crate::core::error::{AppError, AppResult};
use crate::dispatch::context::UpdateContext;
use crate::dispatch::handler::{PendingResolver, Resolution};
use crate::dispatch::menu::Menu;
use crate::dispatch::ports::{Messenger, Role, UserStore};
use crate::dispatch::update::IncomingMessage;
use crate::telegram::markup;

/// Origin text after a successful grant
pub const GRANTED_TEXT: &str = "Операция выполнена успешно. Пользователь получил администраторские права.";
/// Origin text after a successful revoke
pub const REVOKED_TEXT: &str = "Операция выполнена успешно. Пользователь лишился администраторских прав.";

/// Applies `target` to the user whose username was typed.
///
/// An unknown username is reported to the admin and fails with `NotFound`.
pub struct AdminRoleResolver {
    users: Arc<dyn UserStore>,
    messenger: Arc<dyn Messenger>,
    target: Role,
}

impl AdminRoleResolver {
    /// Grants the admin role
    pub fn grant(users: Arc<dyn UserStore>, messenger: Arc<dyn Messenger>) -> Self {
        Self {
            users,
            messenger,
            target: Role::Admin,
        }
    }

    /// Takes the admin role away
    pub fn revoke(users: Arc<dyn UserStore>, messenger: Arc<dyn Messenger>) -> Self {
        Self {
            users,
            messenger,
            target: Role::User,
        }
    }
}

#[async_trait]
impl PendingResolver for AdminRoleResolver {
    async fn resolve(&self, cx: UpdateContext, message: IncomingMessage) -> AppResult<Resolution> {
        let username = message.text.as_deref().unwrap_or_default().trim();

        match cx.bounded(self.users.set_role_by_name(self.target, username)).await {
            Ok(()) => {
                log::info!("User {} set role {} for {}", message.from.id, self.target, username);
                Ok(Resolution::Completed)
            }
            Err(AppError::NotFound(what)) => {
                let notice = format!("Пользователь {} не найден.", html::escape(username));
                if let Err(e) = cx.bounded(self.messenger.send_message(message.chat_id, None, &notice)).await {
                    log::warn!("Failed to report unknown username to chat {}: {}", message.chat_id, e);
                }
                Err(AppError::NotFound(what))
            }
            Err(e) => Err(e),
        }
    }

    fn completion(&self) -> (String, Menu) {
        let text = match self.target {
            Role::User => REVOKED_TEXT,
            Role::Admin | Role::SuperAdmin => GRANTED_TEXT,
        };
        (text.to_string(), markup::user_setting())
    }
}
