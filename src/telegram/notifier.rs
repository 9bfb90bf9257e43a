use std::sync::Arc;

use async_trait::async_trait;

use crate::core::error::AppError;
use crate::dispatch::ports::{ErrorNotifier, Messenger};
use crate::dispatch::update::Update;

/// Tells the user about failures that have a user-facing message.
///
/// Everything else stays in the logs only.
pub struct TelegramErrorNotifier {
    messenger: Arc<dyn Messenger>,
}

impl TelegramErrorNotifier {
    pub fn new(messenger: Arc<dyn Messenger>) -> Self {
        Self { messenger }
    }
}

#[async_trait]
impl ErrorNotifier for TelegramErrorNotifier {
    async fn notify(&self, update: &Update, err: &AppError) {
        let (Some(chat_id), Some(text)) = (update.chat_id(), err.user_message()) else {
            return;
        };
        if let Err(e) = self.messenger.send_message(chat_id, None, text).await {
            log::warn!("Failed to send error notice to chat {}: {}", chat_id, e);
        }
    }
}
