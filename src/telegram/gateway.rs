//! Messenger backed by the Telegram Bot API
//!
//! All texts go out in HTML parse mode; callers escape user-supplied parts.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InputFile, MessageId, ParseMode};

use super::markup::to_keyboard;
use crate::core::error::AppResult;
use crate::dispatch::menu::Menu;
use crate::dispatch::ports::Messenger;

#[derive(Clone)]
pub struct TelegramGateway {
    bot: Bot,
}

impl TelegramGateway {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Messenger for TelegramGateway {
    async fn send_message(&self, chat_id: ChatId, menu: Option<&Menu>, text: &str) -> AppResult<MessageId> {
        let request = self.bot.send_message(chat_id, text).parse_mode(ParseMode::Html);
        let sent = match menu {
            Some(menu) => request.reply_markup(to_keyboard(menu)?).await?,
            None => request.await?,
        };
        Ok(sent.id)
    }

    async fn edit_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        menu: Option<&Menu>,
        text: &str,
    ) -> AppResult<MessageId> {
        let request = self
            .bot
            .edit_message_text(chat_id, message_id, text)
            .parse_mode(ParseMode::Html);
        let edited = match menu {
            Some(menu) => request.reply_markup(to_keyboard(menu)?).await?,
            None => request.await?,
        };
        Ok(edited.id)
    }

    async fn send_file(&self, chat_id: ChatId, file_name: &str, bytes: Vec<u8>, caption: &str) -> AppResult<MessageId> {
        let document = InputFile::memory(bytes).file_name(file_name.to_string());
        let sent = self.bot.send_document(chat_id, document).caption(caption).await?;
        log::info!("Sent {} to chat {}", file_name, chat_id);
        Ok(sent.id)
    }

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> AppResult<()> {
        self.bot.delete_message(chat_id, message_id).await?;
        Ok(())
    }
}
