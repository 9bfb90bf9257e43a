//! Telegram update listener
//!
//! Long-polls the Bot API, decodes messages and button presses into router
//! updates and pushes them into a bounded channel. Button presses are
//! acknowledged here so the client spinner stops even if routing is slow.

use std::time::Duration;

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, Message, User};
use teloxide::update_listeners::Polling;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::dispatch::update::{CallbackPress, IncomingMessage, Sender, Update as InboundUpdate};

pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

const SHUTDOWN_RETRY: Duration = Duration::from_millis(100);

/// Handler tree that forwards every supported update into `updates`
pub fn schema(updates: mpsc::Sender<InboundUpdate>) -> UpdateHandler<HandlerError> {
    let tx_messages = updates.clone();

    dptree::entry()
        .branch(message_handler(tx_messages))
        .branch(callback_handler(updates))
}

fn message_handler(updates: mpsc::Sender<InboundUpdate>) -> UpdateHandler<HandlerError> {
    Update::filter_message().endpoint(move |msg: Message| {
        let updates = updates.clone();
        async move {
            if let Some(update) = decode_message(&msg) {
                forward(&updates, update).await;
            }
            Ok(())
        }
    })
}

fn callback_handler(updates: mpsc::Sender<InboundUpdate>) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let updates = updates.clone();
        async move {
            if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
                log::warn!("Failed to answer callback query from {}: {}", q.from.id, e);
            }
            if let Some(update) = decode_callback(&q) {
                forward(&updates, update).await;
            }
            Ok(())
        }
    })
}

async fn forward(updates: &mpsc::Sender<InboundUpdate>, update: InboundUpdate) {
    if updates.send(update).await.is_err() {
        log::error!("Router is gone, dropping update");
    }
}

fn sender(user: &User) -> Sender {
    Sender {
        id: user.id.0 as i64,
        username: user.username.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
    }
}

/// Decodes a message; messages without an author (channel posts) are skipped
pub fn decode_message(msg: &Message) -> Option<InboundUpdate> {
    let from = msg.from.as_ref()?;
    Some(InboundUpdate::Message(IncomingMessage {
        id: msg.id,
        chat_id: msg.chat.id,
        from: sender(from),
        text: msg.text().map(str::to_string),
    }))
}

/// Decodes a button press; presses on inline-mode messages have no chat and are skipped
pub fn decode_callback(q: &CallbackQuery) -> Option<InboundUpdate> {
    let message = q.message.as_ref()?;
    Some(InboundUpdate::Callback(CallbackPress {
        chat_id: message.chat().id,
        message_id: message.id(),
        from: sender(&q.from),
        data: q.data.clone(),
    }))
}

/// Polls Telegram until `shutdown` fires or the dispatcher stops on its own.
///
/// Returning drops the dispatcher and with it `updates`, which stops the router.
pub async fn run(bot: Bot, updates: mpsc::Sender<InboundUpdate>, shutdown: CancellationToken) {
    let listener = Polling::builder(bot.clone()).drop_pending_updates().build();
    let mut dispatcher = Dispatcher::builder(bot, schema(updates))
        .default_handler(|upd| async move {
            log::debug!("Unhandled update kind: {:?}", upd.kind);
        })
        .build();

    let token = dispatcher.shutdown_token();
    let watcher = tokio::spawn(async move {
        shutdown.cancelled().await;
        log::info!("Listener stopping: shutdown requested");
        // The token refuses to fire until the dispatcher is actually running
        loop {
            match token.shutdown() {
                Ok(done) => {
                    done.await;
                    break;
                }
                Err(_) => tokio::time::sleep(SHUTDOWN_RETRY).await,
            }
        }
    });

    log::info!("Starting bot in long polling mode");
    dispatcher
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("An error from the update listener"),
        )
        .await;
    watcher.abort();
    log::info!("Dispatcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use teloxide::types::{ChatId, MessageId};

    fn message_json(text: &str) -> serde_json::Value {
        json!({
            "message_id": 5,
            "date": 1700000000,
            "chat": {"id": 7, "type": "private", "first_name": "Alice", "username": "alice"},
            "from": {"id": 7, "is_bot": false, "first_name": "Alice", "username": "alice"},
            "text": text
        })
    }

    #[test]
    fn test_decode_text_message() {
        let msg: Message = serde_json::from_value(message_json("/start")).unwrap();

        let update = decode_message(&msg).unwrap();

        let InboundUpdate::Message(incoming) = update else {
            panic!("expected a message");
        };
        assert_eq!(incoming.id, MessageId(5));
        assert_eq!(incoming.chat_id, ChatId(7));
        assert_eq!(incoming.from.username.as_deref(), Some("alice"));
        assert_eq!(incoming.command(), Some("start"));
    }

    #[test]
    fn test_decode_button_press() {
        let q: CallbackQuery = serde_json::from_value(json!({
            "id": "4382",
            "from": {"id": 7, "is_bot": false, "first_name": "Alice"},
            "chat_instance": "-1",
            "data": "main_menu",
            "message": message_json("Панель управления")
        }))
        .unwrap();

        let update = decode_callback(&q).unwrap();

        let press = update.callback().unwrap();
        assert_eq!(press.message_id, MessageId(5));
        assert_eq!(press.chat_id, ChatId(7));
        assert_eq!(press.data.as_deref(), Some("main_menu"));
    }
}
