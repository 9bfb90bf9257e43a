//! Text command views: /start, /admin, /cancel

use super::types::{chat_of, HandlerDeps};
use crate::core::error::AppResult;
use crate::dispatch::context::UpdateContext;
use crate::dispatch::update::Update;
use crate::telegram::markup;

pub const GREETING_TEXT: &str = "Привет!\nЗадайте вопросы нашим аналитикам. На самые интересные из них мы ответим в Telegram-канале «Экономика Москвы».";
pub const ADMIN_PANEL_TEXT: &str = "Панель управления";
pub const NOTHING_TO_CANCEL_TEXT: &str = "Нет активной операции для отмены.";

/// Greeting with the channel link; available to everyone
pub async fn start(deps: HandlerDeps, cx: UpdateContext, update: Update) -> AppResult<()> {
    let chat_id = chat_of(&update)?;
    let menu = markup::greeting(&deps.channel_url);
    cx.bounded(deps.messenger.send_message(chat_id, Some(&menu), GREETING_TEXT))
        .await?;
    Ok(())
}

/// Control panel; registered behind the admin guard
pub async fn admin(deps: HandlerDeps, cx: UpdateContext, update: Update) -> AppResult<()> {
    let chat_id = chat_of(&update)?;
    cx.bounded(deps.messenger.send_message(chat_id, Some(&markup::start_menu()), ADMIN_PANEL_TEXT))
        .await?;
    Ok(())
}

/// Reached only when nothing is pending; a pending operation is cancelled by the router
pub async fn cancel(deps: HandlerDeps, cx: UpdateContext, update: Update) -> AppResult<()> {
    let chat_id = chat_of(&update)?;
    cx.bounded(deps.messenger.send_message(chat_id, None, NOTHING_TO_CANCEL_TEXT))
        .await?;
    Ok(())
}
