//! Inline button views of the admin panel
//!
//! Every view here is registered behind the admin guard.

use teloxide::utils::html;

use super::types::{menu_of, HandlerDeps};
use crate::core::error::{AppError, AppResult};
use crate::dispatch::context::UpdateContext;
use crate::dispatch::pending::{PendingKind, PendingOperation};
use crate::dispatch::ports::Role;
use crate::dispatch::update::Update;
use crate::telegram::markup;

pub const USER_SETTING_TEXT: &str = "Управление администраторами";
pub const REPORT_CAPTION: &str = "Список вопросов";
pub const SET_ROLE_PROMPT: &str =
    "Напишите никнейм пользователя, которого вы хотите назначить администратором.\nДля отмены команды отправьте /cancel";
pub const DELETE_ROLE_PROMPT: &str =
    "Напишите никнейм пользователя, у которого вы хотите отозвать права администратора.\nДля отмены команды отправьте /cancel";

/// bot_setting: exports every question and sends the file
pub async fn export_questions(deps: HandlerDeps, cx: UpdateContext, update: Update) -> AppResult<()> {
    let (chat_id, _) = menu_of(&update)?;
    let owner = update
        .sender()
        .map(|s| s.username.clone().unwrap_or_else(|| s.id.to_string()))
        .unwrap_or_default();

    let rows = cx.bounded(deps.questions.list_all()).await?;
    let artifact = cx.bounded(deps.reports.generate_report(&rows, &owner)).await?;
    cx.bounded(deps.messenger.send_file(chat_id, &artifact.file_name, artifact.bytes, REPORT_CAPTION))
        .await?;

    log::info!("Exported {} questions for {}", rows.len(), owner);
    Ok(())
}

/// main_menu: back to the control panel
pub async fn main_menu(deps: HandlerDeps, cx: UpdateContext, update: Update) -> AppResult<()> {
    let (chat_id, message_id) = menu_of(&update)?;
    cx.bounded(deps.messenger.edit_message(
        chat_id,
        message_id,
        Some(&markup::start_menu()),
        super::commands::ADMIN_PANEL_TEXT,
    ))
    .await?;
    Ok(())
}

/// user_setting: admin management menu
pub async fn user_setting(deps: HandlerDeps, cx: UpdateContext, update: Update) -> AppResult<()> {
    let (chat_id, message_id) = menu_of(&update)?;
    cx.bounded(deps.messenger.edit_message(chat_id, message_id, Some(&markup::user_setting()), USER_SETTING_TEXT))
        .await?;
    Ok(())
}

/// admin_look_up: shows admins and super admins as JSON
pub async fn admin_look_up(deps: HandlerDeps, cx: UpdateContext, update: Update) -> AppResult<()> {
    let (chat_id, message_id) = menu_of(&update)?;

    let mut admins = cx.bounded(deps.users.list_by_role(Role::Admin)).await?;
    admins.extend(cx.bounded(deps.users.list_by_role(Role::SuperAdmin)).await?);

    let json = serde_json::to_string_pretty(&admins).map_err(|e| AppError::Server(format!("admin list: {}", e)))?;
    let text = format!("<pre>{}</pre>", html::escape(&json));

    cx.bounded(deps.messenger.edit_message(chat_id, message_id, Some(&markup::main_menu()), &text))
        .await?;
    Ok(())
}

/// admin_set_role: asks for a username to promote
pub async fn admin_set_role(deps: HandlerDeps, cx: UpdateContext, update: Update) -> AppResult<()> {
    prompt_username(&deps, &cx, &update, PendingKind::AdminCreate, SET_ROLE_PROMPT).await
}

/// admin_delete_role: asks for a username to demote
pub async fn admin_delete_role(deps: HandlerDeps, cx: UpdateContext, update: Update) -> AppResult<()> {
    prompt_username(&deps, &cx, &update, PendingKind::AdminDelete, DELETE_ROLE_PROMPT).await
}

async fn prompt_username(
    deps: &HandlerDeps,
    cx: &UpdateContext,
    update: &Update,
    kind: PendingKind,
    prompt: &str,
) -> AppResult<()> {
    let (chat_id, origin) = menu_of(update)?;
    let Some(user_id) = update.user_id() else {
        return Ok(());
    };

    let prompt_id = cx.bounded(deps.messenger.send_message(chat_id, None, prompt)).await?;
    deps.pending.set(
        user_id,
        PendingOperation {
            kind,
            prompt: prompt_id,
            origin,
        },
    );
    log::info!("User {} started {} in chat {}", user_id, kind, chat_id);
    Ok(())
}
