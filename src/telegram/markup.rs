//! Inline menus of the admin panel and their Telegram keyboards

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::core::error::{AppError, AppResult};
use crate::dispatch::menu::{Button, ButtonAction, Menu};

/// Callback tokens wired into the menus
pub mod tokens {
    pub const BOT_SETTING: &str = "bot_setting";
    pub const MAIN_MENU: &str = "main_menu";
    pub const USER_SETTING: &str = "user_setting";
    pub const ADMIN_LOOK_UP: &str = "admin_look_up";
    pub const ADMIN_DELETE_ROLE: &str = "admin_delete_role";
    pub const ADMIN_SET_ROLE: &str = "admin_set_role";
}

fn main_menu_button() -> Button {
    Button::callback("Вернуться в главное меню", tokens::MAIN_MENU)
}

/// Control panel shown by /admin and the "main menu" button
pub fn start_menu() -> Menu {
    Menu::new(vec![
        vec![Button::callback("Скачать вопросы", tokens::BOT_SETTING)],
        vec![Button::callback("Управление пользователями", tokens::USER_SETTING)],
    ])
}

/// Admin management menu
pub fn user_setting() -> Menu {
    Menu::new(vec![
        vec![Button::callback("Назначить роль администратора", tokens::ADMIN_SET_ROLE)],
        vec![Button::callback("Отозвать роль администратора", tokens::ADMIN_DELETE_ROLE)],
        vec![Button::callback("Посмотреть список администраторов", tokens::ADMIN_LOOK_UP)],
        vec![main_menu_button()],
    ])
}

/// Single "back to main menu" button
pub fn main_menu() -> Menu {
    Menu::new(vec![vec![main_menu_button()]])
}

/// Greeting keyboard with the channel link
pub fn greeting(channel_url: &str) -> Menu {
    Menu::new(vec![vec![Button::url("Перейти в канал", channel_url)]])
}

/// Converts a menu to a Telegram inline keyboard.
///
/// Fails with `Validation` when a link button carries an unparsable URL.
pub fn to_keyboard(menu: &Menu) -> AppResult<InlineKeyboardMarkup> {
    let rows = menu
        .rows
        .iter()
        .map(|row| row.iter().map(to_button).collect::<AppResult<Vec<_>>>())
        .collect::<AppResult<Vec<_>>>()?;
    Ok(InlineKeyboardMarkup::new(rows))
}

fn to_button(button: &Button) -> AppResult<InlineKeyboardButton> {
    match &button.action {
        ButtonAction::Callback(token) => Ok(InlineKeyboardButton::callback(button.text.clone(), token.clone())),
        ButtonAction::Url(raw) => {
            let url = url::Url::parse(raw).map_err(|e| AppError::Validation(format!("bad button URL {}: {}", raw, e)))?;
            Ok(InlineKeyboardButton::url(button.text.clone(), url))
        }
    }
}
