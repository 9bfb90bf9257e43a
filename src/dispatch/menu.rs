//! Transport-neutral inline menus
//!
//! Handlers describe keyboards with these types; the Telegram gateway turns
//! them into `InlineKeyboardMarkup` when a message goes out.

/// What pressing a button does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    /// Sends the token back as callback data
    Callback(String),
    /// Opens a link
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub text: String,
    pub action: ButtonAction,
}

impl Button {
    pub fn callback(text: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: ButtonAction::Callback(token.into()),
        }
    }

    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: ButtonAction::Url(url.into()),
        }
    }
}

/// Rows of buttons attached to a message
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Menu {
    pub rows: Vec<Vec<Button>>,
}

impl Menu {
    pub fn new(rows: Vec<Vec<Button>>) -> Self {
        Self { rows }
    }

    /// Callback tokens wired into this menu, in display order
    pub fn callback_tokens(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flatten().filter_map(|b| match &b.action {
            ButtonAction::Callback(token) => Some(token.as_str()),
            ButtonAction::Url(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_tokens_skip_links() {
        let menu = Menu::new(vec![
            vec![Button::callback("Export", "bot_setting")],
            vec![Button::url("Channel", "https://t.me/example")],
            vec![Button::callback("Back", "main_menu")],
        ]);

        let tokens: Vec<&str> = menu.callback_tokens().collect();

        assert_eq!(tokens, vec!["bot_setting", "main_menu"]);
    }
}
