//! Bot initialization
//!
//! This module contains:
//! - Command enum definition
//! - Bot instance creation
//! - Command list shown in the Telegram UI

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::types::BotCommand;
use teloxide::utils::command::BotCommands;

use crate::core::config;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Я умею:")]
pub enum Command {
    #[command(description = "приветствие и ссылка на канал")]
    Start,
    #[command(description = "панель управления (только для администраторов)")]
    Admin,
    #[command(description = "отменить текущую операцию")]
    Cancel,
}

impl Command {
    /// Command name as typed after the slash
    pub fn name(&self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Admin => "admin",
            Command::Cancel => "cancel",
        }
    }
}

/// Creates a Bot instance with custom or default API URL
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(anyhow::Error)` - Failed to create bot (invalid URL, HTTP client setup)
pub fn create_bot(token: &str) -> anyhow::Result<Bot> {
    let client = ClientBuilder::new().timeout(config::network::timeout()).build()?;
    let bot = Bot::with_client(token, client);

    // Check if local Bot API server is configured
    let bot = match config::BOT_API_URL.as_deref() {
        Some(bot_api_url) => {
            log::info!("Using custom Bot API URL: {}", bot_api_url);
            let url = url::Url::parse(bot_api_url).map_err(|e| anyhow::anyhow!("Invalid BOT_API_URL: {}", e))?;
            bot.set_api_url(url)
        }
        None => bot,
    };

    Ok(bot)
}

/// Sets up bot commands in Telegram UI
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(Command::bot_commands()).await?;
    Ok(())
}

/// Command list as registered with Telegram
pub fn command_list() -> Vec<BotCommand> {
    Command::bot_commands()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_descriptions() {
        let commands = Command::descriptions();
        let command_list = format!("{}", commands);

        assert!(command_list.contains("Я умею"));
        assert!(command_list.contains("start"));
        assert!(command_list.contains("admin"));
        assert!(command_list.contains("cancel"));
    }

    #[test]
    fn test_names_match_registered_commands() {
        let registered: Vec<String> = command_list()
            .into_iter()
            .map(|c| c.command.trim_start_matches('/').to_string())
            .collect();
        let names: Vec<&str> = [Command::Start, Command::Admin, Command::Cancel]
            .iter()
            .map(Command::name)
            .collect();

        assert_eq!(registered, names);
    }

    #[test]
    fn test_parse_with_bot_suffix() {
        assert_eq!(Command::parse("/admin@question_bot", "question_bot").unwrap(), Command::Admin);
    }
}
