//! Telegram bot integration and handlers

pub mod bot;
pub mod gateway;
pub mod handlers;
pub mod listener;
pub mod markup;
pub mod notifier;

// Re-exports for convenience
pub use bot::{create_bot, setup_bot_commands, Command};
pub use gateway::TelegramGateway;
pub use handlers::{register_all, HandlerDeps};
pub use notifier::TelegramErrorNotifier;
