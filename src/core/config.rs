use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_else(|_| String::new())
});

/// Custom Bot API server URL (local telegram-bot-api instance)
/// Read from BOT_API_URL environment variable
pub static BOT_API_URL: Lazy<Option<String>> = Lazy::new(|| env::var("BOT_API_URL").ok());

/// Database file path
/// Read from DATABASE_PATH environment variable
/// Default: questions.sqlite
pub static DATABASE_PATH: Lazy<String> = Lazy::new(|| env_or("DATABASE_PATH", "questions.sqlite"));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: bot.log
pub static LOG_FILE_PATH: Lazy<String> = Lazy::new(|| env_or("LOG_FILE_PATH", "bot.log"));

/// Directory for generated question reports
/// Read from EXPORT_DIR environment variable
/// Default: exports
pub static EXPORT_DIR: Lazy<String> = Lazy::new(|| env_or("EXPORT_DIR", "exports"));

/// Channel link shown on the /start greeting
/// Read from CHANNEL_URL environment variable
pub static CHANNEL_URL: Lazy<String> = Lazy::new(|| env_or("CHANNEL_URL", "https://t.me/MoscowEcon"));

/// Value of `name`, or `default` when unset or blank
fn env_or(name: &str, default: &str) -> String {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default.to_string(),
    }
}

/// Update dispatch configuration
pub mod dispatch {
    use super::Duration;

    /// Upper bound for processing a single update (in seconds)
    pub const UPDATE_TIMEOUT_SECS: u64 = 300; // 5 minutes

    /// Capacity of the channel between the listener and the router
    pub const UPDATE_BUFFER: usize = 256;

    /// Per-update timeout duration
    pub fn update_timeout() -> Duration {
        Duration::from_secs(UPDATE_TIMEOUT_SECS)
    }
}

/// Question intake configuration
pub mod questions {
    /// Number of questions stored concurrently
    pub const WORKERS: usize = 4;

    /// Submissions buffered before new ones are rejected
    pub const QUEUE_CAPACITY: usize = 256;
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for HTTP requests (in seconds)
    /// Must stay above the 60s long-polling timeout
    pub const REQUEST_TIMEOUT_SECS: u64 = 75;

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}
