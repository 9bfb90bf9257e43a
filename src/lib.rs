//! Question bot - Telegram bot that collects questions for analysts
//!
//! Users send free-form questions; admins export them and manage other admins
//! from an inline-keyboard control panel.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging and report export
//! - `dispatch`: transport-independent update router, registries, pending operations
//! - `storage`: SQLite persistence
//! - `telegram`: Bot API listener, gateway and handlers
//! - `testing`: in-memory doubles for the dispatch ports

pub mod core;
pub mod dispatch;
pub mod storage;
pub mod telegram;
pub mod testing;

// Re-export commonly used types for convenience
pub use core::{config, AppError, AppResult};
pub use dispatch::{Router, RouterDeps, Update};
pub use storage::{create_pool, get_connection, DbConnection, DbPool, SqliteStore};
